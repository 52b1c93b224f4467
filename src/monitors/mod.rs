//! Event page monitoring.
//!
//! Watches the internal event-listing page: each check reports how many
//! red-flagged rows the page shows and how stale the oldest one is.

mod events;

pub use events::{parse_page, EventPageMonitor, PageError};

use serde::{Deserialize, Serialize};

/// One observation of the event page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    /// Red-flagged rows currently listed.
    pub count: usize,
    /// Whole minutes since the oldest red-flagged event appeared.
    pub staleness_minutes: u64,
}

impl EventSnapshot {
    /// The "nothing to see" observation; failed checks decay to this too.
    pub fn quiet() -> Self {
        Self::default()
    }
}

/// A source of event page observations.
pub trait EventSource {
    fn check(&mut self) -> EventSnapshot;
}
