//! Fetching and parsing of the event-listing page.

use anyhow::Context as _;
use chrono::{Local, NaiveDateTime};
use encoding_rs::WINDOWS_1251;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{error, trace, warn};

use super::{EventSnapshot, EventSource};
use crate::config::{Config, HTTP_TIMEOUT};

/// Rows carrying this attribute are the flagged events.
const RED_ROW_SELECTOR: &str = r##"tr[bgcolor="#FF0000"]"##;
/// Timestamp format used in the second cell of each event row.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum PageError {
    #[error("event row has no timestamp cell")]
    MissingTimestamp,
    #[error("malformed event timestamp {text:?}: {source}")]
    BadTimestamp {
        text: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Polls the event page over authenticated HTTP.
pub struct EventPageMonitor {
    client: Client,
    url: String,
    login: String,
    password: String,
}

impl EventPageMonitor {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: config.url.clone(),
            login: config.login.clone(),
            password: config.password.clone(),
        })
    }
}

impl EventSource for EventPageMonitor {
    /// One authenticated GET. Anything short of a readable 200 page counts
    /// as a quiet observation; the loop keeps running either way.
    fn check(&mut self) -> EventSnapshot {
        trace!("checking event page {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .basic_auth(&self.login, Some(&self.password))
            .send();
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("Unable to access event page: {e}");
                return EventSnapshot::quiet();
            }
        };
        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                "Bad response from event page: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown")
            );
            return EventSnapshot::quiet();
        }
        let body = match response.bytes() {
            Ok(body) => body,
            Err(e) => {
                error!("Unable to read event page body: {e}");
                return EventSnapshot::quiet();
            }
        };
        // The page is served in the legacy windows-1251 encoding.
        let (text, _, _) = WINDOWS_1251.decode(&body);
        match parse_page(&text, Local::now().naive_local()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Unable to parse event page: {e}");
                EventSnapshot::quiet()
            }
        }
    }
}

/// Extract the flagged-event count and the age of the oldest flagged event.
///
/// Rows are listed newest-first, so the last matching row is the oldest; its
/// second cell holds a `YYYY-MM-DD HH:MM:SS` local timestamp. Staleness is
/// whole elapsed minutes, truncating, and never negative.
pub fn parse_page(html: &str, now: NaiveDateTime) -> Result<EventSnapshot, PageError> {
    let row_selector = Selector::parse(RED_ROW_SELECTOR).expect("static selector is valid");
    let cell_selector = Selector::parse("td").expect("static selector is valid");

    let document = Html::parse_document(html);
    let rows: Vec<_> = document.select(&row_selector).collect();
    let Some(oldest) = rows.last() else {
        return Ok(EventSnapshot::quiet());
    };

    let cell = oldest
        .select(&cell_selector)
        .nth(1)
        .ok_or(PageError::MissingTimestamp)?;
    let text = cell.text().collect::<String>();
    let text = text.trim();
    let timestamp =
        NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map_err(|source| {
            PageError::BadTimestamp {
                text: text.to_string(),
                source,
            }
        })?;

    let elapsed_secs = now.signed_duration_since(timestamp).num_seconds().max(0);
    Ok(EventSnapshot {
        count: rows.len(),
        staleness_minutes: (elapsed_secs / 60) as u64,
    })
}
