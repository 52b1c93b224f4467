//! Alert delivery.
//!
//! Channel-agnostic trait with the Telegram implementation used in
//! production. Failures surface to the caller, which logs and drops the
//! alert; nothing here retries.

mod telegram;

pub use telegram::TelegramChannel;

use anyhow::Result;

/// A destination for alert messages.
pub trait AlertChannel {
    fn send(&self, message: &str) -> Result<()>;
}
