//! Telegram alert channel.

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;

use super::AlertChannel;
use crate::config::HTTP_TIMEOUT;

/// Sends messages through the Telegram bot API.
pub struct TelegramChannel {
    client: Client,
    url: String,
    chat_id: i64,
}

impl TelegramChannel {
    pub fn new(token: &str, chat_id: i64) -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: format!("https://api.telegram.org/bot{token}/sendMessage"),
            chat_id,
        })
    }
}

impl AlertChannel for TelegramChannel {
    fn send(&self, message: &str) -> Result<()> {
        let chat_id = self.chat_id.to_string();
        let response = self
            .client
            .post(&self.url)
            .form(&[("chat_id", chat_id.as_str()), ("text", message)])
            .send()
            .context("unable to post to Telegram")?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(anyhow!(
                "unable to post to Telegram: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown")
            ));
        }
        Ok(())
    }
}
