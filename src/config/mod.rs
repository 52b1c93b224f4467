//! Environment-sourced configuration.
//!
//! Every setting is read once at startup into an immutable [`Config`] that is
//! passed by reference into the components. Nothing re-reads the environment
//! after load.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::Engine;
use url::Url;

/// Events at or above this count trip the threshold (override with MAX_COUNT).
const DEFAULT_MAX_COUNT: usize = 6;
/// Oldest-event age in minutes that trips the threshold (override with MAX_DELAY).
const DEFAULT_MAX_DELAY_MINUTES: u64 = 10;

/// Seconds between checks of the event page.
pub const POLL_INTERVAL: Duration = Duration::from_secs(15);
/// Post-alert sleep so the chat is not flooded while staff react.
pub const COOLDOWN: Duration = Duration::from_secs(285);
/// Consecutive over-threshold observations required before alerting.
pub const TRIGGER_STRIKES: u32 = 2;
/// Bound on every HTTP call; keeps shutdown responsive.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-wide settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Event-listing page to watch.
    pub url: String,
    /// Basic-auth login for the event page.
    pub login: String,
    /// Basic-auth password, stored base64-encoded in the environment.
    pub password: String,
    /// Telegram bot token.
    pub tg_token: String,
    /// Telegram chat the alerts go to.
    pub chat_id: i64,
    /// SQLite database file holding the state table.
    pub database_path: String,
    /// Admin addresses mailed on error-level log events.
    pub admins: Vec<String>,
    /// SMTP host used for error mail.
    pub mail_host: Option<String>,
    pub max_count: usize,
    pub max_delay_minutes: u64,
}

impl Config {
    /// Load the configuration from process environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = require(&get, "URL")?;
        Url::parse(&url).with_context(|| format!("URL is not a valid URL: {url}"))?;

        let login = require(&get, "LOGIN")?;
        let password_b64 = require(&get, "PASSWORD")?;
        let password_bytes = base64::engine::general_purpose::STANDARD
            .decode(password_b64.trim())
            .context("PASSWORD is not valid base64")?;
        let password =
            String::from_utf8(password_bytes).context("decoded PASSWORD is not UTF-8")?;

        let tg_token = require(&get, "TG_TOKEN")?;
        let chat_id: i64 = require(&get, "CHAT_ID")?
            .parse()
            .context("CHAT_ID must be a numeric chat id")?;

        let database_path = get("DATABASE_URL")
            .map(|u| strip_sqlite_scheme(&u).to_string())
            .unwrap_or_else(|| "app.db".to_string());

        let admins = get("ADMINS")
            .map(|a| {
                a.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let mail_host = get("MAIL_HOST");

        let max_count = parse_or(&get, "MAX_COUNT", DEFAULT_MAX_COUNT)?;
        let max_delay_minutes = parse_or(&get, "MAX_DELAY", DEFAULT_MAX_DELAY_MINUTES)?;

        Ok(Self {
            url,
            login,
            password,
            tg_token,
            chat_id,
            database_path,
            admins,
            mail_host,
            max_count,
            max_delay_minutes,
        })
    }

    /// Settings for the error-mail logging layer. `None` unless both a mail
    /// host and at least one admin address are configured.
    pub fn mail_settings(&self) -> Option<crate::logging::MailSettings> {
        let host = self.mail_host.as_ref()?;
        if self.admins.is_empty() {
            return None;
        }
        Some(crate::logging::MailSettings {
            host: host.clone(),
            from: format!("no-reply@{host}"),
            to: self.admins.clone(),
        })
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    match get(name) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => bail!("missing required environment variable {name}"),
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(name) {
        Some(v) => v.parse().with_context(|| format!("{name} must be a number")),
        None => Ok(default),
    }
}

/// Accepts a plain filesystem path or a `sqlite://` connection URL.
fn strip_sqlite_scheme(url: &str) -> &str {
    url.strip_prefix("sqlite:///")
        .or_else(|| url.strip_prefix("sqlite://"))
        .unwrap_or(url)
}
