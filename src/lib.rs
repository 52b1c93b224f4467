//! boardwatch library
//!
//! A small daemon that watches an internal event-listing page and pings a
//! Telegram chat when too many red-flagged events pile up, or when the
//! oldest one has been sitting unhandled for too long.
//!
//! ## Architecture
//!
//! The codebase is organized into modules:
//! - `logging`: structured logging with tracing (console, rotating file, error mail)
//! - `config`: environment-sourced configuration
//! - `monitors`: event page fetching and parsing
//! - `alerts`: alert delivery channels (Telegram)
//! - `store`: SQLite-backed key-value state (the liveness flag)
//! - `watcher`: the poll/debounce/cooldown loop and shutdown handling
//!
//! ## Main Entry Point
//!
//! - `run()`: start the watcher loop; returns after a shutdown signal

pub mod alerts;
pub mod config;
pub mod logging;
pub mod monitors;
pub mod store;
pub mod watcher;

use std::sync::Arc;

use anyhow::Context;

use alerts::TelegramChannel;
use config::Config;
use monitors::EventPageMonitor;
use store::StateStore;
use watcher::{ShutdownFlag, WatchSettings, Watcher};

pub use logging::{default_log_path, init_tracing};

/// Wire up the components and run the watcher until a shutdown signal
/// arrives. SIGINT and SIGTERM both request a graceful stop.
pub fn run(config: Config) -> anyhow::Result<()> {
    let store = StateStore::open(&config.database_path)?;

    let stop = Arc::new(ShutdownFlag::new());
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.set()).context("failed to install signal handler")?;
    }

    let monitor = EventPageMonitor::new(&config)?;
    let channel = TelegramChannel::new(&config.tg_token, config.chat_id)?;
    let settings = WatchSettings::from_config(&config);

    Watcher::new(monitor, channel, &store, stop, settings).run();
    Ok(())
}
