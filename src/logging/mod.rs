//! Structured logging using tracing.
//!
//! Builds a layered subscriber: a console layer on stderr, a file layer that
//! rotates by size (100 KiB, 10 backups kept), and, when admin addresses are
//! configured, a layer that mails error-level events to them.

mod mail;
mod rolling;

use mail::MailLayer;
pub use mail::MailSettings;
pub use rolling::RollingFileWriter;

use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Size at which the log file rolls over.
const MAX_LOG_BYTES: u64 = 100 * 1024;
/// Rotated files kept next to the live one (`boardwatch.log.1` is the newest).
const LOG_BACKUPS: u32 = 10;

/// Default log file location, under `logs/` in the working directory.
pub fn default_log_path() -> PathBuf {
    PathBuf::from("logs").join("boardwatch.log")
}

/// Initialize tracing with console, rotating-file, and optional mail output.
pub fn init_tracing(verbosity: u8, log_file_path: Option<PathBuf>, mail: Option<MailSettings>) {
    // -v: debug, -vv and up: trace. RUST_LOG is ignored so the flag is the
    // single source of truth.
    let filter_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::new(filter_level);

    let registry = tracing_subscriber::registry().with(filter);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let mail_layer = mail.map(MailLayer::new);

    let file_writer = log_file_path.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match RollingFileWriter::open(path, MAX_LOG_BYTES, LOG_BACKUPS) {
            Ok(writer) => Some(writer),
            Err(e) => {
                eprintln!("boardwatch: cannot open log file: {e}");
                None
            }
        }
    });

    if let Some(writer) = file_writer {
        let file_layer = fmt::layer()
            .with_writer(move || writer.clone())
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(false); // no ANSI in files

        registry
            .with(console_layer)
            .with(file_layer)
            .with(mail_layer)
            .init();
    } else {
        // Console only
        registry.with(console_layer).with(mail_layer).init();
    }
}
