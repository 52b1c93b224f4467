use clap::Parser;

use boardwatch::config::Config;

#[derive(Parser, Debug)]
#[command(name = "boardwatch")]
#[command(about = "Event board watcher daemon", long_about = None)]
struct Args {
    /// Verbose output (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Settings come from the environment, optionally via a local .env file.
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    boardwatch::init_tracing(
        args.verbose,
        Some(boardwatch::default_log_path()),
        config.mail_settings(),
    );
    tracing::info!("boardwatch startup");

    boardwatch::run(config)
}
