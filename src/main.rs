//! podcastify CLI entry point.
//!
//! Initializes logging, installs the root panic subscriber and delegates to
//! the CLI module for command handling.

use podcastify::panic_bus::PanicBus;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    // Parse CLI arguments first to get log_level
    let cli = podcastify::cli::parse_cli();

    // Priority: RUST_LOG env var > --log-level CLI arg > default "info"
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)))
        .init();

    let panic_bus = PanicBus::new();
    let _root = panic_bus.subscribe(|message| {
        error!(
            service = %message.service_name,
            message = %message.message,
            "Fatal condition reported, shutting down"
        );
        std::process::exit(1);
    });

    podcastify::cli::run_with_cli(cli, panic_bus).await
}
