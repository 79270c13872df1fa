//! # Echoscope - Polarization Analyzer
//!
//! The main binary for the Echoscope echo chamber analyzer.
//!
//! This application provides:
//! - CLI interface over edge-list files
//! - HTTP JSON API for interactive what-if simulation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               apps/echoscope (THE BINARY)            │
//! │                                                      │
//! │   ┌─────────────┐              ┌─────────────┐       │
//! │   │    CLI      │              │  HTTP API   │       │
//! │   │   (clap)    │              │   (axum)    │       │
//! │   └──────┬──────┘              └──────┬──────┘       │
//! │          └──────────────┬─────────────┘              │
//! │                         ▼                            │
//! │                ┌─────────────────┐                   │
//! │                │ echoscope-core  │                   │
//! │                │  (THE ENGINE)   │                   │
//! │                └─────────────────┘                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! echoscope analyze -f network.txt
//! echoscope bridges -f network.txt --json-mode
//! echoscope simulate -f network.txt --add alice,dave --remove bob,carol --verify
//! echoscope server -f network.txt --port 8080
//! ```

use clap::Parser;
use echoscope::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // ECHOSCOPE_LOG_FORMAT=json enables machine-parseable logs. Logs go to
    // stderr so --json-mode output on stdout stays parseable.
    let log_format = std::env::var("ECHOSCOPE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "echoscope=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Echoscope startup banner.
fn print_banner() {
    println!(
        r#"
   ___     _
  | __|__ | |_  ___  ___ __ ___ _ __  ___
  | _|/ _|| ' \/ _ \(_-</ _/ _ \ '_ \/ -_)
  |___\__||_||_\___//__/\__\___/ .__/\___|
                               |_|
  Polarization Analyzer v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
