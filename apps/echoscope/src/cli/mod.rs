//! # Echoscope CLI Module
//!
//! This module implements the CLI interface for Echoscope.
//!
//! ## Available Commands
//!
//! - `analyze` - Headline metrics of an edge list
//! - `communities` - Community membership table
//! - `bridges` - Edges that cross communities
//! - `simulate` - Apply edge additions/removals and watch the metrics move
//! - `server` - Start the HTTP server

mod commands;

use crate::config::EchoscopeConfig;
use clap::{Parser, Subcommand};
use echoscope_core::EchoError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Echoscope - polarization and echo chamber analyzer
///
/// Detects communities in an undirected social graph once, then measures how
/// divided it is and how added or removed ties would change that.
#[derive(Parser, Debug)]
#[command(name = "echoscope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to echoscope.toml (defaults to ./echoscope.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show modularity, polarization and community count
    Analyze {
        /// Edge-list file (one "u v" pair per line)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List detected communities and their members
    Communities {
        /// Edge-list file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List bridge edges with the communities they connect
    Bridges {
        /// Edge-list file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Add and remove edges against the frozen partition
    Simulate {
        /// Edge-list file
        #[arg(short, long)]
        file: PathBuf,

        /// Edge to add, as "U,V" (repeatable)
        #[arg(long, value_name = "U,V")]
        add: Vec<String>,

        /// Edge to remove, as "U,V" (repeatable)
        #[arg(long, value_name = "U,V")]
        remove: Vec<String>,

        /// Check the final metrics against a full recompute
        #[arg(long)]
        verify: bool,
    },

    /// Start HTTP server
    Server {
        /// Edge-list file to preload
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), EchoError> {
    let mut config = EchoscopeConfig::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Analyze { file } => cmd_analyze(&config, &file, json_mode),
        Commands::Communities { file } => cmd_communities(&config, &file, json_mode),
        Commands::Bridges { file } => cmd_bridges(&config, &file, json_mode),
        Commands::Simulate {
            file,
            add,
            remove,
            verify,
        } => cmd_simulate(&config, &file, &add, &remove, verify, json_mode),
        Commands::Server { file, host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config, file.as_deref()).await
        }
    }
}
