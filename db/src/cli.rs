//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drawbridge - shell-app to drawing-viewer bridge broker
#[derive(Parser)]
#[command(name = "drawbridge", about = "Correlation broker bridging a shell app and an external drawing viewer", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge daemon
    Serve {
        /// Socket path override
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },

    /// Dispatch an action against a running daemon
    Send {
        /// Action name (e.g. can-show-equipment)
        action: String,

        /// JSON array of arguments (e.g. '[{"id":"E1"}]')
        args: Option<String>,

        /// Socket path override
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },

    /// Deliver an inbound event, as the external viewer would
    Deliver {
        /// Event name (equipment-selected, open-host-app)
        event: String,

        /// JSON payload
        payload: Option<String>,

        /// Socket path override
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },
}
