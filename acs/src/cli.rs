//! CLI argument parsing for actionstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "acs")]
#[command(author, version, about = "Persisted default-action records", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace the stored collection with the given records
    Set {
        /// JSON array of action records, or a path to a file containing one
        #[arg(required = true)]
        actions: String,
    },

    /// Print the stored collection
    Show,

    /// Remove the stored collection
    Clear,
}
