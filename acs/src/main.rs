use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use serde_json::Value;
use std::path::Path;

use actionstore::ActionStore;
use actionstore::cli::{Cli, Command};
use actionstore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn parse_records(input: &str) -> Result<Vec<Value>> {
    // Accept either inline JSON or a path to a file containing it
    let json = if Path::new(input).exists() {
        std::fs::read_to_string(input).context("Failed to read actions file")?
    } else {
        input.to_string()
    };

    let value: Value = serde_json::from_str(&json).context("Failed to parse actions JSON")?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(eyre!("Expected a JSON array of action records")),
    }
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("actionstore starting");

    match cli.command {
        Command::Set { actions } => {
            let records = parse_records(&actions)?;
            let store = ActionStore::open(&config.store_path)?;
            store.save(&records)?;
            println!("{} Saved {} action record(s)", "✓".green(), records.len().to_string().cyan());
        }
        Command::Show => {
            let store = ActionStore::open(&config.store_path)?;
            let records = store.load()?;
            if records.is_empty() {
                println!("{}", "No default actions saved".dimmed());
            } else {
                if let Some(saved_at) = store.saved_at()? {
                    println!("{} {}", "saved at:".dimmed(), saved_at.to_rfc3339().yellow());
                }
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
        }
        Command::Clear => {
            let store = ActionStore::open(&config.store_path)?;
            store.clear()?;
            println!("{} Cleared default actions", "✓".green());
        }
    }

    Ok(())
}
