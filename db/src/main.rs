//! Drawbridge daemon and client entry point

use std::path::PathBuf;
use std::sync::Arc;

use actionstore::ActionStore;
use clap::Parser;
use eyre::{Context, Result, eyre};
use serde_json::Value;
use tracing::info;

use drawbridge::bridge::{self, Bridge, BridgeClient};
use drawbridge::broker::{CorrelationStore, RelayDispatcher, SubscriptionChannel};
use drawbridge::cli::{Cli, Command};
use drawbridge::config::Config;
use drawbridge::transport::{CheckObjectReceiver, LandingHandler, LoggingPlatform, OrderedBus};

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Serve { socket } => serve(config, socket).await,
        Command::Send { action, args, socket } => send(config, &action, args, socket).await,
        Command::Deliver { event, payload, socket } => deliver(config, &event, payload, socket).await,
    }
}

/// Run the bridge daemon until interrupted
async fn serve(config: Config, socket_override: Option<PathBuf>) -> Result<()> {
    let store = Arc::new(CorrelationStore::new());
    let actions = Arc::new(ActionStore::open(&config.storage.actions_dir).context("Failed to open action store")?);
    let bus = Arc::new(OrderedBus::new());
    let platform = Arc::new(LoggingPlatform);

    // The broker answers its own check-equipment broadcasts: it notifies the
    // equipment-selected subscriber and contributes the persisted defaults
    bus.register(
        0,
        Box::new(CheckObjectReceiver::new(
            SubscriptionChannel::new(store.clone()),
            actions.clone(),
            config.broker.package_name.clone(),
        )),
    );

    let dispatcher = RelayDispatcher::new(config.broker.clone(), store.clone(), bus.clone(), platform, actions);
    let relay = dispatcher.handle();
    let dispatcher_task = tokio::spawn(dispatcher.run());

    let landing = LandingHandler::new(SubscriptionChannel::new(store));

    let socket_path = socket_override.unwrap_or_else(|| config.bridge.socket_path());
    let (listener, socket_path) = bridge::create_listener_at(&socket_path)?;
    info!(?socket_path, "Bridge listening");

    let server = Bridge::new(relay.clone(), bus, landing);
    tokio::select! {
        result = server.serve(listener) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
        }
    }

    let _ = relay.shutdown().await;
    let _ = dispatcher_task.await;
    bridge::cleanup_socket(&socket_path);

    Ok(())
}

/// Dispatch one action against a running daemon and print the outcome
async fn send(config: Config, action: &str, args: Option<String>, socket_override: Option<PathBuf>) -> Result<()> {
    let args = match args {
        Some(json) => match serde_json::from_str::<Value>(&json).context("Failed to parse args JSON")? {
            Value::Array(args) => args,
            single => vec![single],
        },
        None => vec![],
    };

    let client = BridgeClient::with_socket_path(socket_override.unwrap_or_else(|| config.bridge.socket_path()));
    if !client.socket_exists() {
        return Err(eyre!("Bridge socket not found; is the daemon running?"));
    }

    let response = client.call(action, args).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Deliver an inbound event to a running daemon and print the outcome
async fn deliver(config: Config, event: &str, payload: Option<String>, socket_override: Option<PathBuf>) -> Result<()> {
    let payload = match payload {
        Some(json) => serde_json::from_str(&json).context("Failed to parse payload JSON")?,
        None => Value::Null,
    };

    let client = BridgeClient::with_socket_path(socket_override.unwrap_or_else(|| config.bridge.socket_path()));
    if !client.socket_exists() {
        return Err(eyre!("Bridge socket not found; is the daemon running?"));
    }

    let response = client.deliver(event, payload).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
