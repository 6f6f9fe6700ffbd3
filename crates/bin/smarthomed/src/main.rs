//! # smarthomed: smart home device simulator
//!
//! Composition root that wires the registry, the dispatch layer and the
//! device nodes together, then serves the command shell on stdin.
//!
//! ## Responsibilities
//! - Load configuration (`smarthome.toml`, env vars)
//! - Initialize logging
//! - Build the registry and register one device node per device
//! - Construct the dispatcher with the random drift source
//! - Run the shell until `quit` or end of input
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no device logic belongs here.

mod config;
mod shell;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use smarthome_adapter_devnode::{FileTable, NodeTable};
use smarthome_adapter_rand::RandDrift;
use smarthome_app::dispatch::Dispatcher;
use smarthome_app::registry::Registry;

use crate::config::Config;
use crate::shell::Shell;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_writer(std::io::stderr)
        .init();

    // Devices
    let registry = Arc::new(Registry::new());
    let nodes = Arc::new(NodeTable::register(&registry, &config.devnode.dev_root));

    // Dispatch
    let mut dispatcher = Dispatcher::new(registry, RandDrift);
    if let Some(timeout) = config.lock_timeout() {
        dispatcher = dispatcher.with_lock_timeout(timeout);
    }
    let files = FileTable::new(Arc::new(dispatcher), nodes);

    tracing::info!(
        dev_root = %config.devnode.dev_root.display(),
        lock_timeout_ms = config.dispatch.lock_timeout_ms,
        "smarthomed ready"
    );

    let shell = Shell::new(files);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    shell.run(stdin, &mut std::io::stdout()).await?;

    tracing::info!("smarthomed stopped");
    Ok(())
}
