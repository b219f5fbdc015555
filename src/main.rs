//! Routed Transfer Gateway
//!
//! ```text
//! ┌──────────┐    ┌─────────────┐    ┌──────────┐    ┌──────────┐
//! │  HTTP    │───▶│ Coordinator │───▶│  Ledger  │    │  Banks   │
//! │ Gateway  │    │   (saga)    │───▶│ (phases) │    │(adapters)│
//! └──────────┘    └─────────────┘    └──────────┘    └──────────┘
//! ```
//!
//! Flags: `--env/-e <name>` loads `config/<name>.yaml` (default `dev`),
//! `--config <path>` loads an explicit file, `--port <n>` overrides the
//! gateway port.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use routed_transfer::bank::BankRegistry;
use routed_transfer::config::AppConfig;
use routed_transfer::gateway::{self, state::AppState};
use routed_transfer::ledger;
use routed_transfer::logging::init_logging;
use routed_transfer::transfer::TransferCoordinator;

fn arg_value(args: &[String], names: &[&str]) -> Option<String> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .cloned()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let env = arg_value(&args, &["--env", "-e"]).unwrap_or_else(|| "dev".to_string());

    let mut app_config = match arg_value(&args, &["--config"]) {
        Some(path) => AppConfig::load_from(&path)?,
        None => AppConfig::load(&env)?,
    };
    if let Some(port) = arg_value(&args, &["--port"]) {
        app_config.gateway.port = port
            .parse()
            .with_context(|| format!("Invalid --port value: {}", port))?;
    }

    let _log_guard = init_logging(&app_config);
    info!(env = %env, "Starting routed transfer gateway");

    let ledger = ledger::connect(&app_config.ledger).context("Failed to connect ledger")?;
    info!(backend = ledger.name(), url = %app_config.ledger.rpc_url, "Ledger ready");

    let registry = BankRegistry::from_config(&app_config.banks)?;
    info!(banks = ?registry.bank_names(), "Bank registry ready");

    let coordinator = Arc::new(TransferCoordinator::new(
        ledger,
        registry,
        app_config.coordinator,
    ));
    let state = Arc::new(AppState::new(coordinator));

    gateway::run_server(&app_config.gateway, state).await
}
