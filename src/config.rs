use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bank::BankKind;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub use_json: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub banks: Vec<BankConfig>,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_file() -> String {
    "routed_transfer.log".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            use_json: false,
            rotation: default_rotation(),
            gateway: GatewayConfig::default(),
            ledger: LedgerConfig::default(),
            banks: Vec::new(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Rpc,
    Memory,
}

pub const DEFAULT_LEDGER_URL: &str = "http://localhost:8545";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub rpc_url: String,
    pub timeout_ms: u64,
    /// Seed registrations (memory backend only)
    #[serde(default)]
    pub registrations: Vec<RegistrationFixture>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Rpc,
            rpc_url: DEFAULT_LEDGER_URL.to_string(),
            timeout_ms: 10_000,
            registrations: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistrationFixture {
    pub routing_ref: String,
    pub bank_name: String,
    pub account_id: String,
}

/// One bank adapter. Unset fields fall back to the adapter's defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BankConfig {
    pub name: String,
    pub kind: BankKind,
    #[serde(default)]
    pub url: Option<String>,
    /// FaaS function path
    #[serde(default)]
    pub path: Option<String>,
    /// OpenWhisk namespace
    #[serde(default)]
    pub namespace: Option<String>,
    /// OpenWhisk action name
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_pass: String,
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl BankConfig {
    pub fn new(name: impl Into<String>, kind: BankKind) -> Self {
        Self {
            name: name.into(),
            kind,
            url: None,
            path: None,
            namespace: None,
            action: None,
            api_key: String::new(),
            api_pass: String::new(),
            accept_invalid_certs: false,
            timeout_ms: None,
        }
    }
}

/// Ledger append retry policy
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per transition, including the first
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 200,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    #[serde(default)]
    pub ledger_retry: RetryPolicy,
    /// Upper bound for one execution, across every lookup, append and adjustment
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Re-issue a debit or credit whose earlier outcome is unknown.
    /// Off by default: such a replay can move funds twice.
    #[serde(default)]
    pub replay_unsettled: bool,
}

fn default_deadline_ms() -> u64 {
    120_000
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ledger_retry: RetryPolicy::default(),
            deadline_ms: default_deadline_ms(),
            replay_unsettled: false,
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml` and apply environment overrides
    pub fn load(env: &str) -> anyhow::Result<Self> {
        Self::load_from(format!("config/{}.yaml", env))
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply gateway address and credential overrides.
    ///
    /// `lookup` is the environment; tests pass a closure instead of mutating
    /// the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("LEDGER_RPC_URL") {
            self.ledger.rpc_url = url;
        }

        let faas_url = lookup("FAAS_GATEWAY_SERVICE");
        let whisk_url = lookup("WHISK_GATEWAY_SERVICE");
        let whisk_key = lookup("WHISK_API_KEY");
        let whisk_pass = lookup("WHISK_API_PASS");

        for bank in &mut self.banks {
            match bank.kind {
                BankKind::Faas => {
                    if let Some(url) = &faas_url {
                        bank.url = Some(url.clone());
                    }
                }
                BankKind::Whisk => {
                    if let Some(url) = &whisk_url {
                        bank.url = Some(url.clone());
                    }
                    if let Some(key) = &whisk_key {
                        bank.api_key = key.clone();
                    }
                    if let Some(pass) = &whisk_pass {
                        bank.api_pass = pass.clone();
                    }
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.coordinator.ledger_retry.max_attempts == 0 {
            bail!("coordinator.ledger_retry.max_attempts must be at least 1");
        }
        if self.ledger.backend == LedgerBackend::Rpc && self.ledger.rpc_url.trim().is_empty() {
            bail!("ledger.rpc_url is required for the rpc backend");
        }
        if self.ledger.backend == LedgerBackend::Rpc && !self.ledger.registrations.is_empty() {
            warn!("ledger.registrations are ignored by the rpc backend");
        }

        let mut seen = std::collections::HashSet::new();
        for bank in &self.banks {
            if !seen.insert(bank.name.as_str()) {
                bail!("duplicate bank name: {}", bank.name);
            }
        }
        Ok(())
    }
}
