//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the arbiter shared secret) are referenced by env-var name in
//! the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub arbiter: ArbiterConfig,
    pub ledger: LedgerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArbiterConfig {
    /// Account recorded as arbiter on every match this service opens.
    pub address: String,
    /// Env var holding the shared secret that gates settle/cancel over HTTP.
    pub secret_env: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    pub token_symbol: String,
    pub decimals: u32,
    /// Starting balances for the demo ledger (address → raw units).
    #[serde(default)]
    pub seed_accounts: HashMap<String, u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub journal_path: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
