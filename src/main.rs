//! ARENA — Two-Party Wagering Escrow Service
//!
//! Entry point. Loads configuration, initialises structured logging,
//! seeds the demo ledger, issues the arbiter capability, restores the
//! event journal from disk, and serves the API with graceful shutdown.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{error, info};

use arena::api;
use arena::api::routes::{ApiState, ArbiterGate};
use arena::config;
use arena::engine::arbiter::ArbiterCap;
use arena::engine::escrow::EscrowEngine;
use arena::events::{FanoutSink, Journal, JournalSink, LogSink};
use arena::ledger::InMemoryLedger;
use arena::storage;
use arena::types::AccountId;

const BANNER: &str = r#"
    _    ____  _____ _   _    _
   / \  |  _ \| ____| \ | |  / \
  / _ \ | |_) |  _| |  \| | / _ \
 / ___ \|  _ <| |___| |\  |/ ___ \
/_/   \_\_| \_\_____|_| \_/_/   \_\

  Two-Party Wagering Escrow
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = config::AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        service = %cfg.service.name,
        token = %cfg.ledger.token_symbol,
        decimals = cfg.ledger.decimals,
        "ARENA starting up"
    );

    // -- Ledger ----------------------------------------------------------

    let ledger = Arc::new(InMemoryLedger::seeded(
        cfg.ledger
            .seed_accounts
            .iter()
            .map(|(addr, balance)| (AccountId::new(addr.clone()), *balance)),
    ));
    info!(
        accounts = cfg.ledger.seed_accounts.len(),
        total_supply = ledger.total_supply(),
        "Ledger seeded"
    );

    // -- Events & journal -------------------------------------------------

    let journal = Arc::new(Journal::new());
    let restored = storage::load_journal(Some(&cfg.storage.journal_path))?;
    if !restored.is_empty() {
        info!(entries = restored.len(), "Resumed event journal");
        journal.restore(restored);
    }

    let sink = Arc::new(FanoutSink::new(vec![
        Arc::new(LogSink),
        Arc::new(JournalSink::new(journal.clone())),
    ]));

    // -- Arbiter capability -----------------------------------------------

    // Issued exactly once; the API gate is the only holder.
    let cap = ArbiterCap::issue();
    let secret = config::AppConfig::resolve_env(&cfg.arbiter.secret_env)
        .context("Arbiter shared secret must be configured")?;
    info!(arbiter = %cfg.arbiter.address, cap = %cap.id(), "Arbiter capability issued");

    // -- Engine & API ------------------------------------------------------

    let engine = Arc::new(EscrowEngine::new(ledger.clone(), sink, &cap));

    let state = Arc::new(ApiState {
        engine,
        ledger,
        journal: journal.clone(),
        arbiter: ArbiterGate::new(
            cap,
            SecretString::new(secret),
            AccountId::new(cfg.arbiter.address.clone()),
        ),
    });

    if cfg.api.enabled {
        api::spawn_api(state, cfg.api.port)?;
    } else {
        info!("API disabled — engine reachable only in-process");
    }

    // -- Wait for shutdown -------------------------------------------------

    info!("Running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    // Persist the journal so settled matches stay auditable across restarts.
    if let Err(e) = storage::save_journal(&journal.snapshot(), Some(&cfg.storage.journal_path)) {
        error!(error = %e, "Failed to save journal");
    }

    info!(events = journal.len(), "ARENA shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arena=info"));

    let json_logging = std::env::var("ARENA_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
