#![forbid(unsafe_code)]
//! HTTP API server for ChainLedger

use chainledger::api::{run_api_server, ApiState};
use chainledger::cli::init_tracing;
use chainledger::config::load_config;
use chainledger::service::LedgerService;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    init_tracing(&config)?;

    let ledger = LedgerService::from_config(&config)?;
    info!(
        backend = ?config.storage.backend,
        integrity_check = ?config.ledger.integrity_check,
        blocks = ledger.len(),
        "Starting ChainLedger API"
    );

    let state = Arc::new(ApiState::new(ledger));
    run_api_server(state, &config.api).await
}
