//! Shared helpers for the command line binaries.

use crate::blockchain::{Block, IntegrityReport};
use crate::config::{load_config, Config, StorageBackend};
use crate::crypto::short_hash;
use crate::error::Result;
use crate::service::LedgerService;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};

/// Characters of a hash shown in tables.
pub const DISPLAY_HASH_LEN: usize = 16;

/// Installs the `tracing` subscriber at the configured level.
pub fn init_tracing(config: &Config) -> Result<()> {
    let level = config.log_level()?;
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
    Ok(())
}

/// Loads the config for a one-shot command. Each invocation is a fresh
/// process, so the volatile backend is swapped for SQLite at `storage.path`
/// (or `db_override`).
pub fn load_durable_config(db_override: Option<&str>) -> Result<Config> {
    let mut config = load_config()?;
    config.storage.backend = StorageBackend::Sqlite;
    if let Some(path) = db_override {
        config.storage.path = path.to_string();
    }
    config.validate()?;
    Ok(config)
}

pub fn open_ledger(config: &Config) -> Result<LedgerService> {
    LedgerService::from_config(config)
}

/// Table of blocks, newest first.
pub fn render_chain_table(blocks: &[Block]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Timestamp").add_attribute(Attribute::Bold),
            Cell::new("From").add_attribute(Attribute::Bold),
            Cell::new("To").add_attribute(Attribute::Bold),
            Cell::new("Amount").add_attribute(Attribute::Bold),
            Cell::new("Note").add_attribute(Attribute::Bold),
            Cell::new("Hash").add_attribute(Attribute::Bold),
        ]);

    for block in blocks.iter().rev() {
        let note = if block.note.is_empty() {
            "(none)".to_string()
        } else {
            block.note.clone()
        };
        table.add_row(vec![
            Cell::new(block.index).fg(TableColor::Cyan),
            Cell::new(&block.timestamp),
            Cell::new(&block.sender),
            Cell::new(&block.receiver),
            Cell::new(&block.amount).fg(TableColor::Green),
            Cell::new(note),
            Cell::new(short_hash(&block.hash, DISPLAY_HASH_LEN)),
        ]);
    }

    table
}

/// Multi-line description of one block.
pub fn describe_block(block: &Block) -> String {
    format!(
        "{} {}\n  {} {}\n  {} {} -> {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}",
        "Block".bold(),
        format!("#{}", block.index).bright_cyan().bold(),
        "Timestamp:".dimmed(),
        block.timestamp,
        "Transfer:".dimmed(),
        block.sender,
        block.receiver,
        "Amount:".dimmed(),
        block.amount.as_str().green(),
        "Note:".dimmed(),
        if block.note.is_empty() { "(none)" } else { block.note.as_str() },
        "Previous:".dimmed(),
        block.previous_hash,
        "Hash:".dimmed(),
        block.hash,
    )
}

pub fn describe_report(report: &IntegrityReport) -> String {
    match &report.first_violation {
        None => format!(
            "{} {} block(s) checked",
            "✅ Ledger integrity verified.".green().bold(),
            report.blocks_checked
        ),
        Some(v) => format!(
            "{} block #{}: {}",
            "⚠️  Ledger is corrupted at".red().bold(),
            v.index,
            v.kind
        ),
    }
}
