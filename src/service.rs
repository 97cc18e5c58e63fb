//! Thread-safe facade over a [`Ledger`].
//!
//! Hosts that serve several callers at once share one `LedgerService`.
//! Appends and clears hold the write lock across the whole read-tail,
//! hash, push sequence, so concurrent appends can never link to the same
//! tail. Readers hold the read lock and see either all of an append or none
//! of it.

use crate::blockchain::{Block, IntegrityMode, IntegrityReport, Ledger};
use crate::config::{Config, StorageBackend};
use crate::error::Result;
use crate::persistence::Database;
use crate::transaction::{AmountInput, TransactionInput};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct LedgerService {
    ledger: Arc<RwLock<Ledger>>,
    integrity_mode: IntegrityMode,
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new(Ledger::new(), IntegrityMode::default())
    }
}

impl LedgerService {
    pub fn new(ledger: Ledger, integrity_mode: IntegrityMode) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            integrity_mode,
        }
    }

    /// Builds the ledger and backend described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let ledger = match config.storage.backend {
            StorageBackend::Memory => Ledger::new(),
            StorageBackend::Sqlite => {
                ensure_parent_dir(&config.storage.path)?;
                Ledger::with_persistence(Box::new(Database::open(&config.storage.path)?))?
            }
        };
        Ok(Self::new(ledger, config.ledger.integrity_check))
    }

    pub fn integrity_mode(&self) -> IntegrityMode {
        self.integrity_mode
    }

    pub fn append_transaction(
        &self,
        sender: &str,
        receiver: &str,
        amount: impl Into<AmountInput>,
        note: Option<&str>,
    ) -> Result<Block> {
        let input = TransactionInput::new(sender, receiver, amount, note.map(str::to_string));
        self.submit(&input)
    }

    /// Appends a block from a request body.
    pub fn submit(&self, input: &TransactionInput) -> Result<Block> {
        // Validate before taking the lock; rejected input never contends with writers.
        let tx = input.validate()?;
        let mut ledger = self.ledger.write();
        ledger.append_at(tx, chrono::Local::now().naive_local())
    }

    /// Blocks oldest first.
    pub fn get_chain(&self) -> Vec<Block> {
        self.ledger.read().snapshot()
    }

    pub fn get_block(&self, index: u64) -> Option<Block> {
        self.ledger.read().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.ledger.read().len()
    }

    /// Whether appended blocks are written to a backend.
    pub fn is_durable(&self) -> bool {
        self.ledger.read().is_durable()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.read().is_empty()
    }

    pub fn verify_integrity(&self) -> IntegrityReport {
        let report = self.ledger.read().verify_integrity(self.integrity_mode);
        if let Some(violation) = &report.first_violation {
            warn!(index = violation.index, kind = %violation.kind, "ledger.integrity_violation");
        }
        report
    }

    pub fn clear_chain(&self) -> Result<()> {
        self.ledger.write().clear()
    }
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
