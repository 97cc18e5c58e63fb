//! Persistence layer for ChainLedger
//!
//! The ledger is volatile by default. [`Database`] is an optional SQLite
//! backend that keeps blocks across restarts.

use crate::blockchain::Block;
use crate::error::{LedgerError, Result};
use crate::transaction::Amount;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::sync::Arc;

/// Abstraction for persistence backends. `append_block` must be atomic: a
/// failed call leaves the stored chain as it was.
pub trait Persistence: Send + Sync {
    fn append_block(&self, block: &Block) -> Result<()>;
    /// All stored blocks, in index order.
    fn load_blocks(&self) -> Result<Vec<Block>>;
    fn clear(&self) -> Result<()>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| LedgerError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                idx INTEGER PRIMARY KEY,
                id TEXT NOT NULL UNIQUE,
                sender TEXT NOT NULL,
                receiver TEXT NOT NULL,
                amount TEXT NOT NULL,
                note TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                previous_hash TEXT NOT NULL,
                hash TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| LedgerError::Database(format!("Failed to create blocks table: {}", e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn block_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .map_err(|e| LedgerError::Database(format!("Failed to count blocks: {}", e)))?;
        Ok(count as u64)
    }
}

impl Persistence for Database {
    fn append_block(&self, block: &Block) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO blocks (idx, id, sender, receiver, amount, note, timestamp, previous_hash, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                block.index as i64,
                block.id.to_string(),
                block.sender,
                block.receiver,
                block.amount.to_string(),
                block.note,
                block.timestamp,
                block.previous_hash,
                block.hash,
            ],
        )
        .map_err(|e| LedgerError::Database(format!("Failed to save block: {}", e)))?;

        Ok(())
    }

    fn load_blocks(&self) -> Result<Vec<Block>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT idx, id, sender, receiver, amount, note, timestamp, previous_hash, hash
                 FROM blocks ORDER BY idx ASC",
            )
            .map_err(|e| LedgerError::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredBlock {
                    index: row.get(0)?,
                    id: row.get(1)?,
                    sender: row.get(2)?,
                    receiver: row.get(3)?,
                    amount: row.get(4)?,
                    note: row.get(5)?,
                    timestamp: row.get(6)?,
                    previous_hash: row.get(7)?,
                    hash: row.get(8)?,
                })
            })
            .map_err(|e| LedgerError::Database(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row in rows {
            let stored =
                row.map_err(|e| LedgerError::Database(format!("Failed to load block: {}", e)))?;
            blocks.push(stored.into_block()?);
        }
        Ok(blocks)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM blocks", [])
            .map_err(|e| LedgerError::Database(format!("Failed to clear blocks: {}", e)))?;
        Ok(())
    }
}

/// Raw row read back from the `blocks` table.
struct StoredBlock {
    index: i64,
    id: String,
    sender: String,
    receiver: String,
    amount: String,
    note: String,
    timestamp: String,
    previous_hash: String,
    hash: String,
}

impl StoredBlock {
    fn into_block(self) -> Result<Block> {
        let id = uuid::Uuid::parse_str(&self.id).map_err(|e| {
            LedgerError::Database(format!("Block {} has invalid id: {}", self.index, e))
        })?;
        let amount = Amount::parse(&self.amount).map_err(|e| {
            LedgerError::Database(format!("Block {} has invalid amount: {}", self.index, e))
        })?;

        Ok(Block {
            id,
            index: self.index as u64,
            sender: self.sender,
            receiver: self.receiver,
            amount,
            note: self.note,
            timestamp: self.timestamp,
            previous_hash: self.previous_hash,
            hash: self.hash,
        })
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
/// Clones share the same storage.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    pub blocks: Arc<Mutex<Vec<Block>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn append_block(&self, block: &Block) -> Result<()> {
        self.blocks.lock().push(block.clone());
        Ok(())
    }

    fn load_blocks(&self) -> Result<Vec<Block>> {
        Ok(self.blocks.lock().clone())
    }

    fn clear(&self) -> Result<()> {
        self.blocks.lock().clear();
        Ok(())
    }
}
