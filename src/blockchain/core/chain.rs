use crate::crypto::digest_parts;
use crate::error::Result;
use crate::persistence::Persistence;
use crate::transaction::{Amount, AmountInput, Transaction, TransactionInput};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::validation::{inspect_chain, IntegrityMode, IntegrityReport};

/// `previous_hash` of the first block: 64 zeros, meaning "no predecessor".
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Block timestamps are local time with second granularity.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Hash of a block's content: SHA-256 over sender, receiver, amount, note,
/// timestamp and previous hash, concatenated in that order with no separator.
pub fn calculate_block_hash(
    sender: &str,
    receiver: &str,
    amount: &str,
    note: &str,
    timestamp: &str,
    previous_hash: &str,
) -> String {
    digest_parts(&[sender, receiver, amount, note, timestamp, previous_hash])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: Uuid,
    /// 1-based position in the chain.
    pub index: u64,
    pub sender: String,
    pub receiver: String,
    pub amount: Amount,
    pub note: String,
    pub timestamp: String,
    pub previous_hash: String,
    pub hash: String,
}

impl Block {
    /// Seals a validated transaction into a block at `index`, linked to
    /// `previous_hash`.
    pub fn seal(index: u64, tx: Transaction, timestamp: String, previous_hash: String) -> Self {
        let hash = calculate_block_hash(
            &tx.sender,
            &tx.receiver,
            tx.amount.as_str(),
            &tx.note,
            &timestamp,
            &previous_hash,
        );

        Block {
            id: Uuid::new_v4(),
            index,
            sender: tx.sender,
            receiver: tx.receiver,
            amount: tx.amount,
            note: tx.note,
            timestamp,
            previous_hash,
            hash,
        }
    }

    /// Recomputes the hash from the block's current fields.
    pub fn calculate_hash(&self) -> String {
        calculate_block_hash(
            &self.sender,
            &self.receiver,
            self.amount.as_str(),
            &self.note,
            &self.timestamp,
            &self.previous_hash,
        )
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1
    }
}

/// The ordered, append-only sequence of blocks.
///
/// Every block appended here links to the previous tail, so a ledger built
/// only through [`Ledger::append`] always passes verification. The block
/// vector is private; readers get slices or owned snapshots.
pub struct Ledger {
    blocks: Vec<Block>,
    /// `None` for a volatile ledger; the block vector is the only copy.
    persistence: Option<Box<dyn Persistence>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Create an empty, volatile `Ledger` with no persistence backend.
    pub fn new() -> Self {
        Ledger {
            blocks: Vec::new(),
            persistence: None,
        }
    }

    /// Open a `Ledger` over the provided persistence backend, reloading any
    /// blocks it already holds.
    ///
    /// A stored chain that fails verification is still loaded (so it can be
    /// inspected) but logged as a warning.
    pub fn with_persistence(persistence: Box<dyn Persistence>) -> Result<Self> {
        let mut blocks = persistence.load_blocks()?;
        blocks.sort_by_key(|b| b.index);

        let report = inspect_chain(&blocks, IntegrityMode::Full);
        if let Some(violation) = &report.first_violation {
            warn!(
                blocks = blocks.len(),
                index = violation.index,
                kind = %violation.kind,
                "ledger.reload.integrity_failed"
            );
        } else {
            info!(blocks = blocks.len(), "ledger.reload");
        }

        Ok(Ledger {
            blocks,
            persistence: Some(persistence),
        })
    }

    /// Validates the fields and appends a new block at the tail.
    pub fn append(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: impl Into<AmountInput>,
        note: &str,
    ) -> Result<Block> {
        let amount = amount.into().parse()?;
        let tx = Transaction::new(sender, receiver, amount, note)?;
        self.append_at(tx, chrono::Local::now().naive_local())
    }

    /// Appends a block from unvalidated request fields.
    pub fn append_transaction(&mut self, input: &TransactionInput) -> Result<Block> {
        let tx = input.validate()?;
        self.append_at(tx, chrono::Local::now().naive_local())
    }

    /// Appends a validated transaction stamped with `time`.
    ///
    /// The block is persisted before it becomes visible in memory; on a
    /// storage error the ledger is unchanged.
    pub fn append_at(&mut self, tx: Transaction, time: NaiveDateTime) -> Result<Block> {
        let index = self.blocks.len() as u64 + 1;
        let previous_hash = self.tail_hash().to_string();
        let block = Block::seal(index, tx, format_timestamp(&time), previous_hash);

        if let Some(persistence) = &self.persistence {
            persistence.append_block(&block)?;
        }
        self.blocks.push(block.clone());

        debug!(index = block.index, hash = %block.hash, "ledger.append");
        Ok(block)
    }

    /// Hash the next block will link to.
    pub fn tail_hash(&self) -> &str {
        self.blocks
            .last()
            .map(|b| b.hash.as_str())
            .unwrap_or(GENESIS_PREVIOUS_HASH)
    }

    /// Independent copy of the chain, oldest first.
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Block at 1-based `index`.
    pub fn get(&self, index: u64) -> Option<&Block> {
        index
            .checked_sub(1)
            .and_then(|i| self.blocks.get(i as usize))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Discards every block.
    pub fn clear(&mut self) -> Result<()> {
        if let Some(persistence) = &self.persistence {
            persistence.clear()?;
        }
        let discarded = self.blocks.len();
        self.blocks.clear();
        info!(discarded, "ledger.clear");
        Ok(())
    }

    pub fn verify_integrity(&self, mode: IntegrityMode) -> IntegrityReport {
        inspect_chain(&self.blocks, mode)
    }

    pub fn is_valid(&self) -> bool {
        self.verify_integrity(IntegrityMode::Full).valid
    }

    pub fn is_durable(&self) -> bool {
        self.persistence.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::persistence::InMemoryPersistence;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn tx(sender: &str, receiver: &str, amount: &str, note: &str) -> Transaction {
        TransactionInput::new(sender, receiver, amount, Some(note.to_string()))
            .validate()
            .unwrap()
    }

    #[test]
    fn test_first_block_links_to_sentinel() {
        let mut ledger = Ledger::new();
        let block = ledger.append("A", "B", "100", "rent").unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(block.hash.len(), 64);
        assert!(block.is_genesis());
    }

    #[test]
    fn test_second_block_links_to_first() {
        let mut ledger = Ledger::new();
        let first = ledger.append("A", "B", "100", "rent").unwrap();
        let second = ledger.append("B", "C", "50", "").unwrap();

        assert_eq!(second.index, 2);
        assert_eq!(second.previous_hash, first.hash);
        assert_eq!(ledger.tail_hash(), second.hash);
    }

    #[test]
    fn test_hash_matches_concatenated_fields() {
        let mut ledger = Ledger::new();
        let block = ledger.append_at(tx("A", "B", "100", "rent"), at(12, 0, 0)).unwrap();

        let raw = format!("AB100rent2024-03-01 12:00:00{}", GENESIS_PREVIOUS_HASH);
        assert_eq!(block.hash, crate::crypto::digest(&raw));
        assert_eq!(block.timestamp, "2024-03-01 12:00:00");
    }

    #[test]
    fn test_amount_text_is_hashed_as_entered() {
        let mut a = Ledger::new();
        let mut b = Ledger::new();
        let x = a.append_at(tx("A", "B", "50.50", ""), at(9, 0, 0)).unwrap();
        let y = b.append_at(tx("A", "B", "50.5", ""), at(9, 0, 0)).unwrap();

        assert_eq!(x.amount.to_decimal(), y.amount.to_decimal());
        assert_ne!(x.hash, y.hash);
    }

    #[test]
    fn test_identical_inputs_give_identical_hashes() {
        let mut a = Ledger::new();
        let mut b = Ledger::new();
        let x = a.append_at(tx("A", "B", "1", "n"), at(1, 2, 3)).unwrap();
        let y = b.append_at(tx("A", "B", "1", "n"), at(1, 2, 3)).unwrap();

        assert_eq!(x.hash, y.hash);
        assert_ne!(x.id, y.id);
    }

    #[test]
    fn test_rejected_append_leaves_chain_untouched() {
        let mut ledger = Ledger::new();
        ledger.append("A", "B", "10", "").unwrap();
        let before = ledger.snapshot();

        let err = ledger.append("A", "B", "-1", "").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { field: "amount", .. }));
        let err = ledger.append("", "B", "1", "").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput { field: "sender", .. }));

        assert_eq!(ledger.snapshot(), before);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut ledger = Ledger::new();
        ledger.append("A", "B", "10", "").unwrap();

        let mut copy = ledger.snapshot();
        copy[0].note = "forged".to_string();
        copy.clear();

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.blocks()[0].note, "");
    }

    #[test]
    fn test_get_is_one_based() {
        let mut ledger = Ledger::new();
        ledger.append("A", "B", "1", "").unwrap();
        ledger.append("B", "C", "2", "").unwrap();

        assert!(ledger.get(0).is_none());
        assert_eq!(ledger.get(1).unwrap().sender, "A");
        assert_eq!(ledger.get(2).unwrap().sender, "B");
        assert!(ledger.get(3).is_none());
    }

    #[test]
    fn test_clear_then_append_restarts_at_one() {
        let mut ledger = Ledger::new();
        ledger.append("A", "B", "1", "").unwrap();
        ledger.append("B", "C", "2", "").unwrap();

        ledger.clear().unwrap();
        assert!(ledger.is_empty());
        assert_eq!(ledger.tail_hash(), GENESIS_PREVIOUS_HASH);

        let block = ledger.append("C", "D", "3", "").unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, GENESIS_PREVIOUS_HASH);
    }

    #[test]
    fn test_amount_is_hashed_verbatim() {
        let mut ledger = Ledger::new();
        let block = ledger.append_at(tx("A", "B", " 007 ", ""), at(8, 0, 0)).unwrap();

        assert_eq!(block.amount.as_str(), "007");
        let raw = format!("AB0072024-03-01 08:00:00{}", GENESIS_PREVIOUS_HASH);
        assert_eq!(block.hash, crate::crypto::digest(&raw));
    }

    #[test]
    fn test_volatile_ledger_keeps_single_copy() {
        let mut ledger = Ledger::new();
        assert!(!ledger.is_durable());
        ledger.append("A", "B", "1", "").unwrap();
        ledger.clear().unwrap();
        assert!(ledger.is_empty());

        let backed = Ledger::with_persistence(Box::new(InMemoryPersistence::new())).unwrap();
        assert!(backed.is_durable());
    }

    #[test]
    fn test_reopen_from_shared_memory_backend() {
        let backend = InMemoryPersistence::new();
        let mut ledger = Ledger::with_persistence(Box::new(backend.clone())).unwrap();
        ledger.append("A", "B", "1", "").unwrap();
        ledger.append("B", "C", "2", "").unwrap();

        let reopened = Ledger::with_persistence(Box::new(backend)).unwrap();
        assert_eq!(reopened.snapshot(), ledger.snapshot());
        assert!(reopened.is_valid());
    }
}
