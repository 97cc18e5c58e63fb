use serde::{Deserialize, Serialize};
use std::fmt;

use super::chain::{Block, GENESIS_PREVIOUS_HASH};

/// How thoroughly a chain is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityMode {
    /// Only compare each `previous_hash` with its predecessor's `hash`.
    Linkage,
    /// Linkage plus index contiguity, the genesis sentinel, and a recomputed
    /// hash for every block.
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// `previous_hash` differs from the preceding block's `hash`.
    BrokenLink,
    /// Stored hash differs from the hash of the block's fields.
    HashMismatch,
    /// `index` differs from the block's position.
    IndexMismatch,
    /// First block does not point at the all-zero sentinel.
    InvalidGenesis,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ViolationKind::BrokenLink => write!(f, "broken link to previous block"),
            ViolationKind::HashMismatch => write!(f, "stored hash does not match contents"),
            ViolationKind::IndexMismatch => write!(f, "index does not match position"),
            ViolationKind::InvalidGenesis => write!(f, "first block does not start the chain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// 1-based position of the offending block.
    pub index: u64,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub mode: IntegrityMode,
    /// Blocks examined, including the failing one.
    pub blocks_checked: u64,
    pub first_violation: Option<Violation>,
}

/// Walks a block sequence and reports the first integrity violation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityVerifier {
    mode: IntegrityMode,
}

impl IntegrityVerifier {
    pub fn new(mode: IntegrityMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> IntegrityMode {
        self.mode
    }

    pub fn verify(&self, blocks: &[Block]) -> bool {
        self.inspect(blocks).valid
    }

    pub fn inspect(&self, blocks: &[Block]) -> IntegrityReport {
        inspect_chain(blocks, self.mode)
    }
}

/// Full check of `blocks`.
pub fn verify_chain(blocks: &[Block]) -> bool {
    inspect_chain(blocks, IntegrityMode::Full).valid
}

/// Linkage-only check of `blocks`. Sequences of zero or one block always pass.
pub fn verify_linkage(blocks: &[Block]) -> bool {
    blocks
        .windows(2)
        .all(|pair| pair[1].previous_hash == pair[0].hash)
}

pub fn inspect_chain(blocks: &[Block], mode: IntegrityMode) -> IntegrityReport {
    for i in 0..blocks.len() {
        if let Some(kind) = check_block(blocks, i, mode) {
            let position = i as u64 + 1;
            return IntegrityReport {
                valid: false,
                mode,
                blocks_checked: position,
                first_violation: Some(Violation { index: position, kind }),
            };
        }
    }

    IntegrityReport {
        valid: true,
        mode,
        blocks_checked: blocks.len() as u64,
        first_violation: None,
    }
}

fn check_block(blocks: &[Block], i: usize, mode: IntegrityMode) -> Option<ViolationKind> {
    let block = &blocks[i];
    let full = mode == IntegrityMode::Full;

    if full && block.index != i as u64 + 1 {
        return Some(ViolationKind::IndexMismatch);
    }

    match i.checked_sub(1).map(|p| &blocks[p]) {
        Some(prev) if block.previous_hash != prev.hash => return Some(ViolationKind::BrokenLink),
        None if full && block.previous_hash != GENESIS_PREVIOUS_HASH => {
            return Some(ViolationKind::InvalidGenesis)
        }
        _ => {}
    }

    if full && block.calculate_hash() != block.hash {
        return Some(ViolationKind::HashMismatch);
    }

    None
}
