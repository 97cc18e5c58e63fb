//! ChainLedger - an append-only, tamper-evident transaction ledger
//!
//! Every block commits to the hash of the block before it, so editing,
//! removing or reordering a stored transaction breaks the chain and is caught
//! by verification.
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, and integrity verification
//! - [`transaction`] - Transaction input and validation
//!
//! ## Cryptography
//! - [`crypto`] - SHA-256 digests
//!
//! ## State Management
//! - [`persistence`] - In-memory and SQLite backends
//! - [`service`] - Thread-safe facade for concurrent hosts
//!
//! ## Integration
//! - [`api`] - REST API (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`cli`] - CLI utilities

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// State Management
// ============================================================================
pub mod persistence;
pub mod service;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;

pub use blockchain::{
    verify_chain, verify_linkage, Block, IntegrityMode, IntegrityReport, IntegrityVerifier,
    Ledger, GENESIS_PREVIOUS_HASH,
};
pub use error::{LedgerError, Result};
pub use service::LedgerService;
