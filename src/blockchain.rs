// Thin re-export module: the ledger lives in `blockchain/core.rs`, split into
// chain management (blocks, append, reset) and integrity verification.

pub mod core;
pub use self::core::*;
