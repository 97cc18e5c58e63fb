// core.rs splits the ledger into the chain itself and its integrity checks.
pub mod chain;
pub mod validation;

pub use chain::*;
pub use validation::*;
