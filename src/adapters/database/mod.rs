//! Ledger storage abstraction layer
//!
//! This module provides a trait-based abstraction over the processed-visit
//! ledger so it can live in PostgreSQL or in memory.

pub mod factory;
pub mod traits;

pub use factory::create_ledger_storage;
pub use traits::LedgerStorage;
