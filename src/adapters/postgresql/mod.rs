//! PostgreSQL database integration
//!
//! This module provides PostgreSQL storage for the processed-visit ledger.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::ProcessedVisitRow;
