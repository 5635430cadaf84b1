//! Batch driver
//!
//! [`BatchJob`] syncs the visits closed on one day. [`schedule`] runs it
//! daily at the configured UTC time.

pub mod job;
pub mod schedule;
pub mod summary;

pub use job::BatchJob;
pub use summary::BatchSummary;
