//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod clear;
pub mod consume;
pub mod init;
pub mod run;
pub mod schedule;
pub mod status;
pub mod validate;
