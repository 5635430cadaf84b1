//! External system adapters
//!
//! This module contains the integrations the sync pipeline talks to:
//!
//! - `amrs`: the AMRS (OpenMRS) REST and FHIR2 APIs
//! - `hie`: HIE mapping, SHR delivery, and dead-letter endpoints
//! - `database`: ledger storage abstraction and backend factory
//! - `postgresql` / `memory`: ledger storage backends

pub mod amrs;
pub mod database;
pub mod hie;
pub mod memory;
pub mod postgresql;
pub mod retry;
