// hie-bridge - AMRS to HIE FHIR sync
// Copyright (c) 2025 hie-bridge Contributors
// Licensed under the MIT License

//! # hie-bridge - AMRS to HIE FHIR sync
//!
//! hie-bridge moves closed clinical visits from AMRS (an OpenMRS system) to
//! a national Health Information Exchange. Each visit becomes one FHIR
//! `collection` bundle whose references point at the HIE registries.
//!
//! ## Overview
//!
//! This library provides:
//! - **Discovery** of the visits closed on a date
//! - **Identity mapping** of practitioner, facility and patient ids, batched and cached
//! - **Transformation** of AMRS encounters and observations into an HIE bundle,
//!   with drug orders turned into `MedicationRequest`s and clinical notes
//!   gathered into one `Composition`
//! - **Delivery** to the shared health record and its mirrors
//! - **A processed-visit ledger** so every visit is delivered at most once
//!   while failed visits are retried
//! - **A stream consumer** for encounter events with retry and dead-lettering
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Discovery, ledger, mapping, transform and the two drivers
//! - [`adapters`] - AMRS and HIE HTTP clients, PostgreSQL and in-memory ledgers
//! - [`domain`] - Identifiers, FHIR resources, errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hie_bridge::adapters::amrs::AmrsClient;
//! use hie_bridge::adapters::database::create_ledger_storage;
//! use hie_bridge::adapters::hie::HieClient;
//! use hie_bridge::config::load_config;
//! use hie_bridge::core::batch::BatchJob;
//! use hie_bridge::core::ledger::ProcessedVisitLedger;
//! use hie_bridge::core::mapping::IdentityMappingService;
//! use hie_bridge::core::transform::FhirTransformer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("hie-bridge.toml")?;
//!
//!     let amrs = Arc::new(AmrsClient::new(config.amrs.clone())?);
//!     let hie = Arc::new(HieClient::new(config.hie.clone())?);
//!     let mapping = Arc::new(IdentityMappingService::from_config(hie.clone(), &config.hie));
//!     let transformer = Arc::new(FhirTransformer::from_config(mapping, &config));
//!     let ledger = ProcessedVisitLedger::new(create_ledger_storage(&config).await?);
//!
//!     let job = BatchJob::new(amrs.clone(), amrs, transformer, hie, ledger);
//!     let summary = job.execute_batch_job(chrono::Utc::now().date_naive()).await?;
//!
//!     println!("Delivered {} visits", summary.delivered_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Idempotence
//!
//! The ledger keeps one record per visit id. A second run for the same date
//! skips every visit recorded as delivered and retries only the failed ones.
//!
//! ## Error Handling
//!
//! [`domain::BridgeError`] is used throughout. Per-visit failures become
//! ledger records; per-event failures become dead-letter entries. Only
//! discovery and setup failures abort a run.
//!
//! ## Logging
//!
//! hie-bridge uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(visit_id = "v1", patient_id = "patientA", "Processing visit");
//! warn!(kind = "practitioner", local_id = "prov-9", "Mapping unavailable");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
