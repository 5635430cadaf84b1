//! Core business logic for hie-bridge.
//!
//! # Modules
//!
//! - [`discovery`] - closed visits for a date
//! - [`ledger`] - processed-visit ledger
//! - [`mapping`] - cached AMRS → HIE identity resolution
//! - [`transform`] - AMRS clinical data → HIE FHIR bundle
//! - [`delivery`] - posting bundles to the shared health record
//! - [`batch`] - daily batch driver and scheduler
//! - [`stream`] - event-stream consumer
//! - [`status`] - run status shared by both drivers
//!
//! # Batch Workflow
//!
//! 1. **Discover**: closed visits for the day before the run date
//! 2. **Filter**: drop visits the ledger already records as delivered
//! 3. **Fetch**: clinical data per patient, once per run
//! 4. **Transform**: resolve identities and build one bundle per visit
//! 5. **Deliver**: post to the SHR and its mirrors
//! 6. **Record**: write the outcome to the ledger
//!
//! # Example
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
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hie-bridge.toml")?;
//!
//! let amrs = Arc::new(AmrsClient::new(config.amrs.clone())?);
//! let hie = Arc::new(HieClient::new(config.hie.clone())?);
//! let mapping = Arc::new(IdentityMappingService::from_config(hie.clone(), &config.hie));
//! let transformer = Arc::new(FhirTransformer::from_config(mapping, &config));
//! let ledger = ProcessedVisitLedger::new(create_ledger_storage(&config).await?);
//!
//! let job = BatchJob::new(amrs.clone(), amrs, transformer, hie, ledger);
//! let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
//! let summary = job.execute_batch_job(date).await?;
//!
//! println!("Delivered: {}", summary.delivered_count);
//! println!("Skipped: {}", summary.skipped_count);
//! println!("Failed: {}", summary.failed_count);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod delivery;
pub mod discovery;
pub mod ledger;
pub mod mapping;
pub mod status;
pub mod stream;
pub mod transform;
