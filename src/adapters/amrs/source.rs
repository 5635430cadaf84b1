//! Data-source traits consumed by the sync pipeline
//!
//! The batch driver only sees these traits, so tests and alternative
//! sources can stand in for the AMRS REST client.

use crate::domain::{ClinicalDataset, ClosedVisits, PatientId, Result};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of visits closed on a given date
#[async_trait]
pub trait VisitSource: Send + Sync {
    /// Visits whose close time falls on `date` (UTC), grouped by patient
    async fn find_closed_visits(&self, date: NaiveDate) -> Result<ClosedVisits>;
}

/// Source of a patient's clinical data for a date
#[async_trait]
pub trait ClinicalDataSource: Send + Sync {
    /// The patient, their encounters on `date` and each encounter's observations
    async fn get_patient_data_for_date(
        &self,
        patient_id: &PatientId,
        date: NaiveDate,
    ) -> Result<ClinicalDataset>;
}
