//! PostgreSQL row models
//!
//! This module maps the `processed_visits` table to the ledger's domain
//! record.

use crate::core::ledger::record::{ProcessedVisitRecord, VisitStatus};
use crate::domain::ids::{PatientId, VisitId};
use crate::domain::{BridgeError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use tokio_postgres::Row;

/// One row of the `processed_visits` table
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedVisitRow {
    pub visit_id: String,
    pub patient_id: String,
    pub visit_date: NaiveDate,
    pub status: String,
    pub http_status: Option<i32>,
    pub error_message: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub processed_date: NaiveDate,
}

impl ProcessedVisitRow {
    /// Convert from the domain record
    pub fn from_domain(record: &ProcessedVisitRecord) -> Self {
        Self {
            visit_id: record.visit_id.to_string(),
            patient_id: record.patient_id.to_string(),
            visit_date: record.visit_date,
            status: record.status.as_str().to_string(),
            http_status: record.http_status.map(i32::from),
            error_message: record.error_message.clone(),
            processed_at: record.processed_at,
            processed_date: record.processed_date,
        }
    }

    /// Read the columns of a `SELECT *` row
    pub fn from_row(row: &Row) -> Self {
        Self {
            visit_id: row.get("visit_id"),
            patient_id: row.get("patient_id"),
            visit_date: row.get("visit_date"),
            status: row.get("status"),
            http_status: row.get("http_status"),
            error_message: row.get("error_message"),
            processed_at: row.get("processed_at"),
            processed_date: row.get("processed_date"),
        }
    }

    /// Convert to the domain record
    pub fn to_domain(&self) -> Result<ProcessedVisitRecord> {
        let http_status = self
            .http_status
            .map(|s| {
                u16::try_from(s)
                    .map_err(|_| BridgeError::Validation(format!("Invalid http_status {s}")))
            })
            .transpose()?;

        Ok(ProcessedVisitRecord {
            visit_id: VisitId::new(&self.visit_id).map_err(BridgeError::Validation)?,
            patient_id: PatientId::new(&self.patient_id).map_err(BridgeError::Validation)?,
            visit_date: self.visit_date,
            status: self.status.parse().map_err(BridgeError::Validation)?,
            http_status,
            error_message: self.error_message.clone(),
            processed_at: self.processed_at,
            processed_date: self.processed_date,
        })
    }
}

/// Parses a status column, rejecting unknown values
pub fn parse_status(value: &str) -> Result<VisitStatus> {
    value.parse().map_err(BridgeError::Validation)
}
