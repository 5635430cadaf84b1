//! Processed-visit record model
//!
//! One [`ProcessedVisitRecord`] exists per visit id. It remembers whether the
//! visit's bundle was accepted by the HIE, so that later runs skip it, or
//! rejected, so that later runs retry it.

use crate::domain::ids::{PatientId, VisitId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Outcome of the last attempt to deliver a visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    Success,
    Failed,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Success => "success",
            VisitStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(VisitStatus::Success),
            "failed" => Ok(VisitStatus::Failed),
            other => Err(format!("Unknown visit status '{other}'")),
        }
    }
}

/// Durable record of one visit's delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedVisitRecord {
    pub visit_id: VisitId,
    pub patient_id: PatientId,
    /// Day the visit was closed
    pub visit_date: NaiveDate,
    pub status: VisitStatus,
    pub http_status: Option<u16>,
    /// Always `None` for successful records
    pub error_message: Option<String>,
    /// Start time of the batch run that wrote the record
    pub processed_at: DateTime<Utc>,
    /// UTC date of `processed_at`
    pub processed_date: NaiveDate,
}

impl ProcessedVisitRecord {
    pub fn success(
        visit_id: VisitId,
        patient_id: PatientId,
        visit_date: NaiveDate,
        http_status: u16,
        batch_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            visit_id,
            patient_id,
            visit_date,
            status: VisitStatus::Success,
            http_status: Some(http_status),
            error_message: None,
            processed_at: batch_timestamp,
            processed_date: batch_timestamp.date_naive(),
        }
    }

    pub fn failure(
        visit_id: VisitId,
        patient_id: PatientId,
        visit_date: NaiveDate,
        error_message: impl Into<String>,
        batch_timestamp: DateTime<Utc>,
        http_status: Option<u16>,
    ) -> Self {
        Self {
            visit_id,
            patient_id,
            visit_date,
            status: VisitStatus::Failed,
            http_status,
            error_message: Some(error_message.into()),
            processed_at: batch_timestamp,
            processed_date: batch_timestamp.date_naive(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == VisitStatus::Success
    }
}

/// Record counts for one processing day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub success: u64,
    pub failed: u64,
}

/// Record counts by status over a `processed_date` range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub success: u64,
    pub failed: u64,
    pub by_day: BTreeMap<NaiveDate, DailyStats>,
}

impl LedgerStats {
    pub fn empty(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            success: 0,
            failed: 0,
            by_day: BTreeMap::new(),
        }
    }

    /// Adds `count` records of `status` processed on `day`
    pub fn add(&mut self, day: NaiveDate, status: VisitStatus, count: u64) {
        let daily = self.by_day.entry(day).or_default();
        match status {
            VisitStatus::Success => {
                self.success += count;
                daily.success += count;
            }
            VisitStatus::Failed => {
                self.failed += count;
                daily.failed += count;
            }
        }
    }

    pub fn total(&self) -> u64 {
        self.success + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_status_round_trips_through_str() {
        assert_eq!("success".parse::<VisitStatus>().unwrap(), VisitStatus::Success);
        assert_eq!(VisitStatus::Failed.to_string(), "failed");
        assert!("pending".parse::<VisitStatus>().is_err());
    }

    #[test]
    fn test_success_clears_error_and_derives_processed_date() {
        let ts = DateTime::parse_from_rfc3339("2024-01-16T23:30:00-05:00")
            .unwrap()
            .with_timezone(&Utc);
        let record = ProcessedVisitRecord::success(
            VisitId::new("v1").unwrap(),
            PatientId::new("p1").unwrap(),
            date(15),
            201,
            ts,
        );
        assert!(record.is_success());
        assert_eq!(record.error_message, None);
        assert_eq!(record.processed_date, date(17));
    }

    #[test]
    fn test_stats_accumulate_per_day() {
        let mut stats = LedgerStats::empty(date(1), date(31));
        stats.add(date(2), VisitStatus::Success, 3);
        stats.add(date(2), VisitStatus::Failed, 1);
        stats.add(date(3), VisitStatus::Success, 2);

        assert_eq!(stats.success, 5);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total(), 6);
        assert_eq!(stats.by_day[&date(2)], DailyStats { success: 3, failed: 1 });
    }
}
