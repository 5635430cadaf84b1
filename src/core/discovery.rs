//! Visit discovery
//!
//! Finds the visits closed on a date. Any failure here is a
//! [`BridgeError::Query`] and is fatal to the run for that date.

use crate::adapters::amrs::VisitSource;
use crate::domain::{parse_visit_date, BridgeError, ClosedVisits, Result};
use chrono::NaiveDate;
use std::sync::Arc;

pub struct VisitDiscovery {
    source: Arc<dyn VisitSource>,
}

impl VisitDiscovery {
    pub fn new(source: Arc<dyn VisitSource>) -> Self {
        Self { source }
    }

    /// Visits closed on `date` (`YYYY-MM-DD`), grouped by patient
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Query`] for a malformed date or when the source
    /// fails.
    pub async fn find_closed_visits(&self, date: &str) -> Result<ClosedVisits> {
        let date = parse_visit_date(date).map_err(BridgeError::Query)?;
        self.find_closed_visits_on(date).await
    }

    pub async fn find_closed_visits_on(&self, date: NaiveDate) -> Result<ClosedVisits> {
        self.source.find_closed_visits(date).await.map_err(|e| match e {
            BridgeError::Query(_) => e,
            other => BridgeError::Query(format!("Visit lookup for {date} failed: {other}")),
        })
    }
}
