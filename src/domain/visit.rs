//! Closed AMRS visits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ids::{PatientId, VisitId};

/// A visit that was closed (given a stop time) in AMRS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub visit_id: VisitId,
    pub patient_id: PatientId,
    pub closed_at: DateTime<Utc>,
}

/// Visits closed on one date, grouped by patient
///
/// Each patient's list is ordered by `closed_at` ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosedVisits {
    by_patient: BTreeMap<PatientId, Vec<Visit>>,
}

impl ClosedVisits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups visits by patient and sorts each group by close time
    pub fn from_visits(visits: impl IntoIterator<Item = Visit>) -> Self {
        let mut by_patient: BTreeMap<PatientId, Vec<Visit>> = BTreeMap::new();
        for visit in visits {
            by_patient
                .entry(visit.patient_id.clone())
                .or_default()
                .push(visit);
        }
        for list in by_patient.values_mut() {
            list.sort_by(|a, b| a.closed_at.cmp(&b.closed_at));
        }
        Self { by_patient }
    }

    pub fn is_empty(&self) -> bool {
        self.by_patient.is_empty()
    }

    pub fn patient_count(&self) -> usize {
        self.by_patient.len()
    }

    pub fn visit_count(&self) -> usize {
        self.by_patient.values().map(Vec::len).sum()
    }

    /// All visit ids, flattened in patient then close-time order
    pub fn visit_ids(&self) -> Vec<VisitId> {
        self.visits().map(|v| v.visit_id.clone()).collect()
    }

    /// All visits, flattened in patient then close-time order
    pub fn visits(&self) -> impl Iterator<Item = &Visit> {
        self.by_patient.values().flatten()
    }

    pub fn for_patient(&self, patient_id: &PatientId) -> &[Visit] {
        self.by_patient
            .get(patient_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PatientId, &Vec<Visit>)> {
        self.by_patient.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn visit(id: &str, patient: &str, hour: u32) -> Visit {
        Visit {
            visit_id: VisitId::new(id).unwrap(),
            patient_id: PatientId::new(patient).unwrap(),
            closed_at: Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_groups_and_orders_by_close_time() {
        let closed = ClosedVisits::from_visits(vec![
            visit("v2", "patientA", 14),
            visit("v3", "patientB", 9),
            visit("v1", "patientA", 8),
        ]);

        assert_eq!(closed.patient_count(), 2);
        assert_eq!(closed.visit_count(), 3);

        let a = closed.for_patient(&PatientId::new("patientA").unwrap());
        assert_eq!(a[0].visit_id.as_str(), "v1");
        assert_eq!(a[1].visit_id.as_str(), "v2");

        let ids: Vec<String> = closed.visit_ids().into_iter().map(VisitId::into_inner).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn test_unknown_patient_has_no_visits() {
        let closed = ClosedVisits::new();
        assert!(closed.is_empty());
        assert!(closed
            .for_patient(&PatientId::new("nobody").unwrap())
            .is_empty());
    }
}
