//! Domain identifier types with validation
//!
//! Newtype wrappers for the AMRS identifiers that flow through a sync run.
//! Each type rejects blank input so that a visit or patient without an id
//! never reaches the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// AMRS visit identifier
///
/// The ledger's primary key: exactly one processed-visit record exists per
/// `VisitId`.
///
/// # Examples
///
/// ```
/// use hie_bridge::domain::ids::VisitId;
/// use std::str::FromStr;
///
/// let visit_id = VisitId::from_str("0a1b2c3d-4e5f-6789-abcd-ef0123456789").unwrap();
/// assert_eq!(visit_id.as_str(), "0a1b2c3d-4e5f-6789-abcd-ef0123456789");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisitId(String);

impl VisitId {
    /// Creates a new VisitId from a string
    ///
    /// # Returns
    ///
    /// Returns `Ok(VisitId)` if the ID is valid, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Visit ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the visit ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VisitId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for VisitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// AMRS patient identifier
///
/// Local to AMRS. The HIE client-registry id for the same person is obtained
/// through the identity mapping service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatientId(String);

impl PatientId {
    /// Creates a new PatientId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Patient ID cannot be empty".to_string());
        }
        Ok(Self(id))
    }

    /// Returns the patient ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parses a `YYYY-MM-DD` calendar date
pub fn parse_visit_date(date: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{date}', expected YYYY-MM-DD: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_id_creation() {
        let id = VisitId::new("v-123").unwrap();
        assert_eq!(id.as_str(), "v-123");
    }

    #[test]
    fn test_visit_id_empty_fails() {
        assert!(VisitId::new("").is_err());
        assert!(VisitId::new("   ").is_err());
    }

    #[test]
    fn test_patient_id_display() {
        let id = PatientId::new("patientA").unwrap();
        assert_eq!(format!("{}", id), "patientA");
    }

    #[test]
    fn test_patient_id_from_str() {
        let id: PatientId = "patientA".parse().unwrap();
        assert_eq!(id.into_inner(), "patientA");
    }

    #[test]
    fn test_patient_id_ordering() {
        let a = PatientId::new("a").unwrap();
        let b = PatientId::new("b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_visit_id_serialization() {
        let id = VisitId::new("v1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"v1\"");
        let deserialized: VisitId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_parse_visit_date() {
        let date = parse_visit_date("2024-01-15").unwrap();
        assert_eq!(date.to_string(), "2024-01-15");
        assert!(parse_visit_date("15/01/2024").is_err());
        assert!(parse_visit_date("2024-13-01").is_err());
    }
}
