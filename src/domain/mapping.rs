//! Cross-system identity mapping types

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of identifier being mapped from AMRS to the HIE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Practitioner,
    Facility,
    Patient,
}

impl MappingKind {
    pub const ALL: [MappingKind; 3] = [
        MappingKind::Practitioner,
        MappingKind::Facility,
        MappingKind::Patient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MappingKind::Practitioner => "practitioner",
            MappingKind::Facility => "facility",
            MappingKind::Patient => "patient",
        }
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved local → HIE identifier pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMapping {
    pub local_id: String,
    pub remote_id: String,
    pub kind: MappingKind,
}

/// HIE identifiers that apply to one encounter
///
/// Computed once per encounter and reused for its observations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncounterMapping {
    pub practitioner: Option<String>,
    pub facility: Option<String>,
}

/// Visit and location an encounter belongs to, as known to the HIE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncounterContext {
    pub location_uuid: String,
    pub visit_uuid: String,
}
