//! FHIR R4 complex datatypes shared by the resource types

use serde::{Deserialize, Serialize};

/// Coding system URLs used when synthesising resources
pub mod systems {
    pub const V3_ACT_CODE: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";
    pub const SNOMED: &str = "http://snomed.info/sct";
    pub const UCUM: &str = "http://unitsofmeasure.org";
    pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
}

/// A code from a terminology system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: &str, code: &str, display: &str) -> Self {
        Self {
            system: Some(system.to_string()),
            code: Some(code.to_string()),
            display: Some(display.to_string()),
        }
    }
}

/// A concept carried by one or more codings plus optional text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    pub fn single(coding: Coding) -> Self {
        Self {
            text: coding.display.clone(),
            coding: vec![coding],
        }
    }

    /// All codes carried by the concept, in coding order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.coding.iter().filter_map(|c| c.code.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.coding.is_empty() && self.text.is_none()
    }
}

/// A reference from one resource to another
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    pub fn to(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            display: None,
        }
    }

    /// Returns the id when the reference has the form `<resource_type>/<id>`
    pub fn id_for(&self, resource_type: &str) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(resource_type))
            .and_then(|r| r.strip_prefix('/'))
            .filter(|id| !id.is_empty())
    }
}

/// A measured amount
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quantity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A time range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Human-readable XHTML summary of a resource section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub status: String,
    pub div: String,
}

impl Narrative {
    /// Wraps plain text in an XHTML div, escaping markup characters
    pub fn generated(text: &str) -> Self {
        let mut escaped = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '&' => escaped.push_str("&amp;"),
                '<' => escaped.push_str("&lt;"),
                '>' => escaped.push_str("&gt;"),
                _ => escaped.push(ch),
            }
        }
        Self {
            status: "generated".to_string(),
            div: format!(
                "<div xmlns=\"{}\">{}</div>",
                systems::XHTML_NAMESPACE,
                escaped
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_id_for() {
        let r = Reference::to("Practitioner/abc-123");
        assert_eq!(r.id_for("Practitioner"), Some("abc-123"));
        assert_eq!(r.id_for("Location"), None);
        assert_eq!(Reference::to("Practitioner/").id_for("Practitioner"), None);
        assert_eq!(Reference::default().id_for("Practitioner"), None);
    }

    #[test]
    fn test_codeable_concept_codes() {
        let concept = CodeableConcept {
            coding: vec![
                Coding::new("urn:amrs", "1065", "Yes"),
                Coding {
                    system: None,
                    code: None,
                    display: Some("no code".to_string()),
                },
            ],
            text: None,
        };
        assert_eq!(concept.codes().collect::<Vec<_>>(), vec!["1065"]);
    }

    #[test]
    fn test_narrative_escapes_markup() {
        let n = Narrative::generated("a < b & c");
        assert!(n.div.contains("a &lt; b &amp; c"));
        assert_eq!(n.status, "generated");
    }

    #[test]
    fn test_coding_serialization_skips_none() {
        let json = serde_json::to_value(Coding {
            code: Some("x".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"code": "x"}));
    }
}
