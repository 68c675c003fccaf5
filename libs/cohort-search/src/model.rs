//! Data supplied by the host: concepts and dropdown options

use cohort_query::Hl7Abbrev;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A selectable option (location, form, encounter type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownValue {
    pub value: String,
    pub label: String,
}

impl DropdownValue {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A clinical concept as returned by the concept lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub uuid: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub answers: Vec<String>,
    pub hl7_abbrev: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub datatype: DataType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataType {
    pub uuid: String,
    pub hl7_abbreviation: String,
    pub description: String,
    pub name: String,
}

impl Concept {
    /// Typed datatype abbreviation; fails for datatypes without an
    /// observation search.
    pub fn hl7(&self) -> Result<Hl7Abbrev> {
        Ok(self.hl7_abbrev.parse()?)
    }
}
