//! Reporting query document
//!
//! The wire shape accepted by the reporting REST module's ad-hoc dataset
//! endpoint. Field names and constant values must match exactly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Dataset definition type used for the query and for every row filter.
pub const PATIENT_DATA_SET_DEFINITION: &str =
    "org.openmrs.module.reporting.dataset.definition.PatientDataSetDefinition";

/// Type of every output column.
pub const PATIENT_DATA_DEFINITION: &str =
    "org.openmrs.module.reporting.data.patient.definition.PatientDataDefinition";

/// Prefix of the reporting library's built-in cohort definitions.
pub const COHORT_DEFINITION_PREFIX: &str = "reporting.library.cohortDefinition.builtIn.";

const PATIENT_DATA_PREFIX: &str = "reporting.library.patientDataDefinition.builtIn.";

/// Row filters are always combined as a single clause.
pub const CUSTOM_ROW_FILTER_COMBINATION: &str = "1";

const COLUMNS: [(&str, &str); 5] = [
    ("firstname", "preferredName.givenName"),
    ("lastname", "preferredName.familyName"),
    ("gender", "gender"),
    ("age", "ageOnDate.fullYears"),
    ("patientId", "patientId"),
];

/// Top-level envelope handed to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: Query,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(rename = "type")]
    pub type_: String,
    pub columns: Vec<Column>,
    pub row_filters: Vec<RowFilter>,
    pub custom_row_filter_combination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub key: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFilter {
    pub key: String,
    pub parameter_values: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub living_status: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
}

/// The fixed patient attribute columns every search returns.
pub fn default_columns() -> Vec<Column> {
    COLUMNS
        .iter()
        .map(|(name, path)| Column {
            name: (*name).to_string(),
            key: format!("{PATIENT_DATA_PREFIX}{path}"),
            type_: Some(PATIENT_DATA_DEFINITION.to_string()),
        })
        .collect()
}

impl SearchParams {
    /// Wrap row filters in the fixed envelope.
    pub fn new(row_filters: Vec<RowFilter>) -> Self {
        Self {
            query: Query {
                type_: PATIENT_DATA_SET_DEFINITION.to_string(),
                columns: default_columns(),
                row_filters,
                custom_row_filter_combination: CUSTOM_ROW_FILTER_COMBINATION.to_string(),
                name: None,
                description: None,
            },
        }
    }

    /// Copy of this document carrying a saved-search name and description.
    pub fn with_name(&self, name: impl Into<String>, description: impl Into<String>) -> Self {
        let mut named = self.clone();
        named.query.name = Some(name.into());
        named.query.description = Some(description.into());
        named
    }

    pub fn to_json(&self) -> Value {
        // Only string keys and JSON values; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
