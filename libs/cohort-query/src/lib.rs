//! Cohort query composition
//!
//! Turns row filter parameters collected by the cohort builder's search modes
//! into the query document understood by the reporting REST module.
//!
//! # Example
//!
//! ```rust
//! use cohort_query::{compose, FilterKey, FilterParameters, Parameter};
//!
//! let params = FilterParameters::new().with(
//!     FilterKey::EncounterSearchAdvanced,
//!     vec![
//!         Parameter::new("locationList", serde_json::json!(["loc-1"])),
//!         Parameter::new("timeQualifier", "FIRST"),
//!     ],
//! );
//!
//! let doc = compose(&params);
//! assert_eq!(doc.query.row_filters.len(), 1);
//! assert_eq!(doc.query.columns.len(), 5);
//! ```

pub mod compose;
pub mod document;
pub mod error;
pub mod filter;

pub use compose::compose;
pub use document::{
    default_columns, Column, Query, RowFilter, SearchParams, COHORT_DEFINITION_PREFIX,
    CUSTOM_ROW_FILTER_COMBINATION, PATIENT_DATA_DEFINITION, PATIENT_DATA_SET_DEFINITION,
};
pub use error::{Error, Result};
pub use filter::{FilterKey, FilterParameters, Hl7Abbrev, Parameter};
