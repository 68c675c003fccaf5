use crate::document::{
    RowFilter, SearchParams, COHORT_DEFINITION_PREFIX, PATIENT_DATA_SET_DEFINITION,
};
use crate::filter::{FilterKey, FilterParameters, Parameter};
use serde_json::Map;

/// Build the reporting query document for a set of row filter parameters.
///
/// One row filter is produced per key, in input order. Blank (empty string)
/// entries are dropped; a key with no remaining entries still yields a row
/// filter with empty `parameterValues`.
pub fn compose(params: &FilterParameters) -> SearchParams {
    let row_filters: Vec<RowFilter> = params
        .iter()
        .map(|(key, entries)| row_filter(key, entries))
        .collect();

    tracing::debug!(row_filters = row_filters.len(), "Composed cohort query");

    SearchParams::new(row_filters)
}

fn row_filter(key: FilterKey, entries: &[Parameter]) -> RowFilter {
    let mut parameter_values = Map::new();
    for entry in entries.iter().filter(|e| !e.is_blank()) {
        parameter_values.insert(entry.name.clone(), entry.value.clone());
    }

    RowFilter {
        key: format!("{COHORT_DEFINITION_PREFIX}{key}"),
        parameter_values,
        living_status: None,
        type_: PATIENT_DATA_SET_DEFINITION.to_string(),
    }
}
