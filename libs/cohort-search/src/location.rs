//! Search by location

use std::fmt;

use cohort_query::{compose, FilterKey, FilterParameters, Parameter, SearchParams};
use serde_json::json;

use crate::error::{Error, Result};
use crate::host::{InFlight, Notification, Notifier, OptionSource, SubmitHandler};
use crate::model::DropdownValue;

/// Which of a patient's encounters must have happened at the location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncounterMethod {
    First,
    Last,
    #[default]
    Any,
}

impl EncounterMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncounterMethod::First => "FIRST",
            EncounterMethod::Last => "LAST",
            EncounterMethod::Any => "ANY",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            EncounterMethod::First => "EARLIEST_ENCOUNTER",
            EncounterMethod::Last => "LATEST_ENCOUNTER",
            EncounterMethod::Any => "ANY_ENCOUNTER",
        }
    }
}

/// Anything other than `FIRST` or `LAST` means any encounter.
impl From<&str> for EncounterMethod {
    fn from(s: &str) -> Self {
        match s {
            "FIRST" => EncounterMethod::First,
            "LAST" => EncounterMethod::Last,
            _ => EncounterMethod::Any,
        }
    }
}

impl fmt::Display for EncounterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn query_details(method: EncounterMethod, location: &DropdownValue) -> SearchParams {
    let params = FilterParameters::new().with(
        FilterKey::EncounterSearchAdvanced,
        vec![
            Parameter::new("locationList", json!([location.value])),
            Parameter::new("timeQualifier", method.as_str()),
        ],
    );
    compose(&params)
}

pub fn describe(method: EncounterMethod, location: &DropdownValue) -> String {
    format!(
        "Patients in {} (by method {}).",
        location.label,
        method.description()
    )
}

/// Form state of the location search.
#[derive(Debug, Default)]
pub struct LocationSearch {
    locations: Vec<DropdownValue>,
    method: EncounterMethod,
    location: Option<DropdownValue>,
    is_loading: bool,
}

impl LocationSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load_options(&mut self, source: &dyn OptionSource, notifier: &dyn Notifier) {
        match source.fetch_locations().await {
            Ok(locations) => self.locations = locations,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load locations");
                notifier.notify(Notification::error(e.to_string()));
            }
        }
    }

    pub fn set_method(&mut self, method: EncounterMethod) {
        self.method = method;
    }

    pub fn select_location(&mut self, location: DropdownValue) {
        self.location = Some(location);
    }

    pub async fn submit(&mut self, handler: &dyn SubmitHandler) -> Result<bool> {
        if self.is_loading {
            return Err(Error::SubmitInFlight);
        }
        let location = self.location.as_ref().ok_or(Error::NoLocationSelected)?;
        let search_params = query_details(self.method, location);
        let description = describe(self.method, location);

        let _in_flight = InFlight::new(&mut self.is_loading);
        tracing::info!(description = %description, "Submitting location search");
        let accepted = handler.on_submit(search_params, description).await;

        Ok(accepted)
    }

    pub fn locations(&self) -> &[DropdownValue] {
        &self.locations
    }

    pub fn method(&self) -> EncounterMethod {
        self.method
    }

    pub fn location(&self) -> Option<&DropdownValue> {
        self.location.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
}
