//! Search by encounters

use cohort_query::{compose, FilterKey, FilterParameters, Parameter, SearchParams};
use serde_json::{json, Value};

use crate::clock::{format_short_date, format_timestamp, Timestamp};
use crate::error::{Error, Result};
use crate::host::{InFlight, Notification, Notifier, OptionSource, SubmitHandler};
use crate::model::DropdownValue;

/// What an explicit reset clears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Counts and dates only; encounter type, form and location stay selected.
    #[default]
    KeepSelections,
    /// Everything, including dropdown selections.
    ClearAll,
}

/// Dropdown choices fetched when the form is mounted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncounterOptions {
    pub encounter_types: Vec<DropdownValue>,
    pub forms: Vec<DropdownValue>,
    pub locations: Vec<DropdownValue>,
}

/// Everything the user entered for an encounter search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncounterCriteria {
    pub encounter_types: Vec<DropdownValue>,
    pub form: Option<DropdownValue>,
    pub location: Option<DropdownValue>,
    pub at_least_count: u32,
    pub at_most_count: u32,
    pub on_or_after: Option<Timestamp>,
    pub on_or_before: Option<Timestamp>,
}

impl EncounterCriteria {
    /// `encounterSearchAdvanced` entries for these criteria.
    ///
    /// `locationList` is always present; without a selected location it
    /// carries `[null]`.
    pub fn parameters(&self) -> Vec<Parameter> {
        let mut params = Vec::new();

        if !self.encounter_types.is_empty() {
            let values: Vec<&str> = self
                .encounter_types
                .iter()
                .map(|t| t.value.as_str())
                .collect();
            params.push(Parameter::new("encounterTypeList", json!(values)));
        }
        let location = self
            .location
            .as_ref()
            .map_or(Value::Null, |l| Value::String(l.value.clone()));
        params.push(Parameter::new("locationList", json!([location])));
        if let Some(form) = &self.form {
            params.push(Parameter::new("formList", json!([form.value])));
        }
        if self.at_least_count > 0 {
            params.push(Parameter::new("atLeastCount", self.at_least_count));
        }
        if self.at_most_count > 0 {
            params.push(Parameter::new("atMostCount", self.at_most_count));
        }
        if let Some(ts) = &self.on_or_after {
            params.push(Parameter::new("onOrAfter", format_timestamp(ts)));
        }
        if let Some(ts) = &self.on_or_before {
            params.push(Parameter::new("onOrBefore", format_timestamp(ts)));
        }

        params
    }

    pub fn query_details(&self) -> SearchParams {
        let params =
            FilterParameters::new().with(FilterKey::EncounterSearchAdvanced, self.parameters());
        compose(&params)
    }

    pub fn describe(&self) -> String {
        let mut description = String::from("Patients with Encounter of");

        if self.encounter_types.is_empty() {
            description.push_str(" any Type");
        } else {
            let labels: Vec<&str> = self
                .encounter_types
                .iter()
                .map(|t| t.label.as_str())
                .collect();
            description.push_str(&format!(" Types {}", labels.join(", ")));
        }
        if let Some(location) = &self.location {
            description.push_str(&format!(" at {}", location.label));
        }
        if let Some(form) = &self.form {
            description.push_str(&format!(" from {}", form.label));
        }
        match (self.at_least_count, self.at_most_count) {
            (0, 0) => {}
            (least, 0) => description.push_str(&format!(" at least {least} times")),
            (0, most) => description.push_str(&format!(" at most {most} times")),
            (least, most) => {
                description.push_str(&format!(" at least {least} and at most {most} times"))
            }
        }
        if let Some(ts) = &self.on_or_after {
            description.push_str(&format!(" since {}", format_short_date(ts)));
        }
        if let Some(ts) = &self.on_or_before {
            description.push_str(&format!(" until {}", format_short_date(ts)));
        }
        description.push('.');

        description
    }
}

/// A built search waiting for the host's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub search_params: SearchParams,
    pub description: String,
}

/// Form state of the encounters search.
#[derive(Debug, Default)]
pub struct EncounterSearch {
    criteria: EncounterCriteria,
    options: EncounterOptions,
    reset_policy: ResetPolicy,
    is_loading: bool,
}

impl EncounterSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reset_policy(reset_policy: ResetPolicy) -> Self {
        Self {
            reset_policy,
            ..Self::default()
        }
    }

    /// Fetch encounter types, forms and locations, in that order.
    ///
    /// The first failure is reported through `notifier` and stops loading;
    /// lists not fetched yet stay empty and the form remains usable.
    pub async fn load_options(&mut self, source: &dyn OptionSource, notifier: &dyn Notifier) {
        if let Err(e) = self.fetch_options(source).await {
            tracing::warn!(error = %e, "Failed to load encounter search options");
            notifier.notify(Notification::error(e.to_string()));
        }
    }

    async fn fetch_options(&mut self, source: &dyn OptionSource) -> Result<()> {
        self.options.encounter_types = source.fetch_encounter_types().await?;
        self.options.forms = source.fetch_forms().await?;
        self.options.locations = source.fetch_locations().await?;
        tracing::debug!(
            encounter_types = self.options.encounter_types.len(),
            forms = self.options.forms.len(),
            locations = self.options.locations.len(),
            "Encounter search options loaded"
        );
        Ok(())
    }

    pub fn select_encounter_types(&mut self, encounter_types: Vec<DropdownValue>) {
        self.criteria.encounter_types = encounter_types;
    }

    pub fn select_form(&mut self, form: DropdownValue) {
        self.criteria.form = Some(form);
    }

    pub fn select_location(&mut self, location: DropdownValue) {
        self.criteria.location = Some(location);
    }

    pub fn set_at_least_count(&mut self, count: u32) {
        self.criteria.at_least_count = count;
    }

    pub fn set_at_most_count(&mut self, count: u32) {
        self.criteria.at_most_count = count;
    }

    pub fn set_date_range(&mut self, start: Timestamp, end: Timestamp) {
        self.criteria.on_or_after = Some(start);
        self.criteria.on_or_before = Some(end);
    }

    pub fn reset(&mut self) {
        self.criteria.at_least_count = 0;
        self.criteria.at_most_count = 0;
        self.criteria.on_or_after = None;
        self.criteria.on_or_before = None;

        if self.reset_policy == ResetPolicy::ClearAll {
            self.criteria.encounter_types.clear();
            self.criteria.form = None;
            self.criteria.location = None;
        }
    }

    /// Mark a submission in flight and build its query.
    ///
    /// Fails while a previous submission has not finished.
    pub fn begin_submit(&mut self) -> Result<Submission> {
        if self.is_loading {
            return Err(Error::SubmitInFlight);
        }
        self.is_loading = true;

        Ok(Submission {
            search_params: self.criteria.query_details(),
            description: self.criteria.describe(),
        })
    }

    pub fn finish_submit(&mut self) {
        self.is_loading = false;
    }

    /// Build the query and hand it to the host, returning the host's verdict.
    pub async fn submit(&mut self, handler: &dyn SubmitHandler) -> Result<bool> {
        let submission = self.begin_submit()?;
        let _in_flight = InFlight::new(&mut self.is_loading);
        tracing::info!(description = %submission.description, "Submitting encounter search");

        let accepted = handler
            .on_submit(submission.search_params, submission.description)
            .await;

        Ok(accepted)
    }

    pub fn criteria(&self) -> &EncounterCriteria {
        &self.criteria
    }

    pub fn options(&self) -> &EncounterOptions {
        &self.options
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }
}
