//! Search by concepts
//!
//! Unlike the other modes this one has no submit step: every input change
//! recomputes the query and the latest [`Emission`] is authoritative.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use cohort_query::{compose, FilterParameters, Hl7Abbrev, Parameter, SearchParams};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::clock::{format_short_date, format_timestamp, lookback, Clock, SystemClock, Timestamp};
use crate::error::{Error, Result};
use crate::model::Concept;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    #[default]
    LessThan,
    LessEqual,
    Equal,
    GreaterEqual,
    GreaterThan,
}

impl Operator {
    pub const ALL: [Operator; 5] = [
        Operator::LessThan,
        Operator::LessEqual,
        Operator::Equal,
        Operator::GreaterEqual,
        Operator::GreaterThan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::LessThan => "LESS_THAN",
            Operator::LessEqual => "LESS_EQUAL",
            Operator::Equal => "EQUAL",
            Operator::GreaterEqual => "GREATER_EQUAL",
            Operator::GreaterThan => "GREATER_THAN",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::LessThan => "<",
            Operator::LessEqual => "<=",
            Operator::Equal => "=",
            Operator::GreaterEqual => ">=",
            Operator::GreaterThan => ">",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Operator::ALL
            .into_iter()
            .find(|op| op.as_str() == s || op.symbol() == s)
            .ok_or_else(|| format!("unknown operator '{s}'"))
    }
}

/// Which matching observation to consider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeModifier {
    #[default]
    Any,
    No,
    First,
    Last,
    Min,
    Max,
    Avg,
}

impl TimeModifier {
    /// Choices offered for numeric concepts.
    pub const NUMERIC: [TimeModifier; 7] = [
        TimeModifier::Any,
        TimeModifier::No,
        TimeModifier::First,
        TimeModifier::Last,
        TimeModifier::Min,
        TimeModifier::Max,
        TimeModifier::Avg,
    ];

    /// Choices offered for every other concept: has / has not.
    pub const PRESENCE: [TimeModifier; 2] = [TimeModifier::Any, TimeModifier::No];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeModifier::Any => "ANY",
            TimeModifier::No => "NO",
            TimeModifier::First => "FIRST",
            TimeModifier::Last => "LAST",
            TimeModifier::Min => "MIN",
            TimeModifier::Max => "MAX",
            TimeModifier::Avg => "AVG",
        }
    }
}

impl fmt::Display for TimeModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeModifier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TimeModifier::NUMERIC
            .into_iter()
            .find(|tm| tm.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown time modifier '{s}'"))
    }
}

/// The observation criteria behind one emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub time_modifier: TimeModifier,
    pub question: String,
    pub operator1: Operator,
    pub modifier: String,
    pub on_or_before: Option<Timestamp>,
    pub on_or_after: Option<Timestamp>,
    /// `None` when no positive value was entered.
    pub value1: Option<Decimal>,
}

impl Observation {
    /// Row filter entries for a concept of datatype `hl7`, blank fields
    /// omitted.
    pub fn to_parameters(&self, hl7: Hl7Abbrev) -> Vec<Parameter> {
        let mut params = Vec::new();

        if !self.modifier.is_empty() {
            if hl7.takes_value_list() {
                params.push(Parameter::new("values", json!([self.modifier])));
            } else {
                params.push(Parameter::new("value1", self.modifier.clone()));
            }
        }
        if let Some(ts) = &self.on_or_after {
            params.push(Parameter::new("onOrAfter", format_timestamp(ts)));
        }
        if let Some(ts) = &self.on_or_before {
            params.push(Parameter::new("onOrBefore", format_timestamp(ts)));
        }
        params.push(Parameter::new("operator1", self.operator1.as_str()));
        if !self.question.is_empty() {
            params.push(Parameter::new("question", self.question.clone()));
        }
        params.push(Parameter::new("timeModifier", self.time_modifier.as_str()));
        if let Some(value) = self.value1 {
            params.push(Parameter::new("value1", value.normalize().to_string()));
        }

        params
    }

    pub fn describe(&self, concept_name: &str, units: &str) -> String {
        let mut parts = vec![format!(
            "Patients with {} {}",
            self.time_modifier, concept_name
        )];

        if let Some(value) = self.value1 {
            parts.push(format!("{} {}", self.operator1.symbol(), value.normalize()));
            if !units.is_empty() {
                parts.push(units.to_string());
            }
        }
        if let Some(ts) = &self.on_or_after {
            parts.push(format!("since {}", format_short_date(ts)));
        }
        if let Some(ts) = &self.on_or_before {
            parts.push(format!("until {}", format_short_date(ts)));
        }

        parts.join(" ")
    }
}

/// A single user edit to the concepts form.
#[derive(Debug, Clone, PartialEq)]
pub enum ConceptInput {
    Concept(Concept),
    LastDays(u32),
    LastMonths(u32),
    OperatorValue(Decimal),
    Operator(Operator),
    TimeModifier(TimeModifier),
    DateRange { start: Timestamp, end: Timestamp },
    Modifier(String),
}

/// Query document and description produced after a change.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub search_params: SearchParams,
    pub description: String,
}

#[derive(Debug, Clone)]
struct SelectedConcept {
    concept: Concept,
    hl7: Hl7Abbrev,
}

/// Form state of the concepts search.
pub struct ConceptSearch {
    clock: Arc<dyn Clock>,
    selected: Option<SelectedConcept>,
    last_days: u32,
    last_months: u32,
    operator_value: Decimal,
    operator: Operator,
    time_modifier: TimeModifier,
    on_or_after: Option<Timestamp>,
    on_or_before: Option<Timestamp>,
    modifier: String,
}

impl Default for ConceptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptSearch {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            selected: None,
            last_days: 0,
            last_months: 0,
            operator_value: Decimal::ZERO,
            operator: Operator::LessThan,
            time_modifier: TimeModifier::Any,
            on_or_after: None,
            on_or_before: None,
            modifier: String::new(),
        }
    }

    /// Apply one edit and recompute.
    ///
    /// Returns `Ok(None)` while no concept is selected. Invalid input is
    /// rejected before any state changes.
    pub fn apply(&mut self, input: ConceptInput) -> Result<Option<Emission>> {
        match input {
            ConceptInput::Concept(concept) => {
                let hl7 = concept.hl7()?;
                tracing::debug!(concept = %concept.uuid, datatype = %hl7, "Concept selected");
                self.selected = Some(SelectedConcept { concept, hl7 });
            }
            ConceptInput::LastDays(days) => {
                lookback(self.clock.now(), days, self.last_months)?;
                self.last_days = days;
            }
            ConceptInput::LastMonths(months) => {
                lookback(self.clock.now(), self.last_days, months)?;
                self.last_months = months;
            }
            ConceptInput::OperatorValue(value) => {
                if value < Decimal::ZERO {
                    return Err(Error::InvalidNumber);
                }
                self.operator_value = value;
            }
            ConceptInput::Operator(operator) => self.operator = operator,
            ConceptInput::TimeModifier(time_modifier) => self.time_modifier = time_modifier,
            ConceptInput::DateRange { start, end } => {
                self.on_or_after = Some(start);
                self.on_or_before = Some(end);
            }
            ConceptInput::Modifier(modifier) => self.modifier = modifier,
        }

        self.emit()
    }

    /// Handle the parent's reset flag.
    pub fn on_reset_signal(&mut self, reset: bool) {
        if reset {
            self.reset();
        }
    }

    /// Return every field to its initial value.
    pub fn reset(&mut self) {
        self.selected = None;
        self.last_days = 0;
        self.last_months = 0;
        self.operator_value = Decimal::ZERO;
        self.operator = Operator::LessThan;
        self.time_modifier = TimeModifier::Any;
        self.on_or_after = None;
        self.on_or_before = None;
        self.modifier.clear();
    }

    /// Recompute the query for the current state.
    ///
    /// A positive lookback window overwrites the stored range end, so it
    /// persists into later emissions.
    pub fn emit(&mut self) -> Result<Option<Emission>> {
        if self.selected.is_none() {
            return Ok(None);
        }

        if self.last_days > 0 || self.last_months > 0 {
            let bound = lookback(self.clock.now(), self.last_days, self.last_months)?;
            self.on_or_before = Some(bound);
        }

        let Some(selected) = &self.selected else {
            return Ok(None);
        };
        let observation = self.observation(&selected.concept);
        let params = FilterParameters::new().with(
            selected.hl7.filter_key(),
            observation.to_parameters(selected.hl7),
        );
        let search_params = compose(&params);
        let description = observation.describe(&selected.concept.name, &selected.concept.units);

        tracing::debug!(
            filter = %selected.hl7.filter_key(),
            description = %description,
            "Concept search updated"
        );

        Ok(Some(Emission {
            search_params,
            description,
        }))
    }

    fn observation(&self, concept: &Concept) -> Observation {
        Observation {
            time_modifier: self.time_modifier,
            question: concept.uuid.clone(),
            operator1: self.operator,
            modifier: self.modifier.clone(),
            on_or_before: self.on_or_before,
            on_or_after: self.on_or_after,
            value1: (self.operator_value > Decimal::ZERO).then_some(self.operator_value),
        }
    }

    pub fn concept(&self) -> Option<&Concept> {
        self.selected.as_ref().map(|s| &s.concept)
    }

    /// Time modifiers the form offers for the selected concept.
    pub fn time_modifier_options(&self) -> &'static [TimeModifier] {
        match &self.selected {
            Some(s) if s.hl7.is_numeric() => &TimeModifier::NUMERIC,
            _ => &TimeModifier::PRESENCE,
        }
    }

    pub fn last_days(&self) -> u32 {
        self.last_days
    }

    pub fn last_months(&self) -> u32 {
        self.last_months
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operator_value(&self) -> Decimal {
        self.operator_value
    }

    pub fn time_modifier(&self) -> TimeModifier {
        self.time_modifier
    }

    pub fn on_or_after(&self) -> Option<Timestamp> {
        self.on_or_after
    }

    pub fn on_or_before(&self) -> Option<Timestamp> {
        self.on_or_before
    }

    pub fn modifier(&self) -> &str {
        &self.modifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parse() {
        assert_eq!("GREATER_EQUAL".parse::<Operator>(), Ok(Operator::GreaterEqual));
        assert_eq!(">=".parse::<Operator>(), Ok(Operator::GreaterEqual));
        assert!("BETWEEN".parse::<Operator>().is_err());
    }

    #[test]
    fn test_time_modifier_parse() {
        assert_eq!("avg".parse::<TimeModifier>(), Ok(TimeModifier::Avg));
        assert_eq!("LAST".parse::<TimeModifier>(), Ok(TimeModifier::Last));
        assert!("LATEST".parse::<TimeModifier>().is_err());
    }

    #[test]
    fn test_describe_without_qualifiers() {
        let observation = Observation {
            time_modifier: TimeModifier::No,
            question: "Q".to_string(),
            operator1: Operator::LessThan,
            modifier: String::new(),
            on_or_before: None,
            on_or_after: None,
            value1: None,
        };
        assert_eq!(
            observation.describe("Whole blood sample", ""),
            "Patients with NO Whole blood sample"
        );
    }

    #[test]
    fn test_value_is_normalized() {
        let observation = Observation {
            time_modifier: TimeModifier::Max,
            question: "Q".to_string(),
            operator1: Operator::GreaterThan,
            modifier: String::new(),
            on_or_before: None,
            on_or_after: None,
            value1: Some(Decimal::new(12050, 2)),
        };
        let params = observation.to_parameters(Hl7Abbrev::Nm);
        let value1 = params.iter().find(|p| p.name == "value1").unwrap();

        assert_eq!(value1.value, json!("120.5"));
        assert_eq!(
            observation.describe("BLOOD SUGAR", "mg/dl"),
            "Patients with MAX BLOOD SUGAR > 120.5 mg/dl"
        );
    }

    #[test]
    fn test_negative_value_rejected() {
        let mut search = ConceptSearch::new();
        let result = search.apply(ConceptInput::OperatorValue(Decimal::new(-5, 0)));

        assert_eq!(result, Err(Error::InvalidNumber));
        assert_eq!(search.operator_value(), Decimal::ZERO);
        assert_eq!(Error::InvalidNumber.to_string(), "Number is not valid");
    }

    #[test]
    fn test_no_emission_without_concept() {
        let mut search = ConceptSearch::new();
        assert_eq!(search.apply(ConceptInput::LastDays(3)).unwrap(), None);
        assert_eq!(search.time_modifier_options(), &TimeModifier::PRESENCE);
    }
}
