//! Row filter keys, datatype abbreviations and composer input
//!
//! The reporting module exposes a fixed set of built-in cohort definitions.
//! [`FilterKey`] names the ones the search modes target and [`Hl7Abbrev`]
//! maps a concept's datatype onto one of them.

use crate::error::{Error, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Built-in cohort definition targeted by a row filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKey {
    CodedObsSearchAdvanced,
    NumericObsSearchAdvanced,
    DateObsSearchAdvanced,
    TextObsSearchAdvanced,
    EncounterSearchAdvanced,
}

impl FilterKey {
    pub const ALL: [FilterKey; 5] = [
        FilterKey::CodedObsSearchAdvanced,
        FilterKey::NumericObsSearchAdvanced,
        FilterKey::DateObsSearchAdvanced,
        FilterKey::TextObsSearchAdvanced,
        FilterKey::EncounterSearchAdvanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::CodedObsSearchAdvanced => "codedObsSearchAdvanced",
            FilterKey::NumericObsSearchAdvanced => "numericObsSearchAdvanced",
            FilterKey::DateObsSearchAdvanced => "dateObsSearchAdvanced",
            FilterKey::TextObsSearchAdvanced => "textObsSearchAdvanced",
            FilterKey::EncounterSearchAdvanced => "encounterSearchAdvanced",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FilterKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::UnknownFilterKey(s.to_string()))
    }
}

/// HL7 datatype abbreviation of a concept.
///
/// Only the abbreviations that have an observation search are represented;
/// parsing anything else fails with [`Error::UnsupportedDatatype`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hl7Abbrev {
    /// Coded with exceptions
    Cwe,
    /// Numeric
    Nm,
    /// Date
    Dt,
    /// String
    St,
    /// Timestamp / free text
    Ts,
    /// Not associated with a datatype (terms, sets)
    Zz,
    /// Boolean
    Bit,
}

impl Hl7Abbrev {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hl7Abbrev::Cwe => "CWE",
            Hl7Abbrev::Nm => "NM",
            Hl7Abbrev::Dt => "DT",
            Hl7Abbrev::St => "ST",
            Hl7Abbrev::Ts => "TS",
            Hl7Abbrev::Zz => "ZZ",
            Hl7Abbrev::Bit => "BIT",
        }
    }

    /// The row filter an observation of this datatype is searched with.
    pub fn filter_key(&self) -> FilterKey {
        match self {
            Hl7Abbrev::Cwe | Hl7Abbrev::Zz | Hl7Abbrev::Bit => FilterKey::CodedObsSearchAdvanced,
            Hl7Abbrev::Nm => FilterKey::NumericObsSearchAdvanced,
            Hl7Abbrev::Dt | Hl7Abbrev::St => FilterKey::DateObsSearchAdvanced,
            Hl7Abbrev::Ts => FilterKey::TextObsSearchAdvanced,
        }
    }

    /// Whether the observation modifier is sent as a `values` list rather
    /// than a scalar `value1`.
    pub fn takes_value_list(&self) -> bool {
        matches!(self, Hl7Abbrev::Cwe | Hl7Abbrev::Ts)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Hl7Abbrev::Nm)
    }
}

impl fmt::Display for Hl7Abbrev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hl7Abbrev {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CWE" => Ok(Hl7Abbrev::Cwe),
            "NM" => Ok(Hl7Abbrev::Nm),
            "DT" => Ok(Hl7Abbrev::Dt),
            "ST" => Ok(Hl7Abbrev::St),
            "TS" => Ok(Hl7Abbrev::Ts),
            "ZZ" => Ok(Hl7Abbrev::Zz),
            "BIT" => Ok(Hl7Abbrev::Bit),
            other => Err(Error::UnsupportedDatatype(other.to_string())),
        }
    }
}

/// A single `{name, value}` entry of a row filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Empty strings mean "not entered" and never reach the wire format.
    pub fn is_blank(&self) -> bool {
        matches!(&self.value, Value::String(s) if s.is_empty())
    }
}

/// Ordered mapping of filter key to parameter entries; the composer's input.
///
/// Keys are unique. Inserting an existing key replaces its entries but keeps
/// its original position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterParameters {
    entries: Vec<(FilterKey, Vec<Parameter>)>,
}

impl FilterParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: FilterKey, parameters: Vec<Parameter>) -> Self {
        self.insert(key, parameters);
        self
    }

    pub fn insert(&mut self, key: FilterKey, parameters: Vec<Parameter>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = parameters,
            None => self.entries.push((key, parameters)),
        }
    }

    pub fn get(&self, key: FilterKey) -> Option<&[Parameter]> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, params)| params.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &[Parameter])> {
        self.entries
            .iter()
            .map(|(key, params)| (*key, params.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FilterParameters {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, params) in &self.entries {
            map.serialize_entry(key, params)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FilterParameters {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FilterParametersVisitor;

        impl<'de> Visitor<'de> for FilterParametersVisitor {
            type Value = FilterParameters;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping filter keys to parameter lists")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut out = FilterParameters::new();
                while let Some((key, params)) = map.next_entry::<FilterKey, Vec<Parameter>>()? {
                    out.insert(key, params);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(FilterParametersVisitor)
    }
}
