use std::sync::Arc;

use chrono::{DateTime, Duration, Months};
use cohort_search::clock::format_timestamp;
use cohort_search::{
    Concept, ConceptInput, ConceptSearch, Error, FixedClock, Operator, TimeModifier, Timestamp,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn now() -> Timestamp {
    DateTime::parse_from_rfc3339("2026-10-19T08:30:00+03:00").unwrap()
}

fn search() -> ConceptSearch {
    ConceptSearch::with_clock(Arc::new(FixedClock(now())))
}

fn concept(uuid: &str, hl7: &str, name: &str) -> Concept {
    serde_json::from_value(json!({
        "uuid": uuid,
        "units": if hl7 == "NM" { "mg/dl" } else { "" },
        "answers": [],
        "hl7Abbrev": hl7,
        "name": name,
        "description": "",
        "datatype": {
            "uuid": "8d4a4488-c2cc-11de-8d13-0010c6dffd0f",
            "name": name,
            "description": "",
            "hl7Abbreviation": hl7
        }
    }))
    .unwrap()
}

fn blood_sugar() -> Concept {
    concept("2a08da66-f326-4cac-b4cc-6efd68333847", "NM", "BLOOD SUGAR")
}

fn parameter_values(search: &mut ConceptSearch) -> Value {
    let emission = search.emit().unwrap().expect("concept selected");
    serde_json::to_value(&emission.search_params.query.row_filters[0].parameter_values).unwrap()
}

#[test]
fn numeric_concept_with_relative_lookback() {
    let mut search = search();
    search.apply(ConceptInput::Concept(blood_sugar())).unwrap();
    search.apply(ConceptInput::LastDays(15)).unwrap();
    let emission = search.apply(ConceptInput::LastMonths(4)).unwrap().unwrap();

    let expected_bound = (now() - Duration::days(15))
        .checked_sub_months(Months::new(4))
        .unwrap();
    let filter = &emission.search_params.query.row_filters[0];

    assert_eq!(
        filter.key,
        "reporting.library.cohortDefinition.builtIn.numericObsSearchAdvanced"
    );
    assert_eq!(
        serde_json::to_value(&filter.parameter_values).unwrap(),
        json!({
            "onOrBefore": format_timestamp(&expected_bound),
            "operator1": "LESS_THAN",
            "question": "2a08da66-f326-4cac-b4cc-6efd68333847",
            "timeModifier": "ANY"
        })
    );
    assert!(!filter.parameter_values.contains_key("value1"));
    assert_eq!(format_timestamp(&expected_bound), "2026-06-04T08:30:00+03:00");
    assert_eq!(
        emission.description,
        "Patients with ANY BLOOD SUGAR until 4/6/2026"
    );
}

#[test]
fn lookback_overwrites_explicit_range_end() {
    let mut search = search();
    let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00+03:00").unwrap();
    let end = DateTime::parse_from_rfc3339("2026-09-30T00:00:00+03:00").unwrap();

    search.apply(ConceptInput::Concept(blood_sugar())).unwrap();
    search.apply(ConceptInput::DateRange { start, end }).unwrap();
    let values = parameter_values(&mut search);
    assert_eq!(values["onOrAfter"], json!("2026-01-01T00:00:00+03:00"));
    assert_eq!(values["onOrBefore"], json!("2026-09-30T00:00:00+03:00"));

    search.apply(ConceptInput::LastDays(19)).unwrap();
    let values = parameter_values(&mut search);
    assert_eq!(values["onOrAfter"], json!("2026-01-01T00:00:00+03:00"));
    assert_eq!(values["onOrBefore"], json!("2026-09-30T08:30:00+03:00"));

    // The derived bound is kept once the window is cleared again.
    search.apply(ConceptInput::LastDays(0)).unwrap();
    let values = parameter_values(&mut search);
    assert_eq!(values["onOrBefore"], json!("2026-09-30T08:30:00+03:00"));
}

#[test]
fn positive_value_is_emitted_and_described() {
    let mut search = search();
    search.apply(ConceptInput::Concept(blood_sugar())).unwrap();
    search
        .apply(ConceptInput::Operator(Operator::GreaterEqual))
        .unwrap();
    search
        .apply(ConceptInput::TimeModifier(TimeModifier::Last))
        .unwrap();
    let emission = search
        .apply(ConceptInput::OperatorValue(Decimal::from(180)))
        .unwrap()
        .unwrap();

    let values =
        serde_json::to_value(&emission.search_params.query.row_filters[0].parameter_values)
            .unwrap();
    assert_eq!(values["value1"], json!("180"));
    assert_eq!(values["operator1"], json!("GREATER_EQUAL"));
    assert_eq!(values["timeModifier"], json!("LAST"));
    assert_eq!(
        emission.description,
        "Patients with LAST BLOOD SUGAR >= 180 mg/dl"
    );
}

#[test]
fn zero_value_is_treated_as_unset() {
    let mut search = search();
    search.apply(ConceptInput::Concept(blood_sugar())).unwrap();
    search
        .apply(ConceptInput::OperatorValue(Decimal::from(5)))
        .unwrap();
    let emission = search
        .apply(ConceptInput::OperatorValue(Decimal::ZERO))
        .unwrap()
        .unwrap();

    assert!(!emission.search_params.query.row_filters[0]
        .parameter_values
        .contains_key("value1"));
}

#[test]
fn coded_and_text_modifiers_use_values_list() {
    for hl7 in ["CWE", "TS"] {
        let mut search = search();
        search
            .apply(ConceptInput::Concept(concept("c-1", hl7, "HIV STATUS")))
            .unwrap();
        let emission = search
            .apply(ConceptInput::Modifier("703AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into()))
            .unwrap()
            .unwrap();
        let values = &emission.search_params.query.row_filters[0].parameter_values;

        assert_eq!(
            values["values"],
            json!(["703AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"]),
            "{hl7}"
        );
        assert!(!values.contains_key("value1"), "{hl7}");
    }
}

#[test]
fn other_modifiers_use_scalar_value() {
    let mut search = search();
    search
        .apply(ConceptInput::Concept(concept("d-1", "DT", "DATE OF DIAGNOSIS")))
        .unwrap();
    let emission = search
        .apply(ConceptInput::Modifier("2026-01-01".into()))
        .unwrap()
        .unwrap();
    let filter = &emission.search_params.query.row_filters[0];

    assert_eq!(
        filter.key,
        "reporting.library.cohortDefinition.builtIn.dateObsSearchAdvanced"
    );
    assert_eq!(filter.parameter_values["value1"], json!("2026-01-01"));
    assert!(!filter.parameter_values.contains_key("values"));
}

#[test]
fn presence_search_for_coded_concept() {
    let mut search = search();
    let emission = search
        .apply(ConceptInput::Concept(concept(
            "1000AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "ZZ",
            "Whole blood sample",
        )))
        .unwrap()
        .unwrap();
    assert_eq!(search.time_modifier_options(), &TimeModifier::PRESENCE);

    let filter = &emission.search_params.query.row_filters[0];
    assert_eq!(
        filter.key,
        "reporting.library.cohortDefinition.builtIn.codedObsSearchAdvanced"
    );
    assert_eq!(
        serde_json::to_value(&filter.parameter_values).unwrap(),
        json!({
            "operator1": "LESS_THAN",
            "question": "1000AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "timeModifier": "ANY"
        })
    );
    assert_eq!(emission.description, "Patients with ANY Whole blood sample");

    let emission = search
        .apply(ConceptInput::TimeModifier(TimeModifier::No))
        .unwrap()
        .unwrap();
    assert_eq!(emission.description, "Patients with NO Whole blood sample");
}

#[test]
fn date_range_is_described() {
    let mut search = search();
    let start = DateTime::parse_from_rfc3339("2026-02-01T00:00:00+03:00").unwrap();
    let end = DateTime::parse_from_rfc3339("2026-03-15T00:00:00+03:00").unwrap();

    search.apply(ConceptInput::Concept(blood_sugar())).unwrap();
    let emission = search
        .apply(ConceptInput::DateRange { start, end })
        .unwrap()
        .unwrap();

    assert_eq!(
        emission.description,
        "Patients with ANY BLOOD SUGAR since 1/2/2026 until 15/3/2026"
    );
}

#[test]
fn reset_restores_defaults_and_stops_emission() {
    let mut search = search();
    search.apply(ConceptInput::Concept(blood_sugar())).unwrap();
    search.apply(ConceptInput::LastDays(3)).unwrap();
    search.apply(ConceptInput::LastMonths(2)).unwrap();
    search
        .apply(ConceptInput::OperatorValue(Decimal::from(7)))
        .unwrap();
    search
        .apply(ConceptInput::Operator(Operator::Equal))
        .unwrap();
    search
        .apply(ConceptInput::TimeModifier(TimeModifier::Max))
        .unwrap();
    search.apply(ConceptInput::Modifier("x".into())).unwrap();

    search.on_reset_signal(false);
    assert!(search.concept().is_some());

    search.on_reset_signal(true);
    assert!(search.concept().is_none());
    assert_eq!(search.last_days(), 0);
    assert_eq!(search.last_months(), 0);
    assert_eq!(search.operator_value(), Decimal::ZERO);
    assert_eq!(search.operator(), Operator::LessThan);
    assert_eq!(search.time_modifier(), TimeModifier::Any);
    assert_eq!(search.on_or_after(), None);
    assert_eq!(search.on_or_before(), None);
    assert_eq!(search.modifier(), "");

    assert_eq!(search.apply(ConceptInput::LastDays(10)).unwrap(), None);
    assert_eq!(search.emit().unwrap(), None);

    assert!(search
        .apply(ConceptInput::Concept(blood_sugar()))
        .unwrap()
        .is_some());
}

#[test]
fn unsupported_datatype_is_rejected() {
    let mut search = search();
    let result = search.apply(ConceptInput::Concept(concept("e-1", "ED", "SCAN")));

    assert!(matches!(
        result,
        Err(Error::Query(cohort_query::Error::UnsupportedDatatype(_)))
    ));
    assert!(search.concept().is_none());
}

#[test]
fn repeated_emissions_are_identical() {
    let mut search = search();
    search.apply(ConceptInput::Concept(blood_sugar())).unwrap();
    search.apply(ConceptInput::LastMonths(1)).unwrap();

    let first = search.emit().unwrap();
    let second = search.emit().unwrap();
    assert_eq!(first, second);
}

#[test]
fn out_of_range_lookback_is_rejected_without_changing_state() {
    let mut search = search();
    search
        .apply(ConceptInput::Concept(concept("c-a", "NM", "WEIGHT (KG)")))
        .unwrap();
    search.apply(ConceptInput::LastDays(15)).unwrap();

    assert_eq!(
        search.apply(ConceptInput::LastDays(1_000_000_000)),
        Err(Error::InvalidNumber)
    );
    assert_eq!(search.last_days(), 15);
    assert_eq!(
        search.apply(ConceptInput::LastMonths(u32::MAX)),
        Err(Error::InvalidNumber)
    );
    assert_eq!(search.last_months(), 0);

    let emission = search
        .apply(ConceptInput::Concept(blood_sugar()))
        .unwrap()
        .expect("concept selected");
    assert_eq!(search.concept(), Some(&blood_sugar()));
    assert_eq!(
        emission.description,
        "Patients with ANY BLOOD SUGAR until 4/10/2026"
    );
}
