//! Property-based tests for segment schemas.
//!
//! - Property 1: composing then parsing returns the original values
//! - Property 2: the composed identifier is the hyphen-joined value list
//! - Property 3: a value list of the wrong arity never composes

use proptest::prelude::*;

use super::segments::{SegmentDefinition, SegmentSchema};

/// Strategy for one value at `position` (1-based): the position digit
/// followed by `length - 1` random digits. The distinct leading digit keeps
/// values unique across positions, so the reuse check never trips.
fn segment_value(position: usize, length: usize) -> impl Strategy<Value = String> {
    let prefix = char::from_digit(u32::try_from(position).unwrap(), 10).unwrap();
    prop::collection::vec(0u32..10, length - 1).prop_map(move |digits| {
        let mut value = String::with_capacity(length);
        value.push(prefix);
        for digit in digits {
            value.push(char::from_digit(digit, 10).unwrap());
        }
        value
    })
}

/// Strategy for a schema shape (segment lengths) plus one valid value per
/// position.
fn schema_case() -> impl Strategy<Value = (Vec<usize>, Vec<String>)> {
    prop::collection::vec(1usize..=4, 1..=4).prop_flat_map(|lengths| {
        let values: Vec<_> = lengths
            .iter()
            .enumerate()
            .map(|(index, &length)| segment_value(index + 1, length).boxed())
            .collect();
        (Just(lengths), values)
    })
}

fn build_schema(lengths: &[usize], values: &[String]) -> SegmentSchema {
    let definitions = lengths
        .iter()
        .enumerate()
        .map(|(index, &length)| SegmentDefinition {
            position: index + 1,
            length,
            name: format!("segment {}", index + 1),
        })
        .collect();
    let mut schema = SegmentSchema::new(definitions).unwrap();
    for (index, value) in values.iter().enumerate() {
        schema.add_value(index + 1, value).unwrap();
    }
    schema
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property 1: compose then parse round-trips to the original values.
    #[test]
    fn prop_compose_parse_round_trip((lengths, values) in schema_case()) {
        let schema = build_schema(&lengths, &values);
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let code = schema.compose(&refs).unwrap();
        prop_assert_eq!(schema.parse(&code).unwrap(), values);
    }

    // Property 2: the identifier is exactly the hyphen-joined value list.
    #[test]
    fn prop_composed_code_is_hyphen_joined((lengths, values) in schema_case()) {
        let schema = build_schema(&lengths, &values);
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let code = schema.compose(&refs).unwrap();
        prop_assert_eq!(code.as_str(), values.join("-"));
    }

    // Property 3: dropping a value leaves a list that never composes.
    #[test]
    fn prop_wrong_arity_rejected((lengths, values) in schema_case()) {
        let schema = build_schema(&lengths, &values);
        let mut refs: Vec<&str> = values.iter().map(String::as_str).collect();
        refs.pop();
        prop_assert!(schema.compose(&refs).is_err());
    }
}
