//! In-memory evaluation of filter expressions.
//!
//! [`Evaluator::matches`] tests one record against a [`FilterExpression`].
//! Records are reached through the [`Record`] trait: `serde_json::Value` is
//! the generic adapter over arbitrary JSON trees and [`crate::event::Event`]
//! is the typed event adapter. Both share the same per-node dispatch.
//!
//! A missing field is never an error: each operator defines its result for
//! an absent value (false for comparisons, `In`, `StartsWith` and
//! `RegexMatches`). Malformed paths, incomparable types and nodes an adapter
//! cannot evaluate are errors.
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use telemetra::evaluator::Evaluator;
//! use telemetra::filter::field;
//!
//! # fn main() -> telemetra::errors::TelemetraResult<()> {
//! let evaluator = Evaluator::new();
//! let filter = field("dataset")?.eq("d1").and(field("value")?.gt(10));
//!
//! assert!(evaluator.matches(&json!({"dataset": "d1", "value": 15}), &filter)?);
//! assert!(!evaluator.matches(&json!({"dataset": "d1", "value": 5}), &filter)?);
//! # Ok(())
//! # }
//! ```

mod compare;
mod config;
mod record;
mod regex_cache;

pub use config::*;
pub use record::Record;
pub use regex_cache::RegexCache;

pub(crate) use compare::{compare_json, structurally_equal};
pub(crate) use record::resolve_path;

use std::cmp::Ordering;
use std::sync::Arc;

use crate::filter::{FieldValueFilter, FilterExpression, RegexFilter, ValueFilter};
use crate::spatial::{within_circle, within_polygon};
use crate::errors::TelemetraResult;

use compare::{compare_to_filter_value, eq_matches, string_form};
use regex_cache::compile_full_match;

/// Evaluates filter expressions against records.
///
/// An evaluator owns its regex cache; clones share it. Create one per
/// process or per test, whichever isolation the caller needs.
#[derive(Clone)]
pub struct Evaluator {
    inner: Arc<EvaluatorInner>,
}

struct EvaluatorInner {
    config: EvaluatorConfig,
    regex_cache: RegexCache,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    /// Creates an evaluator with the default configuration.
    pub fn new() -> Self {
        Evaluator::with_config(EvaluatorConfig::default())
    }

    pub fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::new()
    }

    pub(crate) fn with_config(config: EvaluatorConfig) -> Self {
        let regex_cache = RegexCache::new(
            config.regex_cache_capacity_non_zero(),
            config.regex_cache_ttl(),
        );
        Evaluator {
            inner: Arc::new(EvaluatorInner { config, regex_cache }),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.inner.config
    }

    pub fn regex_cache(&self) -> &RegexCache {
        &self.inner.regex_cache
    }

    /// Returns whether `record` satisfies `filter`.
    ///
    /// # Errors
    ///
    /// * [`crate::errors::ErrorKind::FieldPathError`] for a path whose shape
    ///   does not fit the record
    /// * [`crate::errors::ErrorKind::TypeError`] when a comparison meets
    ///   values of different types
    /// * [`crate::errors::ErrorKind::UnsupportedOperation`] when the record
    ///   adapter cannot evaluate the node
    pub fn matches<R: Record + ?Sized>(&self, record: &R, filter: &FilterExpression) -> TelemetraResult<bool> {
        let result = match filter {
            FilterExpression::SelectAll => true,
            FilterExpression::And(operands) => {
                for operand in operands {
                    if !self.matches(record, operand)? {
                        return Ok(false);
                    }
                }
                true
            }
            FilterExpression::Or(operands) => {
                for operand in operands {
                    if self.matches(record, operand)? {
                        return Ok(true);
                    }
                }
                false
            }
            FilterExpression::Not(operand) => !self.matches(record, operand)?,
            FilterExpression::Eq(f) => match record.field_value(f.field())? {
                Some(value) => eq_matches(&value, f.value()),
                None => false,
            },
            FilterExpression::Neq(f) => match record.field_value(f.field())? {
                Some(value) => !structurally_equal(&value, f.value()),
                None => true,
            },
            FilterExpression::Gt(f) => compare(record, f, Ordering::is_gt)?,
            FilterExpression::Gte(f) => compare(record, f, Ordering::is_ge)?,
            FilterExpression::Lt(f) => compare(record, f, Ordering::is_lt)?,
            FilterExpression::Lte(f) => compare(record, f, Ordering::is_le)?,
            FilterExpression::In(f) => match record.field_value(f.field())? {
                Some(value) => f.values().iter().any(|v| structurally_equal(&value, v)),
                None => false,
            },
            FilterExpression::RegexMatches(f) => self.regex_matches(record, f)?,
            FilterExpression::StartsWith(f) => match record.field_value(f.field())? {
                Some(value) => string_form(&value).is_some_and(|s| s.starts_with(f.prefix())),
                None => false,
            },
            FilterExpression::HasField(field) => record
                .field_value(field)?
                .is_some_and(|value| !value.is_null()),
            FilterExpression::HasTag(tag) => record.tags()?.is_some_and(|tags| tags.contains(tag)),
            FilterExpression::HasOneOfTags(wanted) => record
                .tags()?
                .is_some_and(|tags| wanted.iter().any(|tag| tags.contains(tag))),
            FilterExpression::LocationInCircle(circle) => record
                .location()?
                .is_some_and(|point| within_circle(&point, circle.center(), circle.radius_meters())),
            FilterExpression::LocationInPolygon(polygon) => record
                .location()?
                .is_some_and(|point| within_polygon(&point, polygon.vertices())),
        };

        log::trace!("{} on {} record: {}", filter, record.record_kind(), result);
        Ok(result)
    }

    fn regex_matches<R: Record + ?Sized>(&self, record: &R, filter: &RegexFilter) -> TelemetraResult<bool> {
        let value = match record.field_value(filter.field())? {
            Some(value) => value,
            None => return Ok(false),
        };
        let text = match string_form(&value) {
            Some(text) => text,
            None => return Ok(false),
        };

        if filter.is_case_insensitive() {
            let regex = compile_full_match(filter.pattern(), true)?;
            Ok(regex.is_match(&text))
        } else {
            let regex = self.inner.regex_cache.get_or_compile(filter.pattern())?;
            Ok(regex.is_match(&text))
        }
    }
}

fn compare<R: Record + ?Sized>(
    record: &R,
    filter: &ValueFilter,
    accept: fn(Ordering) -> bool,
) -> TelemetraResult<bool> {
    match record.field_value(filter.field())? {
        Some(value) if !value.is_null() => Ok(accept(compare_to_filter_value(&value, filter.value())?)),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::filter::*;
    use crate::spatial::GeoPoint;
    use serde_json::{json, Value};

    // Installed once for the whole crate; a second logger would abort the
    // test binary.
    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    fn eval(record: &Value, filter: &FilterExpression) -> bool {
        Evaluator::new().matches(record, filter).unwrap()
    }

    #[test]
    fn test_select_all_and_empty_composition() {
        let record = json!({"a": 1});
        assert!(eval(&record, &all()));
        assert!(eval(&record, &and(vec![])));
        assert!(!eval(&record, &or(vec![])));
        assert!(eval(&Value::Null, &all()));
    }

    #[test]
    fn test_concrete_scenario() {
        let filter = crate::codec::decode_str(
            r#"{"_and":[{"dataset":{"_eq":"d1"}},{"value":{"_gt":10}}]}"#,
        )
        .unwrap();
        assert!(eval(&json!({"dataset": "d1", "value": 15}), &filter));
        assert!(!eval(&json!({"dataset": "d1", "value": 5}), &filter));
        assert!(!eval(&json!({"dataset": "d2", "value": 15}), &filter));
    }

    #[test]
    fn test_eq_containment_and_exact_list() {
        let record = json!({"readings": [1, 2, 3]});
        let exact = FilterValue::from_json(&json!([1, 2, 3])).unwrap();
        assert!(eval(&record, &field("readings").unwrap().eq(2)));
        assert!(eval(&record, &field("readings").unwrap().eq(exact)));
        assert!(!eval(&record, &field("readings").unwrap().eq(4)));
    }

    #[test]
    fn test_neq_has_no_containment() {
        let record = json!({"readings": [1, 2, 3], "a": 1});
        assert!(eval(&record, &field("readings").unwrap().ne(2)));
        assert!(!eval(&record, &field("a").unwrap().ne(1)));
        assert!(eval(&record, &field("a").unwrap().ne("1")));
        assert!(eval(&record, &field("missing").unwrap().ne(1)));
    }

    #[test]
    fn test_comparisons_are_inclusive_where_expected() {
        let record = json!({"v": 10});
        assert!(eval(&record, &field("v").unwrap().gte(10)));
        assert!(eval(&record, &field("v").unwrap().lte(10)));
        assert!(!eval(&record, &field("v").unwrap().gt(10)));
        assert!(!eval(&record, &field("v").unwrap().lt(10)));
        assert!(eval(&record, &field("v").unwrap().gte(FilterValue::number(9.5).unwrap())));
        assert!(!eval(&record, &field("v").unwrap().lte(FilterValue::number(9.5).unwrap())));
    }

    #[test]
    fn test_string_and_bool_ordering() {
        let record = json!({"s": "beta", "b": true});
        assert!(eval(&record, &field("s").unwrap().gt("alpha")));
        assert!(eval(&record, &field("s").unwrap().lt("gamma")));
        assert!(eval(&record, &field("b").unwrap().gt(false)));
    }

    #[test]
    fn test_missing_field_is_false_not_error() {
        let record = json!({"other": 1, "nothing": null});
        let filters = vec![
            field("v").unwrap().eq(1),
            field("v").unwrap().gt(1),
            field("v").unwrap().gte(1),
            field("v").unwrap().lt(1),
            field("v").unwrap().lte(1),
            field("v").unwrap().in_values([1, 2]).unwrap(),
            field("v").unwrap().starts_with("x"),
            field("v").unwrap().regex(".*").unwrap(),
            field("v").unwrap().regex_ignore_case(".*").unwrap(),
            field("nothing").unwrap().gt(1),
            field("nothing").unwrap().starts_with(""),
            field("nothing").unwrap().regex(".*").unwrap(),
            field("v->deep->[2]").unwrap().gt(1),
        ];
        for filter in filters {
            assert!(!eval(&record, &filter), "{}", filter);
        }
    }

    #[test]
    fn test_mismatched_comparison_is_type_error() {
        let record = json!({"v": "10"});
        let err = Evaluator::new()
            .matches(&record, &field("v").unwrap().gt(1))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TypeError);
    }

    #[test]
    fn test_invalid_path_shape_is_error() {
        let record = json!({"v": 3});
        let err = Evaluator::new()
            .matches(&record, &field("v->x").unwrap().eq(1))
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::FieldPathError);
    }

    #[test]
    fn test_in() {
        let record = json!({"dataset": "d2"});
        assert!(eval(&record, &field("dataset").unwrap().in_values(["d1", "d2"]).unwrap()));
        assert!(!eval(&record, &field("dataset").unwrap().in_values(["d3"]).unwrap()));
    }

    #[test]
    fn test_regex_full_match_and_cache() {
        let evaluator = Evaluator::new();
        let filter = field("source").unwrap().regex("sensor-[0-9]+").unwrap();

        assert!(evaluator.matches(&json!({"source": "sensor-42"}), &filter).unwrap());
        assert!(!evaluator.matches(&json!({"source": "my-sensor-42"}), &filter).unwrap());
        assert!(!evaluator.matches(&json!({"source": "SENSOR-42"}), &filter).unwrap());
        assert_eq!(evaluator.regex_cache().misses(), 1);
        assert_eq!(evaluator.regex_cache().hits(), 2);

        let ci = field("source").unwrap().regex_ignore_case("sensor-[0-9]+").unwrap();
        assert!(evaluator.matches(&json!({"source": "SENSOR-42"}), &ci).unwrap());
        assert_eq!(evaluator.regex_cache().len(), 1);
    }

    #[test]
    fn test_regex_on_number_uses_string_form() {
        let filter = field("v").unwrap().regex("4[0-9]").unwrap();
        assert!(eval(&json!({"v": 42}), &filter));
        assert!(eval(&json!({"v": 42}), &field("v").unwrap().starts_with("4")));
    }

    #[test]
    fn test_has_field() {
        let record = json!({"a": {"b": 0}, "n": null});
        assert!(eval(&record, &field("a->b").unwrap().exists()));
        assert!(!eval(&record, &field("n").unwrap().exists()));
        assert!(!eval(&record, &field("a->c").unwrap().exists()));
    }

    #[test]
    fn test_logical_short_circuit() {
        // the second operand would fail with a path error
        let record = json!({"a": 1});
        let failing = field("a->x").unwrap().eq(1);
        assert!(!eval(&record, &and(vec![field("a").unwrap().eq(2), failing.clone()])));
        assert!(eval(&record, &or(vec![field("a").unwrap().eq(1), failing])));
        assert!(eval(&record, &not(field("a").unwrap().eq(2))));
    }

    #[test]
    fn test_generic_record_rejects_tags_and_location() {
        let record = json!({"tags": ["x"]});
        let evaluator = Evaluator::new();
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        for filter in [
            has_tag("x"),
            has_any_tag(["x"]),
            location_in_circle(center, 10.0).unwrap(),
        ] {
            let err = evaluator.matches(&record, &filter).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UnsupportedOperation);
        }
    }
}
