use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::Value;

use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use crate::filter::{json_type_name, FilterValue};

/// `Eq` semantics: structural equality, or membership when the record
/// value is an array and the filter value a scalar.
pub(crate) fn eq_matches(actual: &Value, expected: &FilterValue) -> bool {
    match (actual, expected) {
        (Value::Array(items), expected) if expected.is_scalar() => {
            items.iter().any(|item| structurally_equal(item, expected))
        }
        _ => structurally_equal(actual, expected),
    }
}

/// Structural equality of a record value and a filter value.
///
/// Numbers compare as `f64`; a list matches an array of equal length with
/// equal elements in order. Values of different types are never equal.
pub(crate) fn structurally_equal(actual: &Value, expected: &FilterValue) -> bool {
    match (actual, expected) {
        (Value::Number(n), FilterValue::Number(x)) => n.as_f64() == Some(*x),
        (Value::String(s), FilterValue::String(x)) => s == x,
        (Value::Bool(b), FilterValue::Bool(x)) => b == x,
        (Value::Array(items), FilterValue::List(list)) => {
            items.len() == list.items().len()
                && items
                    .iter()
                    .zip(list.items())
                    .all(|(item, x)| structurally_equal(item, x))
        }
        _ => false,
    }
}

/// Orders a record value against a filter value.
///
/// Numbers compare as doubles, booleans by `false < true` and strings
/// lexicographically. Any other pairing is a [`ErrorKind::TypeError`].
pub(crate) fn compare_to_filter_value(actual: &Value, expected: &FilterValue) -> TelemetraResult<Ordering> {
    match (actual, expected) {
        (Value::Number(n), FilterValue::Number(x)) => Ok(as_f64(n)?.total_cmp(x)),
        (Value::Bool(b), FilterValue::Bool(x)) => Ok(b.cmp(x)),
        (Value::String(s), FilterValue::String(x)) => Ok(s.as_str().cmp(x.as_str())),
        (actual, expected) => Err(incomparable(json_type_name(actual), &filter_type_name(expected))),
    }
}

/// Orders two record values under the same rules. `null`, arrays and
/// objects have no order.
pub(crate) fn compare_json(a: &Value, b: &Value) -> TelemetraResult<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Ok(as_f64(x)?.total_cmp(&as_f64(y)?)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        (x, y) => Err(incomparable(json_type_name(x), json_type_name(y))),
    }
}

/// The string form used by `RegexMatches` and `StartsWith`.
///
/// Strings are used as is, numbers and booleans in their JSON spelling and
/// compound values as compact JSON. `null` has no string form.
pub(crate) fn string_form(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s)),
        other => Some(Cow::Owned(other.to_string())),
    }
}

fn as_f64(n: &serde_json::Number) -> TelemetraResult<f64> {
    n.as_f64().ok_or_else(|| {
        log::error!("Number {} cannot be compared as a double", n);
        TelemetraError::new(
            &format!("Number {} cannot be compared as a double", n),
            ErrorKind::TypeError,
        )
    })
}

fn incomparable(left: &str, right: &str) -> TelemetraError {
    log::error!("Cannot compare values of type {} and {}", left, right);
    TelemetraError::new(
        &format!("Cannot compare values of type {} and {}", left, right),
        ErrorKind::TypeError,
    )
}

fn filter_type_name(value: &FilterValue) -> String {
    match value {
        FilterValue::List(list) => format!("list of {}", list.element_type()),
        scalar => scalar.value_type().to_string(),
    }
}
