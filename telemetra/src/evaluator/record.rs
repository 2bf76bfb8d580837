use std::borrow::Cow;
use std::collections::BTreeSet;

use serde_json::Value;

use crate::common::{Field, PathSegment};
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use crate::filter::json_type_name;
use crate::spatial::GeoPoint;

/// A record the evaluator can test a filter against.
///
/// An adapter resolves [`Field`] paths to JSON values and, when its records
/// carry them, exposes a tag set and a location. A missing value is
/// `Ok(None)`; an error is reserved for paths whose shape is invalid for the
/// record.
///
/// Adapters that have no notion of tags or location keep the default
/// `tags`/`location` implementations, which fail with
/// [`ErrorKind::UnsupportedOperation`] so a tag or geo filter is never
/// silently false.
pub trait Record {
    /// Resolves `field` against this record.
    fn field_value(&self, field: &Field) -> TelemetraResult<Option<Cow<'_, Value>>>;

    /// Returns the record's tag set, if it has one.
    fn tags(&self) -> TelemetraResult<Option<&BTreeSet<String>>> {
        Err(unsupported(self.record_kind(), "tags"))
    }

    /// Returns the record's location, if it has one.
    fn location(&self) -> TelemetraResult<Option<GeoPoint>> {
        Err(unsupported(self.record_kind(), "a location"))
    }

    /// A short name for the adapter, used in error messages.
    fn record_kind(&self) -> &'static str;
}

/// Generic adapter over an arbitrary JSON tree.
impl Record for Value {
    fn field_value(&self, field: &Field) -> TelemetraResult<Option<Cow<'_, Value>>> {
        Ok(resolve_path(self, field)?.map(Cow::Borrowed))
    }

    fn record_kind(&self) -> &'static str {
        "json"
    }
}

/// Walks `field` from `root` segment by segment.
///
/// A missing key, an out of range index or a `null` on the way resolves to
/// `None`. Indexing into a scalar, a key on an array or a position on an
/// object is a [`ErrorKind::FieldPathError`].
pub(crate) fn resolve_path<'a>(root: &'a Value, field: &Field) -> TelemetraResult<Option<&'a Value>> {
    let mut current = root;
    for (depth, segment) in field.segments().iter().enumerate() {
        let next = match (segment, current) {
            (_, Value::Null) => None,
            (PathSegment::Name(name), Value::Object(map)) => map.get(name),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            (segment, value) => {
                log::error!(
                    "Cannot resolve segment {} of {} against a {}",
                    segment,
                    field,
                    json_type_name(value)
                );
                return Err(TelemetraError::new(
                    &format!(
                        "Cannot resolve segment '{}' (position {}) of '{}' against a {}",
                        segment,
                        depth + 1,
                        field,
                        json_type_name(value)
                    ),
                    ErrorKind::FieldPathError,
                ));
            }
        };

        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

fn unsupported(kind: &str, what: &str) -> TelemetraError {
    log::error!("Records of kind {} do not carry {}", kind, what);
    TelemetraError::new(
        &format!("Records of kind '{}' do not carry {}", kind, what),
        ErrorKind::UnsupportedOperation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> Field {
        Field::parse(p).unwrap()
    }

    #[test]
    fn test_resolve_nested_map() {
        let record = json!({"a": {"b": {"c": 3}}});
        assert_eq!(resolve_path(&record, &path("a->b->c")).unwrap(), Some(&json!(3)));
        assert_eq!(resolve_path(&record, &path("a->b")).unwrap(), Some(&json!({"c": 3})));
    }

    #[test]
    fn test_resolve_array_index_is_one_based() {
        let record = json!({"readings": [10, 20, 30]});
        assert_eq!(resolve_path(&record, &path("readings->[1]")).unwrap(), Some(&json!(10)));
        assert_eq!(resolve_path(&record, &path("readings->[3]")).unwrap(), Some(&json!(30)));
        assert_eq!(resolve_path(&record, &path("readings->[4]")).unwrap(), None);
    }

    #[test]
    fn test_missing_intermediate_is_none() {
        let record = json!({"a": null, "b": {}});
        assert_eq!(resolve_path(&record, &path("a->x->y")).unwrap(), None);
        assert_eq!(resolve_path(&record, &path("b->x->y")).unwrap(), None);
        assert_eq!(resolve_path(&record, &path("zzz")).unwrap(), None);
    }

    #[test]
    fn test_invalid_shapes_are_errors() {
        let record = json!({"a": 5, "list": [1], "obj": {"k": 1}});
        for p in ["a->b", "list->k", "obj->[1]", "a->[1]"] {
            let err = resolve_path(&record, &path(p)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::FieldPathError, "path {}", p);
        }
    }

    #[test]
    fn test_generic_record_has_no_tags_or_location() {
        let record = json!({"a": 1});
        assert_eq!(record.tags().unwrap_err().kind(), &ErrorKind::UnsupportedOperation);
        assert_eq!(record.location().unwrap_err().kind(), &ErrorKind::UnsupportedOperation);
        assert_eq!(record.record_kind(), "json");
    }
}
