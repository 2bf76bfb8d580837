//! JSON wire codec for [`FilterExpression`].
//!
//! The wire shape is a persisted contract: filters are stored in access
//! grants, export and stream definitions and subscriptions, so operator names
//! and nesting never change.
//!
//! | Expression | Wire form |
//! |---|---|
//! | `SelectAll` | `{}` |
//! | `And` / `Or` | `{"_and": [..]}` / `{"_or": [..]}` |
//! | `Not` | `{"_not": {..}}` |
//! | `Eq`, `Neq`, `Gt`, `Gte`, `Lt`, `Lte` | `{"a->b": {"_eq": 1}}` |
//! | `In` | `{"a": {"_in": [1, 2]}}` |
//! | `StartsWith` | `{"a": {"_startsWith": "pre"}}` |
//! | `RegexMatches` | `{"a": {"_regex": "x.*", "_options": "i"}}` |
//! | `HasField` | `{"_exists": "a->b"}` |
//! | `HasTag` / `HasOneOfTags` | `{"_withTag": "t"}` / `{"_withAnyTag": ["t", ..]}` |
//! | `LocationInCircle` | `{"_locationInCircle": {"center": {"lat": .., "lng": ..}, "radius": ..}}` |
//! | `LocationInPolygon` | `{"_locationInPolygon": [[x, y], ..]}` |
//!
//! # Examples
//!
//! ```rust
//! use telemetra::codec;
//! use telemetra::filter::field;
//!
//! # fn main() -> telemetra::errors::TelemetraResult<()> {
//! let filter = field("dataset")?.eq("d1").and(field("value")?.gt(10));
//! let wire = codec::encode_to_string(&filter)?;
//! assert_eq!(wire, r#"{"_and":[{"dataset":{"_eq":"d1"}},{"value":{"_gt":10}}]}"#);
//! assert_eq!(codec::decode_str(&wire)?, filter);
//! # Ok(())
//! # }
//! ```

mod decoder;
mod encoder;
mod operators;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::errors::TelemetraResult;
use crate::filter::FilterExpression;
use crate::spatial::CoordinateOrder;

pub use operators::*;

/// Encodes and decodes filters in the JSON wire shape.
///
/// The only setting is the [`CoordinateOrder`] of raw `_locationInPolygon`
/// pairs; the default is `XY` (`[lng, lat]`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterCodec {
    coordinate_order: CoordinateOrder,
}

impl FilterCodec {
    pub fn new() -> Self {
        FilterCodec::default()
    }

    /// Creates a codec that reads and writes polygon pairs in `order`.
    pub fn with_coordinate_order(order: CoordinateOrder) -> Self {
        FilterCodec {
            coordinate_order: order,
        }
    }

    pub fn coordinate_order(&self) -> CoordinateOrder {
        self.coordinate_order
    }

    /// Writes `filter` as a JSON value.
    pub fn encode(&self, filter: &FilterExpression) -> Value {
        encoder::encode_expression(filter, self.coordinate_order)
    }

    /// Reads a filter from a JSON value.
    ///
    /// # Errors
    ///
    /// Every failure, including values that cannot be classified, is
    /// reported with [`crate::errors::ErrorKind::ParseError`].
    pub fn decode(&self, value: &Value) -> TelemetraResult<FilterExpression> {
        decoder::decode_expression(value, self.coordinate_order)
    }

    /// Writes `filter` as compact JSON text.
    pub fn encode_to_string(&self, filter: &FilterExpression) -> TelemetraResult<String> {
        Ok(serde_json::to_string(&self.encode(filter))?)
    }

    /// Reads a filter from JSON text.
    pub fn decode_str(&self, json: &str) -> TelemetraResult<FilterExpression> {
        let value: Value = serde_json::from_str(json)?;
        self.decode(&value)
    }
}

/// Encodes with the default codec.
pub fn encode(filter: &FilterExpression) -> Value {
    FilterCodec::default().encode(filter)
}

/// Decodes with the default codec.
pub fn decode(value: &Value) -> TelemetraResult<FilterExpression> {
    FilterCodec::default().decode(value)
}

/// Encodes to JSON text with the default codec.
pub fn encode_to_string(filter: &FilterExpression) -> TelemetraResult<String> {
    FilterCodec::default().encode_to_string(filter)
}

/// Decodes JSON text with the default codec.
pub fn decode_str(json: &str) -> TelemetraResult<FilterExpression> {
    FilterCodec::default().decode_str(json)
}

impl Serialize for FilterExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        encode(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        decode(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Field;
    use crate::errors::ErrorKind;
    use crate::filter::*;
    use crate::spatial::GeoPoint;
    use serde_json::json;

    fn round_trip(filter: &FilterExpression) {
        let wire = encode(filter);
        let decoded = decode(&wire).unwrap();
        assert_eq!(&decoded, filter, "round trip of {}", wire);
    }

    #[test]
    fn test_select_all() {
        assert_eq!(decode(&json!({})).unwrap(), FilterExpression::SelectAll);
        assert_eq!(encode(&FilterExpression::SelectAll), json!({}));
    }

    #[test]
    fn test_concrete_scenario_wire_shape() {
        let filter = FilterExpression::And(vec![
            field("dataset").unwrap().eq("d1"),
            field("value").unwrap().gt(10),
        ]);
        assert_eq!(
            encode_to_string(&filter).unwrap(),
            r#"{"_and":[{"dataset":{"_eq":"d1"}},{"value":{"_gt":10}}]}"#
        );
    }

    #[test]
    fn test_not_is_single_object() {
        let filter = has_tag("x").not();
        assert_eq!(encode(&filter), json!({"_not": {"_withTag": "x"}}));
        round_trip(&filter);
    }

    #[test]
    fn test_leaf_operators_round_trip() {
        let filters = vec![
            field("a").unwrap().eq(1),
            field("a").unwrap().eq(true),
            field("a").unwrap().ne("x"),
            field("a->b").unwrap().gt(FilterValue::number(1.5).unwrap()),
            field("a").unwrap().gte(-2),
            field("a").unwrap().lt("m"),
            field("a->[2]").unwrap().lte(100),
            field("a").unwrap().in_values([1, 2, 3]).unwrap(),
            field("a").unwrap().starts_with("sensor-"),
            field("a").unwrap().regex("x.*").unwrap(),
            field("a").unwrap().regex_ignore_case("X.*").unwrap(),
            field("a->b").unwrap().exists(),
            has_tag("t"),
            has_any_tag(["t1", "t2"]),
        ];
        for filter in &filters {
            round_trip(filter);
        }
    }

    #[test]
    fn test_float_values_round_trip() {
        for x in [0.1, -273.15, 1e-300, f64::MAX, f64::MIN_POSITIVE] {
            round_trip(&field("v").unwrap().eq(FilterValue::number(x).unwrap()));
        }
        // no leaf can carry a number without a wire form
        for x in [f64::NAN, f64::INFINITY] {
            assert_eq!(FilterValue::number(x).unwrap_err().kind(), &ErrorKind::TypeError);
        }
    }

    #[test]
    fn test_list_equality_value_round_trip() {
        let value = FilterValue::from_json(&json!([1, 2, 3])).unwrap();
        let filter = field("readings").unwrap().eq(value);
        assert_eq!(encode(&filter), json!({"readings": {"_eq": [1, 2, 3]}}));
        round_trip(&filter);
    }

    #[test]
    fn test_regex_options() {
        let filter = field("name").unwrap().regex_ignore_case("abc").unwrap();
        assert_eq!(
            encode_to_string(&filter).unwrap(),
            r#"{"name":{"_regex":"abc","_options":"i"}}"#
        );
        let plain = decode(&json!({"name": {"_regex": "abc"}})).unwrap();
        match plain {
            FilterExpression::RegexMatches(r) => assert!(!r.is_case_insensitive()),
            other => panic!("expected regex, got {}", other),
        }
        let err = decode(&json!({"name": {"_regex": "abc", "_options": "m"}})).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ParseError);
    }

    #[test]
    fn test_geo_round_trip() {
        let circle = location_in_circle(GeoPoint::new(45.5, -93.25).unwrap(), 250.0).unwrap();
        assert_eq!(
            encode(&circle),
            json!({"_locationInCircle": {"center": {"lat": 45.5, "lng": -93.25}, "radius": 250}})
        );
        round_trip(&circle);

        let polygon = location_in_polygon(vec![
            GeoPoint::new(0.0, 0.0).unwrap(),
            GeoPoint::new(0.0, 10.0).unwrap(),
            GeoPoint::new(10.0, 10.0).unwrap(),
        ])
        .unwrap();
        assert_eq!(
            encode(&polygon),
            json!({"_locationInPolygon": [[0, 0], [10, 0], [10, 10]]})
        );
        round_trip(&polygon);
    }

    #[test]
    fn test_polygon_coordinate_order() {
        let wire = json!({"_locationInPolygon": [[10, 20], [11, 20], [11, 21]]});
        let xy = FilterCodec::with_coordinate_order(CoordinateOrder::XY).decode(&wire).unwrap();
        let yx = FilterCodec::with_coordinate_order(CoordinateOrder::YX).decode(&wire).unwrap();
        match (xy, yx) {
            (FilterExpression::LocationInPolygon(a), FilterExpression::LocationInPolygon(b)) => {
                assert_eq!(a.vertices()[0].longitude(), 10.0);
                assert_eq!(b.vertices()[0].latitude(), 10.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_nested_logical_round_trip() {
        let filter = or(vec![
            and(vec![field("a").unwrap().eq(1), field("b").unwrap().lt(2)]),
            not(field("c").unwrap().exists()),
            and(vec![]),
            or(vec![]),
        ]);
        round_trip(&filter);
    }

    #[test]
    fn test_select_all_operands_are_dropped() {
        let decoded = decode(&json!({"_and": [{}, {"a": {"_eq": 1}}, {}]})).unwrap();
        assert_eq!(decoded, FilterExpression::And(vec![field("a").unwrap().eq(1)]));
    }

    #[test]
    fn test_unknown_operator_is_named() {
        let err = decode(&json!({"a": {"_near": 1}})).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ParseError);
        assert!(err.message().contains("_near"));
    }

    #[test]
    fn test_malformed_shapes() {
        let cases = vec![
            json!([]),
            json!("x"),
            json!({"_and": {}}),
            json!({"_or": [1]}),
            json!({"a": {"_in": 1}}),
            json!({"a": {"_in": [[1]]}}),
            json!({"a": {"_startsWith": 1}}),
            json!({"a": {"_eq": null}}),
            json!({"a": {"_gt": [1, 2]}}),
            json!({"a": 1}),
            json!({"a": {}}),
            json!({"a": {"_eq": 1, "_neq": 2}}),
            json!({"a": {"_eq": 1}, "b": {"_eq": 2}}),
            json!({"_exists": 1}),
            json!({"_withAnyTag": ["a", 1]}),
            json!({"_locationInCircle": {"center": {"lat": 0, "lng": 0}}}),
            json!({"_locationInCircle": {"radius": 10}}),
            json!({"_locationInCircle": {"center": {"lat": 100, "lng": 0}, "radius": 10}}),
            json!({"_locationInPolygon": [[0, 0], [1, 1]]}),
            json!({"_locationInPolygon": [[0, 0, 0], [1, 1], [2, 2]]}),
            json!({"a->[0]": {"_eq": 1}}),
            json!({"a": {"_regex": "("}}),
        ];
        for case in cases {
            let err = decode(&case).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ParseError, "case {}", case);
        }
    }

    #[test]
    fn test_unclassifiable_value_has_type_error_cause() {
        let err = decode(&json!({"a": {"_eq": {"x": 1}}})).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ParseError);
        assert_eq!(err.cause().unwrap().kind(), &ErrorKind::TypeError);
    }

    #[test]
    fn test_field_path_with_index() {
        let decoded = decode(&json!({"value->readings->[3]": {"_eq": 7}})).unwrap();
        let field = decoded.field().unwrap();
        assert_eq!(field, &Field::parse("value->readings->[3]").unwrap());
        assert_eq!(
            encode(&decoded),
            json!({"value->readings->[3]": {"_eq": 7}})
        );
    }

    #[test]
    fn test_serde_embedding() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Grant {
            name: String,
            filter: FilterExpression,
        }

        let grant: Grant =
            serde_json::from_str(r#"{"name":"g1","filter":{"_withTag":"public"}}"#).unwrap();
        assert_eq!(grant.filter, has_tag("public"));
        assert_eq!(
            serde_json::to_string(&grant).unwrap(),
            r#"{"name":"g1","filter":{"_withTag":"public"}}"#
        );

        let bad = serde_json::from_str::<Grant>(r#"{"name":"g1","filter":{"a":{"_x":1}}}"#);
        assert!(bad.is_err());
    }
}
