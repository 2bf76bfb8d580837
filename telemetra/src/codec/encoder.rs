use serde_json::{Map, Value};

use crate::filter::{number_to_json, FieldValueFilter, FilterExpression, ValueFilter};
use crate::spatial::{CoordinateOrder, GeoPoint};

use super::operators::*;

/// Writes an expression in the wire shape, keeping operand order.
pub(crate) fn encode_expression(filter: &FilterExpression, order: CoordinateOrder) -> Value {
    match filter {
        FilterExpression::SelectAll => Value::Object(Map::new()),
        FilterExpression::And(operands) => single(AND, encode_operands(operands, order)),
        FilterExpression::Or(operands) => single(OR, encode_operands(operands, order)),
        FilterExpression::Not(operand) => single(NOT, encode_expression(operand, order)),
        FilterExpression::Eq(f) => leaf(f, EQ),
        FilterExpression::Neq(f) => leaf(f, NEQ),
        FilterExpression::Gt(f) => leaf(f, GT),
        FilterExpression::Gte(f) => leaf(f, GTE),
        FilterExpression::Lt(f) => leaf(f, LT),
        FilterExpression::Lte(f) => leaf(f, LTE),
        FilterExpression::In(f) => {
            let values = f.values().iter().map(|v| v.to_json()).collect();
            single(
                &f.field().encoded_path(),
                single(IN, Value::Array(values)),
            )
        }
        FilterExpression::RegexMatches(f) => {
            let mut operator = Map::new();
            operator.insert(REGEX.to_string(), Value::String(f.pattern().to_string()));
            if f.is_case_insensitive() {
                operator.insert(
                    REGEX_OPTIONS.to_string(),
                    Value::String(CASE_INSENSITIVE_OPTION.to_string()),
                );
            }
            single(
                &f.field().encoded_path(),
                Value::Object(operator),
            )
        }
        FilterExpression::StartsWith(f) => single(
            &f.field().encoded_path(),
            single(STARTS_WITH, Value::String(f.prefix().to_string())),
        ),
        FilterExpression::HasField(field) => single(EXISTS, Value::String(field.encoded_path())),
        FilterExpression::HasTag(tag) => single(WITH_TAG, Value::String(tag.clone())),
        FilterExpression::HasOneOfTags(tags) => single(
            WITH_ANY_TAG,
            Value::Array(tags.iter().cloned().map(Value::String).collect()),
        ),
        FilterExpression::LocationInCircle(circle) => {
            let mut operand = Map::new();
            operand.insert(CENTER.to_string(), encode_center(circle.center()));
            operand.insert(RADIUS.to_string(), number_to_json(circle.radius_meters()));
            single(LOCATION_IN_CIRCLE, Value::Object(operand))
        }
        FilterExpression::LocationInPolygon(polygon) => {
            let vertices = polygon
                .vertices()
                .iter()
                .map(|vertex| {
                    let [a, b] = order.to_pair(vertex);
                    Value::Array(vec![number_to_json(a), number_to_json(b)])
                })
                .collect();
            single(LOCATION_IN_POLYGON, Value::Array(vertices))
        }
    }
}

fn encode_operands(operands: &[FilterExpression], order: CoordinateOrder) -> Value {
    Value::Array(
        operands
            .iter()
            .map(|operand| encode_expression(operand, order))
            .collect(),
    )
}

fn encode_center(center: &GeoPoint) -> Value {
    let mut point = Map::new();
    point.insert(LAT.to_string(), number_to_json(center.latitude()));
    point.insert(LNG.to_string(), number_to_json(center.longitude()));
    Value::Object(point)
}

fn leaf(filter: &ValueFilter, operator: &str) -> Value {
    single(
        &filter.field().encoded_path(),
        single(operator, filter.value().to_json()),
    )
}

#[inline]
fn single(key: &str, value: Value) -> Value {
    let mut object = Map::with_capacity(1);
    object.insert(key.to_string(), value);
    Value::Object(object)
}
