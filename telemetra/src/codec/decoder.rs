use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::common::Field;
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use crate::filter::{
    json_type_name, CircleFilter, FilterExpression, FilterValue, InFilter, PolygonFilter,
    RegexFilter, StartsWithFilter, ValueFilter,
};
use crate::spatial::{CoordinateOrder, GeoPoint};

use super::operators::*;

/// Reads one expression object.
///
/// An empty object is `SelectAll`. Otherwise the single key is either a
/// structural operator or a field path whose value holds the leaf operator.
pub(crate) fn decode_expression(value: &Value, order: CoordinateOrder) -> TelemetraResult<FilterExpression> {
    let object = expect_object(value, "filter")?;

    let mut entries = object.iter();
    let (key, operand) = match entries.next() {
        None => return Ok(FilterExpression::SelectAll),
        Some(entry) => entry,
    };
    if entries.next().is_some() {
        let keys: Vec<&String> = object.keys().collect();
        log::error!("Filter object has more than one key: {:?}", keys);
        return Err(parse_error(&format!(
            "A filter object must have exactly one key, found {:?}",
            keys
        )));
    }

    match key.as_str() {
        AND => Ok(FilterExpression::And(decode_operands(operand, AND, order)?)),
        OR => Ok(FilterExpression::Or(decode_operands(operand, OR, order)?)),
        NOT => Ok(FilterExpression::Not(Box::new(decode_expression(operand, order)?))),
        EXISTS => {
            let path = expect_str(operand, EXISTS)?;
            Ok(FilterExpression::HasField(decode_field(path)?))
        }
        WITH_TAG => Ok(FilterExpression::HasTag(expect_str(operand, WITH_TAG)?.to_string())),
        WITH_ANY_TAG => {
            let tags = expect_array(operand, WITH_ANY_TAG)?
                .iter()
                .map(|tag| expect_str(tag, WITH_ANY_TAG).map(str::to_string))
                .collect::<TelemetraResult<IndexSet<String>>>()?;
            Ok(FilterExpression::HasOneOfTags(tags))
        }
        LOCATION_IN_CIRCLE => decode_circle(operand),
        LOCATION_IN_POLYGON => decode_polygon(operand, order),
        path => decode_leaf(decode_field(path)?, operand),
    }
}

/// Reads the operands of `_and`/`_or`, dropping degenerate `{}` members.
fn decode_operands(
    operand: &Value,
    operator: &str,
    order: CoordinateOrder,
) -> TelemetraResult<Vec<FilterExpression>> {
    let mut operands = Vec::new();
    for item in expect_array(operand, operator)? {
        let expression = decode_expression(item, order)?;
        if !expression.is_select_all() {
            operands.push(expression);
        }
    }
    Ok(operands)
}

fn decode_leaf(field: Field, operand: &Value) -> TelemetraResult<FilterExpression> {
    let operator = expect_object(operand, &field.encoded_path())?;

    if let Some(pattern) = operator.get(REGEX) {
        return decode_regex(field, operator, pattern);
    }

    let mut entries = operator.iter();
    let (name, value) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            log::error!("Field {} must have exactly one operator", field);
            return Err(parse_error(&format!(
                "Field '{}' must have exactly one operator",
                field
            )));
        }
    };

    match name.as_str() {
        EQ => Ok(FilterExpression::Eq(ValueFilter::new(field, decode_value(value, EQ)?))),
        NEQ => Ok(FilterExpression::Neq(ValueFilter::new(field, decode_value(value, NEQ)?))),
        GT => Ok(FilterExpression::Gt(ValueFilter::new(field, decode_scalar(value, GT)?))),
        GTE => Ok(FilterExpression::Gte(ValueFilter::new(field, decode_scalar(value, GTE)?))),
        LT => Ok(FilterExpression::Lt(ValueFilter::new(field, decode_scalar(value, LT)?))),
        LTE => Ok(FilterExpression::Lte(ValueFilter::new(field, decode_scalar(value, LTE)?))),
        IN => {
            let values = expect_array(value, IN)?
                .iter()
                .map(|item| decode_scalar(item, IN))
                .collect::<TelemetraResult<Vec<_>>>()?;
            let filter = InFilter::new(field, values).map_err(|e| wrap(IN, e))?;
            Ok(FilterExpression::In(filter))
        }
        STARTS_WITH => {
            let prefix = expect_str(value, STARTS_WITH)?;
            Ok(FilterExpression::StartsWith(StartsWithFilter::new(field, prefix)))
        }
        unknown => {
            log::error!("Unknown filter operator {}", unknown);
            Err(parse_error(&format!("Unknown filter operator '{}'", unknown)))
        }
    }
}

fn decode_regex(field: Field, operator: &Map<String, Value>, pattern: &Value) -> TelemetraResult<FilterExpression> {
    if let Some(extra) = operator.keys().find(|k| *k != REGEX && *k != REGEX_OPTIONS) {
        log::error!("Unexpected key {} next to {}", extra, REGEX);
        return Err(parse_error(&format!(
            "Unexpected key '{}' next to '{}'",
            extra, REGEX
        )));
    }

    let pattern = expect_str(pattern, REGEX)?;
    let case_insensitive = match operator.get(REGEX_OPTIONS) {
        None => false,
        Some(options) => match expect_str(options, REGEX_OPTIONS)? {
            "" => false,
            CASE_INSENSITIVE_OPTION => true,
            other => {
                log::error!("Unsupported regex options {}", other);
                return Err(parse_error(&format!(
                    "Unsupported regex options '{}', only '{}' is recognized",
                    other, CASE_INSENSITIVE_OPTION
                )));
            }
        },
    };

    let filter = RegexFilter::with_options(field, pattern, case_insensitive)?;
    Ok(FilterExpression::RegexMatches(filter))
}

fn decode_circle(operand: &Value) -> TelemetraResult<FilterExpression> {
    let object = expect_object(operand, LOCATION_IN_CIRCLE)?;
    let center = object.get(CENTER).ok_or_else(|| missing(LOCATION_IN_CIRCLE, CENTER))?;
    let radius = object.get(RADIUS).ok_or_else(|| missing(LOCATION_IN_CIRCLE, RADIUS))?;

    let center = expect_object(center, CENTER)?;
    let lat = center.get(LAT).ok_or_else(|| missing(CENTER, LAT))?;
    let lng = center.get(LNG).ok_or_else(|| missing(CENTER, LNG))?;
    let center = GeoPoint::new(expect_f64(lat, LAT)?, expect_f64(lng, LNG)?)
        .map_err(|e| wrap(LOCATION_IN_CIRCLE, e))?;

    let filter = CircleFilter::new(center, expect_f64(radius, RADIUS)?)
        .map_err(|e| wrap(LOCATION_IN_CIRCLE, e))?;
    Ok(FilterExpression::LocationInCircle(filter))
}

fn decode_polygon(operand: &Value, order: CoordinateOrder) -> TelemetraResult<FilterExpression> {
    let mut vertices = Vec::new();
    for pair in expect_array(operand, LOCATION_IN_POLYGON)? {
        let pair = expect_array(pair, LOCATION_IN_POLYGON)?;
        if pair.len() != 2 {
            log::error!("Polygon vertex with {} coordinates", pair.len());
            return Err(parse_error(&format!(
                "A '{}' vertex must have exactly 2 coordinates, got {}",
                LOCATION_IN_POLYGON,
                pair.len()
            )));
        }
        let raw = [
            expect_f64(&pair[0], LOCATION_IN_POLYGON)?,
            expect_f64(&pair[1], LOCATION_IN_POLYGON)?,
        ];
        vertices.push(order.to_point(raw).map_err(|e| wrap(LOCATION_IN_POLYGON, e))?);
    }

    let filter = PolygonFilter::new(vertices).map_err(|e| wrap(LOCATION_IN_POLYGON, e))?;
    Ok(FilterExpression::LocationInPolygon(filter))
}

fn decode_field(path: &str) -> TelemetraResult<Field> {
    Field::parse(path).map_err(|e| {
        TelemetraError::new_with_cause(
            &format!("Invalid field path '{}'", path),
            ErrorKind::ParseError,
            e,
        )
    })
}

fn decode_value(value: &Value, operator: &str) -> TelemetraResult<FilterValue> {
    FilterValue::from_json(value).map_err(|e| wrap(operator, e))
}

fn decode_scalar(value: &Value, operator: &str) -> TelemetraResult<FilterValue> {
    FilterValue::scalar_from_json(value).map_err(|e| wrap(operator, e))
}

fn expect_object<'a>(value: &'a Value, context: &str) -> TelemetraResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        log::error!("Expected an object for {}, got {}", context, json_type_name(value));
        parse_error(&format!(
            "Expected an object for '{}', got {}",
            context,
            json_type_name(value)
        ))
    })
}

fn expect_array<'a>(value: &'a Value, context: &str) -> TelemetraResult<&'a Vec<Value>> {
    value.as_array().ok_or_else(|| {
        log::error!("Expected an array for {}, got {}", context, json_type_name(value));
        parse_error(&format!(
            "Expected an array for '{}', got {}",
            context,
            json_type_name(value)
        ))
    })
}

fn expect_str<'a>(value: &'a Value, context: &str) -> TelemetraResult<&'a str> {
    value.as_str().ok_or_else(|| {
        log::error!("Expected a string for {}, got {}", context, json_type_name(value));
        parse_error(&format!(
            "Expected a string for '{}', got {}",
            context,
            json_type_name(value)
        ))
    })
}

fn expect_f64(value: &Value, context: &str) -> TelemetraResult<f64> {
    value.as_f64().ok_or_else(|| {
        log::error!("Expected a number for {}, got {}", context, json_type_name(value));
        parse_error(&format!(
            "Expected a number for '{}', got {}",
            context,
            json_type_name(value)
        ))
    })
}

fn missing(context: &str, key: &str) -> TelemetraError {
    log::error!("{} is missing {}", context, key);
    parse_error(&format!("'{}' requires '{}'", context, key))
}

#[inline]
fn parse_error(message: &str) -> TelemetraError {
    TelemetraError::new(message, ErrorKind::ParseError)
}

/// Reports a value level failure as a parse error of the enclosing operator.
fn wrap(operator: &str, cause: TelemetraError) -> TelemetraError {
    if cause.kind() == &ErrorKind::ParseError {
        return cause;
    }
    TelemetraError::new_with_cause(
        &format!("Invalid '{}' operand", operator),
        ErrorKind::ParseError,
        cause,
    )
}
