use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// Largest integer an `f64` holds exactly; beyond it numbers are written as floats.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// The semantic type of a leaf value.
///
/// Backend compilers use it to pick a comparison operator, which is why
/// every leaf value must classify as exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Number,
    String,
    Boolean,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Number => write!(f, "number"),
            ValueType::String => write!(f, "string"),
            ValueType::Boolean => write!(f, "boolean"),
        }
    }
}

/// A typed value carried by a field-value leaf.
///
/// Scalars are numbers, strings or booleans. A [`ValueList`] is a non-empty,
/// homogeneous list of scalars and classifies as its element type; it lets an
/// `Eq` leaf match an array field exactly.
///
/// # Examples
///
/// ```rust
/// use telemetra::filter::{FilterValue, ValueType};
///
/// assert_eq!(FilterValue::from(10).value_type(), ValueType::Number);
/// assert_eq!(FilterValue::from("d1").value_type(), ValueType::String);
///
/// let list = FilterValue::from_json(&serde_json::json!([1, 2, 3])).unwrap();
/// assert_eq!(list.value_type(), ValueType::Number);
///
/// assert!(FilterValue::from_json(&serde_json::Value::Null).is_err());
/// ```
#[derive(Debug, Clone)]
pub enum FilterValue {
    Number(f64),
    String(String),
    Bool(bool),
    List(ValueList),
}

impl FilterValue {
    /// Classifies a JSON value.
    ///
    /// # Errors
    ///
    /// `null`, objects, nested or mixed arrays and empty arrays fail with
    /// [`ErrorKind::TypeError`].
    pub fn from_json(value: &Value) -> TelemetraResult<FilterValue> {
        match value {
            Value::Array(items) => {
                let items = items
                    .iter()
                    .map(FilterValue::scalar_from_json)
                    .collect::<TelemetraResult<Vec<_>>>()?;
                Ok(FilterValue::List(ValueList::new(items)?))
            }
            other => FilterValue::scalar_from_json(other),
        }
    }

    /// Classifies a JSON value that must be a scalar.
    pub fn scalar_from_json(value: &Value) -> TelemetraResult<FilterValue> {
        match value {
            Value::Number(n) => n.as_f64().map(FilterValue::Number).ok_or_else(|| {
                log::error!("Number {} cannot be represented", n);
                TelemetraError::new(
                    &format!("Unsupported value type: number {} out of range", n),
                    ErrorKind::TypeError,
                )
            }),
            Value::String(s) => Ok(FilterValue::String(s.clone())),
            Value::Bool(b) => Ok(FilterValue::Bool(*b)),
            other => {
                log::error!("Unsupported value type {}", json_type_name(other));
                Err(TelemetraError::new(
                    &format!("Unsupported value type: {}", json_type_name(other)),
                    ErrorKind::TypeError,
                ))
            }
        }
    }

    /// Creates a number value from a float.
    ///
    /// # Errors
    ///
    /// NaN and infinities have no wire form and fail with
    /// [`ErrorKind::TypeError`].
    pub fn number(value: f64) -> TelemetraResult<FilterValue> {
        if !value.is_finite() {
            log::error!("Unsupported number {}", value);
            return Err(TelemetraError::new(
                &format!("Unsupported value type: non-finite number {}", value),
                ErrorKind::TypeError,
            ));
        }
        Ok(FilterValue::Number(value))
    }

    /// Converts this value to its JSON form.
    ///
    /// Integral numbers are written without a fractional part so that
    /// `10` survives a round trip as `10`, not `10.0`.
    pub fn to_json(&self) -> Value {
        match self {
            FilterValue::Number(n) => number_to_json(*n),
            FilterValue::String(s) => Value::String(s.clone()),
            FilterValue::Bool(b) => Value::Bool(*b),
            FilterValue::List(list) => Value::Array(list.items.iter().map(FilterValue::to_json).collect()),
        }
    }

    /// The semantic type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            FilterValue::Number(_) => ValueType::Number,
            FilterValue::String(_) => ValueType::String,
            FilterValue::Bool(_) => ValueType::Boolean,
            FilterValue::List(list) => list.element_type,
        }
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, FilterValue::List(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

pub(crate) fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// Name of a JSON value's type, used in error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FilterValue::Number(a), FilterValue::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (FilterValue::String(a), FilterValue::String(b)) => a == b,
            (FilterValue::Bool(a), FilterValue::Bool(b)) => a == b,
            (FilterValue::List(a), FilterValue::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FilterValue {}

impl Hash for FilterValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            // +0.0 == -0.0, so both must hash alike
            FilterValue::Number(n) => (n + 0.0).to_bits().hash(state),
            FilterValue::String(s) => s.hash(state),
            FilterValue::Bool(b) => b.hash(state),
            FilterValue::List(list) => list.hash(state),
        }
    }
}

impl Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for FilterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        FilterValue::from_json(&value).map_err(D::Error::custom)
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FilterValue {
                fn from(value: $t) -> Self {
                    FilterValue::Number(value as f64)
                }
            }
        )*
    };
}

impl_from_number!(i64, i32, i16, i8, u64, u32, u16, u8, usize);

impl TryFrom<f64> for FilterValue {
    type Error = TelemetraError;

    fn try_from(value: f64) -> TelemetraResult<Self> {
        FilterValue::number(value)
    }
}

impl TryFrom<f32> for FilterValue {
    type Error = TelemetraError;

    fn try_from(value: f32) -> TelemetraResult<Self> {
        FilterValue::number(value as f64)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<ValueList> for FilterValue {
    fn from(value: ValueList) -> Self {
        FilterValue::List(value)
    }
}

/// A non-empty list of scalars sharing one [`ValueType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueList {
    element_type: ValueType,
    items: Vec<FilterValue>,
}

impl ValueList {
    /// Creates a list, checking that it is non-empty, flat and homogeneous.
    pub fn new(items: Vec<FilterValue>) -> TelemetraResult<ValueList> {
        let element_type = homogeneous_type(items.iter())?;
        Ok(ValueList { element_type, items })
    }

    pub fn items(&self) -> &[FilterValue] {
        &self.items
    }

    pub fn element_type(&self) -> ValueType {
        self.element_type
    }
}

/// Infers the common type of a non-empty sequence of scalar values.
pub(crate) fn homogeneous_type<'a>(
    values: impl Iterator<Item = &'a FilterValue>,
) -> TelemetraResult<ValueType> {
    let mut inferred: Option<ValueType> = None;
    for value in values {
        if !value.is_scalar() {
            log::error!("Nested list value {} is not supported", value);
            return Err(TelemetraError::new(
                "Unsupported value type: nested list",
                ErrorKind::TypeError,
            ));
        }
        let value_type = value.value_type();
        match inferred {
            None => inferred = Some(value_type),
            Some(t) if t == value_type => {}
            Some(t) => {
                log::error!("Mixed value types {} and {}", t, value_type);
                return Err(TelemetraError::new(
                    &format!("Unsupported value type: mixed {} and {} values", t, value_type),
                    ErrorKind::TypeError,
                ));
            }
        }
    }

    inferred.ok_or_else(|| {
        log::error!("Cannot infer the value type of an empty list");
        TelemetraError::new(
            "Unsupported value type: empty list",
            ErrorKind::TypeError,
        )
    })
}
