use crate::common::Field;
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use crate::filter::value::homogeneous_type;
use crate::filter::{FilterValue, ValueType};
use crate::spatial::GeoPoint;
use indexmap::IndexSet;
use itertools::Itertools;
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// Capability shared by every leaf that pairs a [`Field`] with a typed value.
///
/// Backend compilers rely on it to map the field to a native column and to
/// choose an operator from the value's semantic type.
pub trait FieldValueFilter {
    /// The field the predicate reads.
    fn field(&self) -> &Field;

    /// The semantic type of the predicate's value.
    fn value_type(&self) -> ValueType;
}

/// A predicate over event and metric records.
///
/// `FilterExpression` is a closed, immutable, recursively composable sum type.
/// The same value is evaluated in memory by [`crate::evaluator::Evaluator`],
/// persisted through [`crate::codec::FilterCodec`] and compiled by backend
/// query compilers.
///
/// Equality and hashing are structural, except that the operands of `And`
/// and `Or` compare as a multiset: `And([a, b]) == And([b, a])`. Operand
/// order is still kept for deterministic serialization.
///
/// Empty `And` matches every record and empty `Or` matches none.
///
/// # Examples
///
/// ```rust
/// use telemetra::filter::{field, FilterExpression};
///
/// # fn main() -> telemetra::errors::TelemetraResult<()> {
/// let filter = field("dataset")?.eq("d1").and(field("value")?.gt(10));
/// assert_eq!(filter.to_string(), "(dataset == \"d1\" && value > 10)");
///
/// let swapped = field("value")?.gt(10).and(field("dataset")?.eq("d1"));
/// assert_eq!(filter, swapped);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub enum FilterExpression {
    SelectAll,
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
    Not(Box<FilterExpression>),
    Eq(ValueFilter),
    Neq(ValueFilter),
    Gt(ValueFilter),
    Gte(ValueFilter),
    Lt(ValueFilter),
    Lte(ValueFilter),
    In(InFilter),
    RegexMatches(RegexFilter),
    StartsWith(StartsWithFilter),
    HasField(Field),
    HasTag(String),
    HasOneOfTags(IndexSet<String>),
    LocationInCircle(CircleFilter),
    LocationInPolygon(PolygonFilter),
}

impl FilterExpression {
    /// Combines this filter with another using logical AND.
    ///
    /// An existing top level `And` is extended rather than nested.
    pub fn and(self, other: FilterExpression) -> FilterExpression {
        match self {
            FilterExpression::And(mut operands) => {
                operands.push(other);
                FilterExpression::And(operands)
            }
            this => FilterExpression::And(vec![this, other]),
        }
    }

    /// Combines this filter with another using logical OR.
    ///
    /// An existing top level `Or` is extended rather than nested.
    pub fn or(self, other: FilterExpression) -> FilterExpression {
        match self {
            FilterExpression::Or(mut operands) => {
                operands.push(other);
                FilterExpression::Or(operands)
            }
            this => FilterExpression::Or(vec![this, other]),
        }
    }

    /// Negates this filter.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> FilterExpression {
        FilterExpression::Not(Box::new(self))
    }

    #[inline]
    pub fn is_select_all(&self) -> bool {
        matches!(self, FilterExpression::SelectAll)
    }

    /// Name of the variant, used in error messages.
    pub fn operator_name(&self) -> &'static str {
        match self {
            FilterExpression::SelectAll => "SelectAll",
            FilterExpression::And(_) => "And",
            FilterExpression::Or(_) => "Or",
            FilterExpression::Not(_) => "Not",
            FilterExpression::Eq(_) => "Eq",
            FilterExpression::Neq(_) => "Neq",
            FilterExpression::Gt(_) => "Gt",
            FilterExpression::Gte(_) => "Gte",
            FilterExpression::Lt(_) => "Lt",
            FilterExpression::Lte(_) => "Lte",
            FilterExpression::In(_) => "In",
            FilterExpression::RegexMatches(_) => "RegexMatches",
            FilterExpression::StartsWith(_) => "StartsWith",
            FilterExpression::HasField(_) => "HasField",
            FilterExpression::HasTag(_) => "HasTag",
            FilterExpression::HasOneOfTags(_) => "HasOneOfTags",
            FilterExpression::LocationInCircle(_) => "LocationInCircle",
            FilterExpression::LocationInPolygon(_) => "LocationInPolygon",
        }
    }

    /// Returns the field-value view of this node, if it is such a leaf.
    pub fn as_field_value_filter(&self) -> Option<&dyn FieldValueFilter> {
        match self {
            FilterExpression::Eq(f)
            | FilterExpression::Neq(f)
            | FilterExpression::Gt(f)
            | FilterExpression::Gte(f)
            | FilterExpression::Lt(f)
            | FilterExpression::Lte(f) => Some(f as &dyn FieldValueFilter),
            FilterExpression::In(f) => Some(f as &dyn FieldValueFilter),
            FilterExpression::RegexMatches(f) => Some(f as &dyn FieldValueFilter),
            FilterExpression::StartsWith(f) => Some(f as &dyn FieldValueFilter),
            _ => None,
        }
    }

    /// Returns the field this node reads, for leaves that read one.
    pub fn field(&self) -> Option<&Field> {
        match self {
            FilterExpression::HasField(field) => Some(field),
            other => other.as_field_value_filter().map(|f| f.field()),
        }
    }
}

/// Multiset comparison of logical operands.
fn same_operands(a: &[FilterExpression], b: &[FilterExpression]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|operand| {
        let left = a.iter().filter(|x| *x == operand).count();
        let right = b.iter().filter(|x| *x == operand).count();
        left == right
    })
}

/// Hashes items so that their order does not change the result.
fn hash_unordered<'a, T: Hash + 'a, H: Hasher>(items: impl Iterator<Item = &'a T>, state: &mut H) {
    let mut combined: u64 = 0;
    let mut count: usize = 0;
    for item in items {
        let mut hasher = DefaultHasher::new();
        item.hash(&mut hasher);
        combined = combined.wrapping_add(hasher.finish());
        count += 1;
    }
    count.hash(state);
    combined.hash(state);
}

impl PartialEq for FilterExpression {
    fn eq(&self, other: &Self) -> bool {
        use FilterExpression::*;
        match (self, other) {
            (SelectAll, SelectAll) => true,
            (And(a), And(b)) | (Or(a), Or(b)) => same_operands(a, b),
            (Not(a), Not(b)) => a == b,
            (Eq(a), Eq(b))
            | (Neq(a), Neq(b))
            | (Gt(a), Gt(b))
            | (Gte(a), Gte(b))
            | (Lt(a), Lt(b))
            | (Lte(a), Lte(b)) => a == b,
            (In(a), In(b)) => a == b,
            (RegexMatches(a), RegexMatches(b)) => a == b,
            (StartsWith(a), StartsWith(b)) => a == b,
            (HasField(a), HasField(b)) => a == b,
            (HasTag(a), HasTag(b)) => a == b,
            (HasOneOfTags(a), HasOneOfTags(b)) => a == b,
            (LocationInCircle(a), LocationInCircle(b)) => a == b,
            (LocationInPolygon(a), LocationInPolygon(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FilterExpression {}

impl Hash for FilterExpression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            FilterExpression::SelectAll => {}
            FilterExpression::And(operands) | FilterExpression::Or(operands) => {
                hash_unordered(operands.iter(), state)
            }
            FilterExpression::Not(operand) => operand.hash(state),
            FilterExpression::Eq(f)
            | FilterExpression::Neq(f)
            | FilterExpression::Gt(f)
            | FilterExpression::Gte(f)
            | FilterExpression::Lt(f)
            | FilterExpression::Lte(f) => f.hash(state),
            FilterExpression::In(f) => f.hash(state),
            FilterExpression::RegexMatches(f) => f.hash(state),
            FilterExpression::StartsWith(f) => f.hash(state),
            FilterExpression::HasField(field) => field.hash(state),
            FilterExpression::HasTag(tag) => tag.hash(state),
            FilterExpression::HasOneOfTags(tags) => hash_unordered(tags.iter(), state),
            FilterExpression::LocationInCircle(f) => f.hash(state),
            FilterExpression::LocationInPolygon(f) => f.hash(state),
        }
    }
}

impl Display for FilterExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterExpression::SelectAll => write!(f, "*"),
            FilterExpression::And(operands) if operands.is_empty() => write!(f, "(true)"),
            FilterExpression::Or(operands) if operands.is_empty() => write!(f, "(false)"),
            FilterExpression::And(operands) => write!(f, "({})", operands.iter().join(" && ")),
            FilterExpression::Or(operands) => write!(f, "({})", operands.iter().join(" || ")),
            FilterExpression::Not(operand) => match operand.as_ref() {
                FilterExpression::SelectAll
                | FilterExpression::And(_)
                | FilterExpression::Or(_)
                | FilterExpression::Not(_) => write!(f, "!{}", operand),
                leaf => write!(f, "!({})", leaf),
            },
            FilterExpression::Eq(v) => write!(f, "{} == {}", v.field, v.value),
            FilterExpression::Neq(v) => write!(f, "{} != {}", v.field, v.value),
            FilterExpression::Gt(v) => write!(f, "{} > {}", v.field, v.value),
            FilterExpression::Gte(v) => write!(f, "{} >= {}", v.field, v.value),
            FilterExpression::Lt(v) => write!(f, "{} < {}", v.field, v.value),
            FilterExpression::Lte(v) => write!(f, "{} <= {}", v.field, v.value),
            FilterExpression::In(v) => write!(f, "{} in [{}]", v.field, v.values.iter().join(", ")),
            FilterExpression::RegexMatches(v) => {
                let flags = if v.case_insensitive { "i" } else { "" };
                write!(f, "{} =~ /{}/{}", v.field, v.pattern, flags)
            }
            FilterExpression::StartsWith(v) => write!(f, "{} startsWith {:?}", v.field, v.prefix),
            FilterExpression::HasField(field) => write!(f, "exists({})", field),
            FilterExpression::HasTag(tag) => write!(f, "tag({:?})", tag),
            FilterExpression::HasOneOfTags(tags) => {
                write!(f, "anyTag({})", tags.iter().map(|t| format!("{:?}", t)).join(", "))
            }
            FilterExpression::LocationInCircle(c) => {
                write!(f, "location within {}m of {}", c.radius_meters, c.center)
            }
            FilterExpression::LocationInPolygon(p) => {
                write!(f, "location within polygon[{}]", p.vertices.iter().join(", "))
            }
        }
    }
}

/// A field compared with a single value (`Eq`, `Neq`, `Gt`, `Gte`, `Lt`, `Lte`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueFilter {
    field: Field,
    value: FilterValue,
}

impl ValueFilter {
    pub fn new(field: Field, value: FilterValue) -> Self {
        ValueFilter { field, value }
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }
}

impl FieldValueFilter for ValueFilter {
    fn field(&self) -> &Field {
        &self.field
    }

    fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

/// Set membership of a field value.
///
/// The set is non-empty and homogeneous so that it classifies as one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFilter {
    field: Field,
    values: IndexSet<FilterValue>,
    value_type: ValueType,
}

impl InFilter {
    /// Creates a membership filter.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::TypeError`] if the values are empty, contain a list or mix types.
    pub fn new(field: Field, values: impl IntoIterator<Item = FilterValue>) -> TelemetraResult<Self> {
        let values: IndexSet<FilterValue> = values.into_iter().collect();
        let value_type = homogeneous_type(values.iter())?;
        Ok(InFilter {
            field,
            values,
            value_type,
        })
    }

    pub fn values(&self) -> &IndexSet<FilterValue> {
        &self.values
    }
}

impl Hash for InFilter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field.hash(state);
        hash_unordered(self.values.iter(), state);
    }
}

impl FieldValueFilter for InFilter {
    fn field(&self) -> &Field {
        &self.field
    }

    fn value_type(&self) -> ValueType {
        self.value_type
    }
}

/// Full-string regular expression match of a field's string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegexFilter {
    field: Field,
    pattern: String,
    case_insensitive: bool,
}

impl RegexFilter {
    /// Creates a case sensitive regex filter.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::ParseError`] if the pattern does not compile.
    pub fn new(field: Field, pattern: &str) -> TelemetraResult<Self> {
        Self::with_options(field, pattern, false)
    }

    /// Creates a regex filter with an explicit case sensitivity.
    pub fn with_options(field: Field, pattern: &str, case_insensitive: bool) -> TelemetraResult<Self> {
        if let Err(e) = Regex::new(pattern) {
            log::error!("Invalid regex pattern '{}': {}", pattern, e);
            return Err(TelemetraError::new_with_cause(
                &format!("Invalid regex pattern '{}'", pattern),
                ErrorKind::ParseError,
                e.into(),
            ));
        }
        Ok(RegexFilter {
            field,
            pattern: pattern.to_string(),
            case_insensitive,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }
}

impl FieldValueFilter for RegexFilter {
    fn field(&self) -> &Field {
        &self.field
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }
}

/// String prefix check of a field's string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StartsWithFilter {
    field: Field,
    prefix: String,
}

impl StartsWithFilter {
    pub fn new(field: Field, prefix: &str) -> Self {
        StartsWithFilter {
            field,
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl FieldValueFilter for StartsWithFilter {
    fn field(&self) -> &Field {
        &self.field
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }
}

/// A record location within `radius_meters` of `center`.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleFilter {
    center: GeoPoint,
    radius_meters: f64,
}

impl CircleFilter {
    /// # Errors
    ///
    /// [`ErrorKind::TypeError`] if the radius is negative or not finite.
    pub fn new(center: GeoPoint, radius_meters: f64) -> TelemetraResult<Self> {
        if !radius_meters.is_finite() || radius_meters < 0.0 {
            log::error!("Invalid circle radius {}", radius_meters);
            return Err(TelemetraError::new(
                &format!("Circle radius must be a non-negative number of meters, got: {}", radius_meters),
                ErrorKind::TypeError,
            ));
        }
        Ok(CircleFilter {
            center,
            radius_meters,
        })
    }

    pub fn center(&self) -> &GeoPoint {
        &self.center
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }
}

impl Eq for CircleFilter {}

impl Hash for CircleFilter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.center.hash(state);
        (self.radius_meters + 0.0).to_bits().hash(state);
    }
}

/// A record location inside or on the boundary of a polygon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolygonFilter {
    vertices: Vec<GeoPoint>,
}

impl PolygonFilter {
    /// # Errors
    ///
    /// [`ErrorKind::TypeError`] if fewer than three vertices are given.
    pub fn new(vertices: Vec<GeoPoint>) -> TelemetraResult<Self> {
        if vertices.len() < 3 {
            log::error!("Polygon with {} vertices", vertices.len());
            return Err(TelemetraError::new(
                &format!("A polygon needs at least 3 vertices, got: {}", vertices.len()),
                ErrorKind::TypeError,
            ));
        }
        Ok(PolygonFilter { vertices })
    }

    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn eq(path: &str, value: impl Into<FilterValue>) -> FilterExpression {
        FilterExpression::Eq(ValueFilter::new(Field::parse(path).unwrap(), value.into()))
    }

    #[test]
    fn test_and_equality_ignores_order() {
        let a = FilterExpression::And(vec![eq("a", 1), eq("b", 2)]);
        let b = FilterExpression::And(vec![eq("b", 2), eq("a", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_and_equality_counts_duplicates() {
        let a = FilterExpression::And(vec![eq("a", 1), eq("a", 1), eq("b", 2)]);
        let b = FilterExpression::And(vec![eq("a", 1), eq("b", 2), eq("b", 2)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_and_is_not_or() {
        let a = FilterExpression::And(vec![eq("a", 1)]);
        let b = FilterExpression::Or(vec![eq("a", 1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_ignores_operand_order() {
        let a = FilterExpression::Or(vec![eq("a", 1), eq("b", "x")]);
        let b = FilterExpression::Or(vec![eq("b", "x"), eq("a", 1)]);
        let set: HashSet<FilterExpression> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_and_extends_existing_conjunction() {
        let filter = eq("a", 1).and(eq("b", 2)).and(eq("c", 3));
        match filter {
            FilterExpression::And(operands) => assert_eq!(operands.len(), 3),
            other => panic!("expected And, got {}", other),
        }
    }

    #[test]
    fn test_value_type_inference() {
        let filter = eq("a", FilterValue::number(1.5).unwrap());
        assert_eq!(filter.as_field_value_filter().unwrap().value_type(), ValueType::Number);

        let filter = FilterExpression::RegexMatches(
            RegexFilter::new(Field::parse("name").unwrap(), "a.*").unwrap(),
        );
        assert_eq!(filter.as_field_value_filter().unwrap().value_type(), ValueType::String);

        assert!(FilterExpression::HasTag("x".into()).as_field_value_filter().is_none());
    }

    #[test]
    fn test_in_filter_requires_homogeneous_values() {
        let field = Field::parse("a").unwrap();
        assert!(InFilter::new(field.clone(), vec![FilterValue::from(1), FilterValue::from("x")]).is_err());
        assert!(InFilter::new(field.clone(), Vec::<FilterValue>::new()).is_err());
        let filter = InFilter::new(field, vec![FilterValue::from(1), FilterValue::from(2)]).unwrap();
        assert_eq!(filter.value_type(), ValueType::Number);
    }

    #[test]
    fn test_in_filter_equality_is_set_equality() {
        let field = Field::parse("a").unwrap();
        let a = InFilter::new(field.clone(), vec![FilterValue::from(1), FilterValue::from(2)]).unwrap();
        let b = InFilter::new(field, vec![FilterValue::from(2), FilterValue::from(1)]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_regex_is_parse_error() {
        let err = RegexFilter::new(Field::parse("a").unwrap(), "(").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ParseError);
    }

    #[test]
    fn test_polygon_needs_three_vertices() {
        let p = GeoPoint::new(0.0, 0.0).unwrap();
        assert!(PolygonFilter::new(vec![p, p]).is_err());
        assert!(PolygonFilter::new(vec![p, p, p]).is_ok());
    }

    #[test]
    fn test_circle_rejects_negative_radius() {
        let p = GeoPoint::new(0.0, 0.0).unwrap();
        assert!(CircleFilter::new(p, -1.0).is_err());
        assert!(CircleFilter::new(p, f64::INFINITY).is_err());
        assert!(CircleFilter::new(p, 0.0).is_ok());
    }

    #[test]
    fn test_display() {
        let filter = FilterExpression::Or(vec![eq("a", 1), eq("b", "x").not()]);
        assert_eq!(filter.to_string(), "(a == 1 || !(b == \"x\"))");
        assert_eq!(FilterExpression::And(vec![]).to_string(), "(true)");
        assert_eq!(FilterExpression::Or(vec![]).to_string(), "(false)");
    }

    #[test]
    fn test_display_negation() {
        assert_eq!(eq("b", "x").not().to_string(), "!(b == \"x\")");
        assert_eq!(eq("b", "x").not().not().to_string(), "!!(b == \"x\")");
        let both = FilterExpression::And(vec![eq("a", 1), eq("b", 2)]).not();
        assert_eq!(both.to_string(), "!(a == 1 && b == 2)");
        assert_eq!(FilterExpression::SelectAll.not().to_string(), "!*");
    }
}
