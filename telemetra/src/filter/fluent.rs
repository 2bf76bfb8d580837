use crate::common::Field;
use crate::errors::TelemetraResult;
use crate::spatial::GeoPoint;

use super::{
    CircleFilter, FilterExpression, FilterValue, InFilter, PolygonFilter, RegexFilter,
    StartsWithFilter, ValueFilter,
};

/// Creates a filter that matches every record.
#[inline]
pub fn all() -> FilterExpression {
    FilterExpression::SelectAll
}

/// Creates a fluent filter builder for an encoded `->` separated field path.
///
/// # Errors
///
/// Returns a field path error if the path is empty or has an invalid segment.
///
/// # Examples
///
/// ```rust
/// use telemetra::filter::{field, FilterValue};
///
/// # fn main() -> telemetra::errors::TelemetraResult<()> {
/// let filter = field("value->temperature")?.gte(FilterValue::number(21.5)?);
/// assert_eq!(filter.to_string(), "value->temperature >= 21.5");
/// # Ok(())
/// # }
/// ```
pub fn field(path: &str) -> TelemetraResult<FluentFilter> {
    Ok(FluentFilter {
        field: Field::parse(path)?,
    })
}

/// Combines filters with logical AND. An empty list matches every record.
pub fn and(filters: Vec<FilterExpression>) -> FilterExpression {
    FilterExpression::And(filters)
}

/// Combines filters with logical OR. An empty list matches no record.
pub fn or(filters: Vec<FilterExpression>) -> FilterExpression {
    FilterExpression::Or(filters)
}

/// Negates a filter.
pub fn not(filter: FilterExpression) -> FilterExpression {
    FilterExpression::Not(Box::new(filter))
}

/// Matches records whose tag set contains `tag`.
pub fn has_tag(tag: &str) -> FilterExpression {
    FilterExpression::HasTag(tag.to_string())
}

/// Matches records whose tag set contains at least one of `tags`.
pub fn has_any_tag<I, S>(tags: I) -> FilterExpression
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    FilterExpression::HasOneOfTags(tags.into_iter().map(Into::into).collect())
}

/// Matches records located within `radius_meters` of `center`.
pub fn location_in_circle(center: GeoPoint, radius_meters: f64) -> TelemetraResult<FilterExpression> {
    Ok(FilterExpression::LocationInCircle(CircleFilter::new(center, radius_meters)?))
}

/// Matches records located inside or on the boundary of a polygon.
pub fn location_in_polygon(vertices: Vec<GeoPoint>) -> TelemetraResult<FilterExpression> {
    Ok(FilterExpression::LocationInPolygon(PolygonFilter::new(vertices)?))
}

/// A fluent builder for predicates on one field.
///
/// Every method consumes the builder and returns a finished
/// [`FilterExpression`] leaf.
pub struct FluentFilter {
    field: Field,
}

impl FluentFilter {
    /// Creates a builder for an already parsed field.
    pub fn new(field: Field) -> Self {
        FluentFilter { field }
    }

    /// Field equals the value; for array fields and scalar values, the array contains it.
    #[inline]
    pub fn eq<T: Into<FilterValue>>(self, value: T) -> FilterExpression {
        FilterExpression::Eq(ValueFilter::new(self.field, value.into()))
    }

    /// Field does not equal the value.
    #[inline]
    pub fn ne<T: Into<FilterValue>>(self, value: T) -> FilterExpression {
        FilterExpression::Neq(ValueFilter::new(self.field, value.into()))
    }

    #[inline]
    pub fn gt<T: Into<FilterValue>>(self, value: T) -> FilterExpression {
        FilterExpression::Gt(ValueFilter::new(self.field, value.into()))
    }

    #[inline]
    pub fn gte<T: Into<FilterValue>>(self, value: T) -> FilterExpression {
        FilterExpression::Gte(ValueFilter::new(self.field, value.into()))
    }

    #[inline]
    pub fn lt<T: Into<FilterValue>>(self, value: T) -> FilterExpression {
        FilterExpression::Lt(ValueFilter::new(self.field, value.into()))
    }

    #[inline]
    pub fn lte<T: Into<FilterValue>>(self, value: T) -> FilterExpression {
        FilterExpression::Lte(ValueFilter::new(self.field, value.into()))
    }

    /// Field value is one of `values`.
    ///
    /// # Errors
    ///
    /// A type error if `values` is empty or mixes value types.
    pub fn in_values<I, T>(self, values: I) -> TelemetraResult<FilterExpression>
    where
        I: IntoIterator<Item = T>,
        T: Into<FilterValue>,
    {
        let filter = InFilter::new(self.field, values.into_iter().map(Into::into))?;
        Ok(FilterExpression::In(filter))
    }

    /// Field's string form fully matches `pattern`.
    pub fn regex(self, pattern: &str) -> TelemetraResult<FilterExpression> {
        Ok(FilterExpression::RegexMatches(RegexFilter::new(self.field, pattern)?))
    }

    /// Field's string form fully matches `pattern`, ignoring case.
    pub fn regex_ignore_case(self, pattern: &str) -> TelemetraResult<FilterExpression> {
        Ok(FilterExpression::RegexMatches(RegexFilter::with_options(
            self.field, pattern, true,
        )?))
    }

    /// Field's string form starts with `prefix`.
    pub fn starts_with(self, prefix: &str) -> FilterExpression {
        FilterExpression::StartsWith(StartsWithFilter::new(self.field, prefix))
    }

    /// Field resolves to a non-null value.
    pub fn exists(self) -> FilterExpression {
        FilterExpression::HasField(self.field)
    }
}
