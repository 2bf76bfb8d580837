use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::Display;

use crate::common::{Field, SortOrder};
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use crate::evaluator::{compare_json, structurally_equal, Record};
use crate::filter::FilterValue;
use serde_json::Value;

/// The ordering of a paged query: fields in priority order, each with its
/// own direction.
///
/// # Examples
///
/// ```rust
/// use telemetra::common::{Field, SortOrder};
/// use telemetra::cursor::OrderBy;
///
/// # fn main() -> telemetra::errors::TelemetraResult<()> {
/// let order = OrderBy::new(vec![
///     (Field::parse("a")?, SortOrder::Ascending),
///     (Field::parse("b")?, SortOrder::Descending),
/// ])?;
/// assert_eq!(order.to_string(), "a asc, b desc");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    fields: Vec<(Field, SortOrder)>,
}

impl OrderBy {
    /// Creates an ordering.
    ///
    /// # Errors
    ///
    /// A config error if `fields` is empty.
    pub fn new(fields: Vec<(Field, SortOrder)>) -> TelemetraResult<Self> {
        if fields.is_empty() {
            log::error!("An ordering needs at least one field");
            return Err(TelemetraError::new(
                "An ordering needs at least one field",
                ErrorKind::ConfigError,
            ));
        }
        Ok(OrderBy { fields })
    }

    /// Creates an ordering that applies one direction to every field.
    pub fn uniform(fields: Vec<Field>, order: SortOrder) -> TelemetraResult<Self> {
        OrderBy::new(fields.into_iter().map(|field| (field, order)).collect())
    }

    pub fn fields(&self) -> &[(Field, SortOrder)] {
        &self.fields
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Orders two records.
    ///
    /// # Errors
    ///
    /// A type error when a record has no value (or `null`) for an ordering
    /// field, or when the two records hold values of different types for the
    /// same field.
    pub fn compare<R: Record + ?Sized>(&self, a: &R, b: &R) -> TelemetraResult<Ordering> {
        for (field, order) in &self.fields {
            let left = ordering_value(a, field)?;
            let right = ordering_value(b, field)?;
            let ordering = order.apply(compare_json(&left, &right)?);
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }

    /// Stably sorts `records`.
    ///
    /// Every record is checked against the first one before sorting, so a
    /// missing value or a type mismatch is reported without reordering.
    pub fn sort<R: Record>(&self, records: &mut [R]) -> TelemetraResult<()> {
        if let Some((first, rest)) = records.split_first() {
            self.check_comparable(first, first)?;
            for record in rest {
                self.check_comparable(first, record)?;
            }
        }

        let mut error = None;
        records.sort_by(|a, b| match self.compare(a, b) {
            Ok(ordering) => ordering,
            Err(e) => {
                error.get_or_insert(e);
                Ordering::Equal
            }
        });
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn check_comparable<R: Record + ?Sized>(&self, a: &R, b: &R) -> TelemetraResult<()> {
        for (field, _) in &self.fields {
            compare_json(&*ordering_value(a, field)?, &*ordering_value(b, field)?)?;
        }
        Ok(())
    }

    /// Reads the ordering fields of `record` as a sort tuple.
    ///
    /// # Errors
    ///
    /// A type error if a field is missing, `null` or not a scalar.
    pub fn sort_tuple<R: Record + ?Sized>(&self, record: &R) -> TelemetraResult<Vec<FilterValue>> {
        let mut tuple = Vec::with_capacity(self.fields.len());
        for (field, _) in &self.fields {
            let value = ordering_value(record, field)?;
            tuple.push(FilterValue::scalar_from_json(&value)?);
        }
        Ok(tuple)
    }

    /// Returns whether `record` holds exactly `tuple` in every ordering field.
    pub(crate) fn is_tied<R: Record + ?Sized>(&self, record: &R, tuple: &[FilterValue]) -> TelemetraResult<bool> {
        for ((field, _), expected) in self.fields.iter().zip(tuple) {
            match record.field_value(field)? {
                Some(value) if structurally_equal(&value, expected) => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

fn ordering_value<'a, R: Record + ?Sized>(record: &'a R, field: &Field) -> TelemetraResult<Cow<'a, Value>> {
    match record.field_value(field)? {
        Some(value) if !value.is_null() => Ok(value),
        _ => {
            log::error!("Ordering field {} is missing", field);
            Err(TelemetraError::new(
                &format!("Ordering field '{}' has no value", field),
                ErrorKind::TypeError,
            ))
        }
    }
}

impl Display for OrderBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, (field, order)) in self.fields.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            let direction = match order {
                SortOrder::Ascending => "asc",
                SortOrder::Descending => "desc",
            };
            write!(f, "{} {}", field, direction)?;
        }
        Ok(())
    }
}
