//! The filter expression language.
//!
//! A [`FilterExpression`] describes a predicate over event and metric
//! records. Expressions are plain immutable values: they can be built with the
//! fluent API, decoded from the JSON wire format by [`crate::codec`], evaluated
//! in memory by [`crate::evaluator`], or handed to a backend compiler.
//!
//! # Creating Filters
//!
//! - `field("value").gt(10)` - comparison operators
//! - `field("dataset").eq("d1")` - equality, or containment for array fields
//! - `field("source").regex("sensor-.*")` - full-string regex match
//! - `has_tag("calibrated")`, `has_any_tag([...])` - tag predicates
//! - `location_in_circle(center, meters)` - geospatial predicates
//! - `all()` - match every record
//!
//! # Examples
//!
//! ```rust
//! use telemetra::filter::{field, has_tag};
//!
//! # fn main() -> telemetra::errors::TelemetraResult<()> {
//! let filter = field("dataset")?
//!     .eq("d1")
//!     .and(field("value")?.gt(10))
//!     .and(has_tag("calibrated").not());
//! assert_eq!(
//!     filter.to_string(),
//!     "(dataset == \"d1\" && value > 10 && !tag(\"calibrated\"))"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Supported Operators
//!
//! - **Equality**: `eq`, `ne`
//! - **Comparison**: `gt`, `gte`, `lt`, `lte`
//! - **Membership**: `in_values`
//! - **Pattern**: `regex`, `regex_ignore_case`, `starts_with`
//! - **Existence**: `exists`
//! - **Tags**: `has_tag`, `has_any_tag`
//! - **Location**: `location_in_circle`, `location_in_polygon`
//! - **Logical**: `and`, `or`, `not`
//! - **Special**: `all`

mod expression;
mod fluent;
mod value;

pub use expression::*;
pub use fluent::*;
pub use value::{FilterValue, ValueList, ValueType};
pub(crate) use value::{json_type_name, number_to_json};
