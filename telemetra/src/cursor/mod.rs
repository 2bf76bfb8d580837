//! Keyset (resume) pagination.
//!
//! After a page is served, [`KeysetCursor::generate`] records the ordering
//! values of its last record and how many delivered records share them. The
//! next page is fetched with [`KeysetCursor::resume`], which conjoins the
//! query's filter with a lexicographic "at or after" predicate, and then
//! drops the [`KeysetCursor::skip_count`] tied records that were already
//! delivered. No numeric offset is involved, so pages stay stable under
//! concurrent inserts.
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use telemetra::common::{Field, SortOrder};
//! use telemetra::cursor::{KeysetCursor, OrderBy};
//! use telemetra::filter::all;
//!
//! # fn main() -> telemetra::errors::TelemetraResult<()> {
//! let order = OrderBy::uniform(vec![Field::parse("ts")?], SortOrder::Ascending)?;
//! let page = vec![json!({"ts": 1}), json!({"ts": 2}), json!({"ts": 2})];
//!
//! let cursor = KeysetCursor::generate(&order, &page)?.expect("non-empty page");
//! assert_eq!(cursor.skip_count()?, 2);
//!
//! let token = cursor.encode()?;
//! let next = KeysetCursor::decode(&token)?.resume(all(), &order)?;
//! assert_eq!(next.to_string(), "(* && ((ts >= 2)))");
//! # Ok(())
//! # }
//! ```

mod keyset;
mod order_by;

pub use keyset::KeysetCursor;
pub use order_by::OrderBy;
