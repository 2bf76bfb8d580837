use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::common::SortOrder;
use crate::errors::{ErrorKind, TelemetraError, TelemetraResult};
use crate::evaluator::Record;
use crate::filter::{FilterExpression, FilterValue, ValueFilter};

use super::OrderBy;

/// Resume position of a keyset paged query.
///
/// `sort_tuple` holds the ordering values of the last record of a page and
/// `tie_offset` is one less than the number of delivered records that share
/// that exact tuple. The resume predicate from [`KeysetCursor::to_filter`]
/// keeps those tied records, so the caller skips [`KeysetCursor::skip_count`]
/// of them from the re-queried result ([`KeysetCursor::trim_tied`] does this
/// for in-memory results).
///
/// On the wire a cursor is the JSON `{"sortTuple": [..], "tieOffset": n}`
/// in URL-safe unpadded base64, see [`KeysetCursor::encode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysetCursor {
    sort_tuple: Vec<FilterValue>,
    tie_offset: usize,
}

impl KeysetCursor {
    pub fn new(sort_tuple: Vec<FilterValue>, tie_offset: usize) -> Self {
        KeysetCursor {
            sort_tuple,
            tie_offset,
        }
    }

    /// Builds the cursor following `page`, or `None` for an empty page.
    ///
    /// # Errors
    ///
    /// A type error if the last record lacks a scalar value for an ordering
    /// field; path errors from the record adapter.
    pub fn generate<R: Record>(order_by: &OrderBy, page: &[R]) -> TelemetraResult<Option<KeysetCursor>> {
        let last = match page.last() {
            Some(last) => last,
            None => return Ok(None),
        };

        let sort_tuple = order_by.sort_tuple(last)?;
        let mut tied = 0;
        for record in page {
            if order_by.is_tied(record, &sort_tuple)? {
                tied += 1;
            }
        }

        log::debug!("Cursor after {} records ({}): {} tied", page.len(), order_by, tied);
        Ok(Some(KeysetCursor {
            sort_tuple,
            tie_offset: tied - 1,
        }))
    }

    /// Builds the cursor following `page`, where `page` was fetched by
    /// resuming from `previous`.
    ///
    /// When every record of the page ties with the previous boundary, the
    /// run of equal tuples spans pages and the tie count carries over.
    pub fn generate_after<R: Record>(
        previous: Option<&KeysetCursor>,
        order_by: &OrderBy,
        page: &[R],
    ) -> TelemetraResult<Option<KeysetCursor>> {
        let cursor = match KeysetCursor::generate(order_by, page)? {
            Some(cursor) => cursor,
            None => return Ok(None),
        };

        let whole_page_tied = cursor.skip_count()? == page.len();
        match previous {
            Some(previous) if whole_page_tied && previous.sort_tuple == cursor.sort_tuple => {
                let tie_offset = previous
                    .skip_count()?
                    .checked_add(cursor.tie_offset)
                    .ok_or_else(tie_offset_overflow)?;
                Ok(Some(KeysetCursor {
                    tie_offset,
                    sort_tuple: cursor.sort_tuple,
                }))
            }
            _ => Ok(Some(cursor)),
        }
    }

    pub fn sort_tuple(&self) -> &[FilterValue] {
        &self.sort_tuple
    }

    pub fn tie_offset(&self) -> usize {
        self.tie_offset
    }

    /// Number of records tied with the sort tuple that were already delivered.
    ///
    /// # Errors
    ///
    /// A cursor mismatch if the tie offset is too large to count.
    #[inline]
    pub fn skip_count(&self) -> TelemetraResult<usize> {
        self.tie_offset.checked_add(1).ok_or_else(tie_offset_overflow)
    }

    /// Builds the resume predicate: records after the sort tuple under
    /// `order_by`, plus records tied with it on every field.
    ///
    /// For `n` ordering fields this is the disjunction over `i` in `0..n` of
    /// the conjunction of `Eq` on the first `n - i - 1` fields and an
    /// inequality on field `n - i - 1`. That inequality is inclusive
    /// (`Gte`/`Lte`) for `i == 0` and strict (`Gt`/`Lt`) otherwise, following
    /// the field's direction.
    ///
    /// # Errors
    ///
    /// A cursor mismatch if the tuple arity differs from `order_by`.
    pub fn to_filter(&self, order_by: &OrderBy) -> TelemetraResult<FilterExpression> {
        self.check_arity(order_by)?;

        let fields = order_by.fields();
        let n = fields.len();
        let branches = (0..n)
            .map(|i| {
                let last = n - i - 1;
                let mut terms: Vec<FilterExpression> = fields[..last]
                    .iter()
                    .zip(&self.sort_tuple)
                    .map(|((field, _), value)| {
                        FilterExpression::Eq(ValueFilter::new(field.clone(), value.clone()))
                    })
                    .collect();

                let (field, order) = &fields[last];
                let bound = ValueFilter::new(field.clone(), self.sort_tuple[last].clone());
                terms.push(match (order, i == 0) {
                    (SortOrder::Ascending, true) => FilterExpression::Gte(bound),
                    (SortOrder::Ascending, false) => FilterExpression::Gt(bound),
                    (SortOrder::Descending, true) => FilterExpression::Lte(bound),
                    (SortOrder::Descending, false) => FilterExpression::Lt(bound),
                });
                FilterExpression::And(terms)
            })
            .collect();

        Ok(FilterExpression::Or(branches))
    }

    /// Conjoins the resume predicate with the query's own filter.
    pub fn resume(&self, base: FilterExpression, order_by: &OrderBy) -> TelemetraResult<FilterExpression> {
        Ok(FilterExpression::And(vec![base, self.to_filter(order_by)?]))
    }

    /// Number of leading `records` to drop: up to [`Self::skip_count`]
    /// records tied with the sort tuple.
    pub fn tied_prefix_len<R: Record>(&self, order_by: &OrderBy, records: &[R]) -> TelemetraResult<usize> {
        self.check_arity(order_by)?;
        let mut skipped = 0;
        for record in records.iter().take(self.skip_count()?) {
            if !order_by.is_tied(record, &self.sort_tuple)? {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Drops the already delivered tied records from a sorted re-query result.
    pub fn trim_tied<R: Record>(&self, order_by: &OrderBy, mut records: Vec<R>) -> TelemetraResult<Vec<R>> {
        let skip = self.tied_prefix_len(order_by, &records)?;
        records.drain(..skip);
        Ok(records)
    }

    /// Encodes this cursor as an opaque, URL-safe token.
    pub fn encode(&self) -> TelemetraResult<String> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decodes a token produced by [`KeysetCursor::encode`].
    ///
    /// # Errors
    ///
    /// An encoding error if the token is not base64, a cursor mismatch if it
    /// does not hold a cursor.
    pub fn decode(token: &str) -> TelemetraResult<KeysetCursor> {
        let bytes = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|e| {
            log::error!("Cursor token is not valid base64: {}", e);
            TelemetraError::from(e)
        })?;

        let cursor: KeysetCursor = serde_json::from_slice(&bytes).map_err(|e| {
            log::error!("Cursor token does not hold a cursor: {}", e);
            TelemetraError::new_with_cause(
                "Cursor token does not hold a cursor",
                ErrorKind::CursorMismatch,
                TelemetraError::from(e),
            )
        })?;

        if cursor.sort_tuple.is_empty() || cursor.sort_tuple.iter().any(|v| !v.is_scalar()) {
            log::error!("Cursor sort tuple must be a non-empty list of scalars");
            return Err(TelemetraError::new(
                "Cursor sort tuple must be a non-empty list of scalars",
                ErrorKind::CursorMismatch,
            ));
        }
        cursor.skip_count()?;
        Ok(cursor)
    }

    fn check_arity(&self, order_by: &OrderBy) -> TelemetraResult<()> {
        if self.sort_tuple.len() != order_by.len() {
            log::error!(
                "Cursor has {} sort values but the ordering ({}) has {} fields",
                self.sort_tuple.len(),
                order_by,
                order_by.len()
            );
            return Err(TelemetraError::new(
                &format!(
                    "Cursor has {} sort values but the ordering has {} fields",
                    self.sort_tuple.len(),
                    order_by.len()
                ),
                ErrorKind::CursorMismatch,
            ));
        }
        Ok(())
    }
}

fn tie_offset_overflow() -> TelemetraError {
    log::error!("Cursor tie offset overflows the skip count");
    TelemetraError::new("Cursor tie offset is out of range", ErrorKind::CursorMismatch)
}
