//! # Telemetra - Filter Expression Engine
//!
//! Telemetra is the predicate core of an IoT data platform. One filter
//! language is used to select events and metrics, to scope access grants,
//! exports and stream subscriptions, and to resume paged queries.
//!
//! ## Key Features
//!
//! - **Expression AST**: an immutable, closed [`filter::FilterExpression`] type with a fluent builder API
//! - **Wire Codec**: the persisted JSON shape (`{"_and": [..]}`, `{"a->b": {"_gt": 1}}`) in [`codec`]
//! - **In-memory Evaluation**: [`evaluator::Evaluator`] over generic JSON records and typed [`event::Event`]s
//! - **Geospatial Predicates**: great-circle radius and polygon containment in [`spatial`]
//! - **Keyset Pagination**: stable resume cursors with tie handling in [`cursor`]
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use telemetra::codec;
//! use telemetra::evaluator::Evaluator;
//!
//! # fn main() -> telemetra::errors::TelemetraResult<()> {
//! let filter = codec::decode_str(r#"{"_and":[{"dataset":{"_eq":"d1"}},{"value":{"_gt":10}}]}"#)?;
//!
//! let evaluator = Evaluator::new();
//! assert!(evaluator.matches(&json!({"dataset": "d1", "value": 15}), &filter)?);
//! assert!(!evaluator.matches(&json!({"dataset": "d1", "value": 5}), &filter)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`codec`] - JSON wire codec
//! - [`common`] - Field paths, sort order and constants
//! - [`cursor`] - Keyset pagination cursors
//! - [`errors`] - Error types and result definitions
//! - [`evaluator`] - Record adapters, regex cache and the evaluator
//! - [`event`] - The typed event record
//! - [`filter`] - Filter expressions and fluent builders
//! - [`spatial`] - Geographic points and containment tests

pub mod codec;
pub mod common;
pub mod cursor;
pub mod errors;
pub mod evaluator;
pub mod event;
pub mod filter;
pub mod spatial;
