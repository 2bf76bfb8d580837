//! Integration tests for the telemetra filter engine.
//!
//! Shared fixtures and the `run_test` harness live in [`test_util`]; the
//! tests themselves are in `tests/`.

pub mod test_util;
