//! Telemetra Benchmark Library
//!
//! Data generators shared by the codec, evaluator and cursor benchmarks.

pub mod data_gen;
