//! Common types shared by the filter, evaluator and cursor modules.

mod constants;
mod fields;
mod sort_order;

pub use constants::*;
pub use fields::*;
pub use sort_order::*;
