//! Statement execution module
//!
//! This module contains the statement handlers, WHERE conditions, the SELECT
//! engine and result rendering.

pub mod condition;
pub mod executor;
pub mod result;
pub mod row;
pub mod select;

pub use executor::ExecutionEngine;
pub use result::{QueryResult, ResultSet};
