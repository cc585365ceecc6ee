//! Catalog module
//!
//! This module contains the catalog store, table descriptors, and column types.

pub mod catalog;
pub mod schema;
pub mod types;

pub use catalog::{Catalog, TableBuilder};
pub use schema::{ColumnDescriptor, TableDescriptor, MAX_NUM_COL};
pub use types::ColumnType;
