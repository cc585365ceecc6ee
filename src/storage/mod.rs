//! Storage engine module
//!
//! This module contains the storage engine components:
//! - Record codec (field layout, NULL length bytes)
//! - Table data files (header, fixed-size records)

pub mod record;
pub mod table;

pub use record::{RecordLayout, Value};
pub use table::{TableFile, TableFileHeader, MAX_ROWS};
