//! Column types for flatdb
//!
//! This module defines the column types a table can declare and how they are
//! coded in the catalog file.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Longest CHAR/VARCHAR column (the field length prefix is one byte)
pub const MAX_STRING_LEN: u32 = 255;

/// Payload width of an INT field
pub const INT_WIDTH: u32 = 4;

/// Column Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Signed 32-bit integer
    Int,
    /// Fixed-length character string
    Char,
    /// Variable-length character string with max length
    Varchar,
}

impl ColumnType {
    /// Type code stored in the catalog
    pub fn code(&self) -> u32 {
        match self {
            ColumnType::Int => 10,
            ColumnType::Char => 11,
            ColumnType::Varchar => 12,
        }
    }

    /// Decode a catalog type code
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            10 => Ok(ColumnType::Int),
            11 => Ok(ColumnType::Char),
            12 => Ok(ColumnType::Varchar),
            other => Err(Error::CatalogCorruption(format!(
                "unknown column type code {}",
                other
            ))),
        }
    }

    /// Check if this type is a string type
    pub fn is_string(&self) -> bool {
        matches!(self, ColumnType::Char | ColumnType::Varchar)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Int => write!(f, "INT"),
            ColumnType::Char => write!(f, "CHAR"),
            ColumnType::Varchar => write!(f, "VARCHAR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        for ty in [ColumnType::Int, ColumnType::Char, ColumnType::Varchar] {
            assert_eq!(ColumnType::from_code(ty.code()).unwrap(), ty);
        }
        assert!(matches!(
            ColumnType::from_code(13),
            Err(Error::CatalogCorruption(_))
        ));
    }

    #[test]
    fn test_type_display() {
        assert_eq!(ColumnType::Int.to_string(), "INT");
        assert_eq!(ColumnType::Varchar.to_string(), "VARCHAR");
        assert!(ColumnType::Char.is_string());
        assert!(!ColumnType::Int.is_string());
    }
}
