//! Error types for flatdb
//!
//! Every failure a statement can hit is a variant here. Each variant maps to a
//! stable numeric return code (see [`Error::code`]) which the binary uses as its
//! process exit status.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flatdb
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Lexer error: invalid token '{0}'")]
    InvalidToken(String),

    // ========== Statement Errors ==========
    #[error("Statement error: invalid statement")]
    InvalidStatement,

    #[error("Statement error: invalid table name")]
    InvalidTableName,

    #[error("Statement error: invalid table definition")]
    InvalidTableDefinition,

    #[error("Statement error: invalid column name")]
    InvalidColumnName,

    #[error("Statement error: invalid type name")]
    InvalidTypeName,

    #[error("Statement error: invalid column definition")]
    InvalidColumnDefinition,

    #[error("Statement error: invalid report file name")]
    InvalidReportFileName,

    #[error("Statement error: invalid INSERT definition")]
    InvalidInsertDefinition,

    #[error("Statement error: invalid UPDATE definition")]
    InvalidUpdateDefinition,

    #[error("Statement error: invalid SELECT definition")]
    InvalidSelectDefinition,

    // ========== Catalog Errors ==========
    #[error("Catalog error: table '{0}' already exists")]
    DuplicateTableName(String),

    #[error("Catalog error: table '{0}' does not exist")]
    TableNotExist(String),

    #[error("Catalog error: duplicate column '{0}'")]
    DuplicateColumnName(String),

    #[error("Catalog error: column '{0}' does not exist")]
    ColumnNotExist(String),

    #[error("Catalog error: more than {0} columns")]
    MaxColumnExceeded(usize),

    #[error("Catalog error: catalog file is corrupted ({0})")]
    CatalogCorruption(String),

    // ========== Type Errors ==========
    #[error("Type error: invalid column length")]
    InvalidColumnLength,

    #[error("Type error: type mismatch for column '{0}'")]
    TypeMismatch(String),

    #[error("Type error: null value not allowed for column '{0}'")]
    NotNullViolation(String),

    // ========== Capacity Errors ==========
    #[error("Capacity error: table '{0}' already holds {1} rows")]
    TableFull(String, u32),

    // ========== I/O Errors ==========
    #[error("I/O error: cannot open '{}'", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: cannot read '{}'", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: cannot write '{}'", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Numeric return code reported for this error
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidToken(_) => 99,
            Error::InvalidStatement => -199,
            Error::InvalidTableName => -399,
            Error::DuplicateTableName(_) => -398,
            Error::TableNotExist(_) => -397,
            Error::InvalidTableDefinition => -396,
            Error::InvalidColumnName => -395,
            Error::DuplicateColumnName(_) => -394,
            Error::ColumnNotExist(_) => -393,
            Error::MaxColumnExceeded(_) => -392,
            Error::InvalidTypeName => -391,
            Error::InvalidColumnDefinition => -390,
            Error::InvalidColumnLength => -389,
            Error::InvalidReportFileName => -388,
            Error::TypeMismatch(_) => -387,
            Error::NotNullViolation(_) => -386,
            Error::InvalidInsertDefinition => -385,
            Error::InvalidUpdateDefinition => -384,
            Error::InvalidSelectDefinition => -383,
            Error::FileOpen { .. } => -299,
            Error::CatalogCorruption(_) => -298,
            Error::TableFull(_, _) => -297,
            Error::FileWrite { .. } => -296,
            Error::FileRead { .. } => -295,
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileOpen {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileRead {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileWrite {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for flatdb operations
pub type Result<T> = std::result::Result<T, Error>;
