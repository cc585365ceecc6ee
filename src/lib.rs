//! flatdb - A single-statement SQL engine over flat binary files
//!
//! This library provides the pieces one command goes through:
//! - SQL front end (lexer, token stream, statement classification)
//! - System catalog (`dbfile.bin`)
//! - Storage engine (one fixed-record `.tab` file per table)
//! - Statement execution (DDL, DML, SELECT with NATURAL JOIN and aggregates)

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use executor::{ExecutionEngine, QueryResult};
