//! Statement classification
//!
//! Looks at the first one or two tokens and decides which handler a command
//! belongs to.

use std::fmt;

use super::stream::TokenStream;
use super::token::Keyword;
use crate::error::{Error, Result};

/// Statement kinds the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    CreateTable,
    DropTable,
    ListTable,
    ListSchema,
    Insert,
    Delete,
    Update,
    Select,
}

impl StatementKind {
    /// Classify the statement and leave the cursor just past the leading
    /// keywords. Unrecognised input marks the first token invalid.
    pub fn classify(stream: &mut TokenStream) -> Result<StatementKind> {
        let first = stream.current().as_keyword();
        let second = stream.peek(1).as_keyword();

        let (kind, consumed) = match (first, second) {
            (Some(Keyword::Create), Some(Keyword::Table)) => (StatementKind::CreateTable, 2),
            (Some(Keyword::Drop), Some(Keyword::Table)) => (StatementKind::DropTable, 2),
            (Some(Keyword::List), Some(Keyword::Table)) => (StatementKind::ListTable, 2),
            (Some(Keyword::List), Some(Keyword::Schema)) => (StatementKind::ListSchema, 2),
            (Some(Keyword::Insert), Some(Keyword::Into)) => (StatementKind::Insert, 2),
            (Some(Keyword::Delete), Some(Keyword::From)) => (StatementKind::Delete, 2),
            (Some(Keyword::Update), _) if !stream.peek(1).is_eoc() => (StatementKind::Update, 1),
            (Some(Keyword::Select), _) => (StatementKind::Select, 1),
            _ => return Err(stream.reject(Error::InvalidStatement)),
        };

        for _ in 0..consumed {
            stream.advance();
        }
        Ok(kind)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::CreateTable => "CREATE TABLE",
            StatementKind::DropTable => "DROP TABLE",
            StatementKind::ListTable => "LIST TABLE",
            StatementKind::ListSchema => "LIST SCHEMA",
            StatementKind::Insert => "INSERT",
            StatementKind::Delete => "DELETE",
            StatementKind::Update => "UPDATE",
            StatementKind::Select => "SELECT",
        };
        write!(f, "{} statement", name)
    }
}
