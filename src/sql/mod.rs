//! SQL front end
//!
//! This module contains the lexer, the token stream handlers consume, and
//! statement classification.

pub mod lexer;
pub mod statement;
pub mod stream;
pub mod token;

pub use lexer::{tokenize, Lexer};
pub use statement::StatementKind;
pub use stream::TokenStream;
pub use token::{Keyword, Symbol, Token, TokenClass, TokenValue};
