//! Token stream
//!
//! An owned, indexed token sequence with a cursor. Statement handlers walk it
//! front to back and, on failure, mark the token they stopped at so the
//! caller can report it.

use super::token::{Keyword, Symbol, Token};
use crate::error::Error;

/// Indexed token sequence with a cursor
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    position: usize,
    /// Index of the token that caused the statement to fail
    invalid: Option<usize>,
}

impl TokenStream {
    /// Wrap a token sequence. A terminator is appended if missing so the
    /// cursor can never run past the end.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(|t| t.is_eoc()) {
            tokens.push(Token::terminator());
        }
        Self {
            tokens,
            position: 0,
            invalid: None,
        }
    }

    /// Current token
    pub fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    /// Look ahead `offset` tokens without moving (clamped to the terminator)
    pub fn peek(&self, offset: usize) -> &Token {
        let idx = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Move to the next token (stays on the terminator)
    pub fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Return the current token and move past it
    pub fn next_token(&mut self) -> Token {
        let token = self.current().clone();
        self.advance();
        token
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn check_keyword(&self, kw: Keyword) -> bool {
        self.current().is_keyword(kw)
    }

    pub fn check_symbol(&self, sym: Symbol) -> bool {
        self.current().is_symbol(sym)
    }

    /// Consume the keyword if it is current
    pub fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the symbol if it is current
    pub fn eat_symbol(&mut self, sym: Symbol) -> bool {
        if self.check_symbol(sym) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Is the cursor on the end-of-command terminator?
    pub fn at_end(&self) -> bool {
        self.current().is_eoc()
    }

    /// Mark the current token invalid and hand back `err`
    pub fn reject(&mut self, err: Error) -> Error {
        self.invalid = Some(self.position);
        err
    }

    /// Mark the token at an absolute index invalid and hand back `err`
    pub fn reject_at(&mut self, index: usize, err: Error) -> Error {
        self.invalid = Some(index.min(self.tokens.len() - 1));
        err
    }

    /// The token marked invalid, if any
    pub fn offending(&self) -> Option<&Token> {
        self.invalid.map(|idx| &self.tokens[idx])
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}
