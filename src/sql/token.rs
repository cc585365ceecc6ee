//! SQL Token definitions
//!
//! A token keeps the raw lexeme, its class and a semantic value.

use std::fmt;

/// Longest identifier the lexer accepts
pub const MAX_IDENT_LEN: usize = 16;

/// Token class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Keyword,
    Identifier,
    TypeName,
    Constant,
    Symbol,
    Terminator,
    FunctionName,
    Error,
}

/// Reserved words, in keyword-table order: type names, then keywords, then
/// aggregate function names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Type names
    Int,
    Char,
    Varchar,

    // Keywords
    Create,
    Table,
    Not,
    Null,
    Drop,
    List,
    Schema,
    For,
    To,
    Insert,
    Into,
    Values,
    Delete,
    From,
    Where,
    Update,
    Set,
    Select,
    Order,
    By,
    Desc,
    Is,
    And,
    Or,
    Natural,
    Join,

    // Aggregate functions
    Sum,
    Avg,
    Count,
}

/// Keyword table, matched case-insensitively
const KEYWORDS: &[(&str, Keyword)] = &[
    ("INT", Keyword::Int),
    ("CHAR", Keyword::Char),
    ("VARCHAR", Keyword::Varchar),
    ("CREATE", Keyword::Create),
    ("TABLE", Keyword::Table),
    ("NOT", Keyword::Not),
    ("NULL", Keyword::Null),
    ("DROP", Keyword::Drop),
    ("LIST", Keyword::List),
    ("SCHEMA", Keyword::Schema),
    ("FOR", Keyword::For),
    ("TO", Keyword::To),
    ("INSERT", Keyword::Insert),
    ("INTO", Keyword::Into),
    ("VALUES", Keyword::Values),
    ("DELETE", Keyword::Delete),
    ("FROM", Keyword::From),
    ("WHERE", Keyword::Where),
    ("UPDATE", Keyword::Update),
    ("SET", Keyword::Set),
    ("SELECT", Keyword::Select),
    ("ORDER", Keyword::Order),
    ("BY", Keyword::By),
    ("DESC", Keyword::Desc),
    ("IS", Keyword::Is),
    ("AND", Keyword::And),
    ("OR", Keyword::Or),
    ("NATURAL", Keyword::Natural),
    ("JOIN", Keyword::Join),
    ("SUM", Keyword::Sum),
    ("AVG", Keyword::Avg),
    ("COUNT", Keyword::Count),
];

impl Keyword {
    /// Look up a word in the keyword table
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(text, _)| text.eq_ignore_ascii_case(word))
            .map(|(_, kw)| *kw)
    }

    /// Class a token gets when it matches this keyword
    pub fn class(self) -> TokenClass {
        match self {
            Keyword::Int | Keyword::Char | Keyword::Varchar => TokenClass::TypeName,
            Keyword::Sum | Keyword::Avg | Keyword::Count => TokenClass::FunctionName,
            _ => TokenClass::Keyword,
        }
    }

    /// Canonical upper-case spelling
    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map(|(text, _)| *text)
            .unwrap_or("?")
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-character symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// *
    Star,
    /// =
    Eq,
    /// <
    Lt,
    /// >
    Gt,
}

impl Symbol {
    pub fn from_char(ch: char) -> Option<Symbol> {
        match ch {
            '(' => Some(Symbol::LParen),
            ')' => Some(Symbol::RParen),
            ',' => Some(Symbol::Comma),
            '*' => Some(Symbol::Star),
            '=' => Some(Symbol::Eq),
            '<' => Some(Symbol::Lt),
            '>' => Some(Symbol::Gt),
            _ => None,
        }
    }
}

/// Semantic value of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenValue {
    Keyword(Keyword),
    Symbol(Symbol),
    Identifier,
    IntLiteral,
    StringLiteral,
    /// End of command
    Eoc,
    Invalid,
}

/// A classified lexeme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Raw lexeme (string literals without their quotes)
    pub text: String,
    pub class: TokenClass,
    pub value: TokenValue,
}

impl Token {
    pub fn new(text: impl Into<String>, class: TokenClass, value: TokenValue) -> Self {
        Self {
            text: text.into(),
            class,
            value,
        }
    }

    pub fn keyword(text: impl Into<String>, kw: Keyword) -> Self {
        Self::new(text, kw.class(), TokenValue::Keyword(kw))
    }

    pub fn identifier(text: impl Into<String>) -> Self {
        Self::new(text, TokenClass::Identifier, TokenValue::Identifier)
    }

    pub fn int_literal(text: impl Into<String>) -> Self {
        Self::new(text, TokenClass::Constant, TokenValue::IntLiteral)
    }

    pub fn string_literal(text: impl Into<String>) -> Self {
        Self::new(text, TokenClass::Constant, TokenValue::StringLiteral)
    }

    pub fn symbol(ch: char, sym: Symbol) -> Self {
        Self::new(ch.to_string(), TokenClass::Symbol, TokenValue::Symbol(sym))
    }

    pub fn terminator() -> Self {
        Self::new("", TokenClass::Terminator, TokenValue::Eoc)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, TokenClass::Error, TokenValue::Invalid)
    }

    /// Is this the given keyword?
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.value == TokenValue::Keyword(kw)
    }

    /// Is this the given symbol?
    pub fn is_symbol(&self, sym: Symbol) -> bool {
        self.value == TokenValue::Symbol(sym)
    }

    pub fn is_eoc(&self) -> bool {
        self.value == TokenValue::Eoc
    }

    /// Tokens usable as table, column or file names. Reserved words are
    /// accepted here as well.
    pub fn is_name(&self) -> bool {
        matches!(
            self.class,
            TokenClass::Keyword | TokenClass::Identifier | TokenClass::TypeName
        )
    }

    /// The keyword this token carries, if any
    pub fn as_keyword(&self) -> Option<Keyword> {
        match self.value {
            TokenValue::Keyword(kw) => Some(kw),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            TokenValue::StringLiteral => write!(f, "'{}'", self.text),
            TokenValue::Eoc => write!(f, "<end of command>"),
            _ => write!(f, "{}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(Keyword::lookup("SELECT"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("select"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("SeLeCt"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("unknown"), None);
    }

    #[test]
    fn test_keyword_class() {
        assert_eq!(Keyword::Varchar.class(), TokenClass::TypeName);
        assert_eq!(Keyword::Create.class(), TokenClass::Keyword);
        assert_eq!(Keyword::Join.class(), TokenClass::Keyword);
        assert_eq!(Keyword::Count.class(), TokenClass::FunctionName);
    }

    #[test]
    fn test_is_name() {
        assert!(Token::identifier("users").is_name());
        assert!(Token::keyword("list", Keyword::List).is_name());
        assert!(Token::keyword("int", Keyword::Int).is_name());
        assert!(!Token::keyword("sum", Keyword::Sum).is_name());
        assert!(!Token::int_literal("1").is_name());
    }
}
