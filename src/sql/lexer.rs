//! SQL Lexer (Tokenizer)
//!
//! This module converts a command string into a sequence of classified tokens.
//! Scanning stops at the first malformed lexeme, which is kept as an error
//! token at the end of the sequence.

use super::token::{Keyword, Symbol, Token, TokenClass, MAX_IDENT_LEN};
use crate::error::{Error, Result};

/// Characters allowed right after an identifier or keyword
const STRING_BREAK: &[char] = &[' ', '(', ')', ',', '<', '>', '='];

/// Characters allowed right after an integer literal
const NUMBER_BREAK: &[char] = &[' ', ')', ','];

/// SQL Lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Scan the whole input. The sequence ends either with a terminator
    /// token or with the error token that stopped scanning.
    pub fn scan(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let done = token.is_eoc() || token.class == TokenClass::Error;
            tokens.push(token);
            if done {
                break;
            }
        }

        tokens
    }

    /// Scan the whole input, failing on the first error token
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let tokens = self.scan();
        match tokens.last() {
            Some(last) if last.class == TokenClass::Error => {
                Err(Error::InvalidToken(last.text.clone()))
            }
            _ => Ok(tokens),
        }
    }

    /// Get the next token from the input
    fn next_token(&mut self) -> Token {
        self.skip_blanks();

        if self.is_at_end() {
            return Token::terminator();
        }

        let ch = self.current_char();

        if ch.is_ascii_alphabetic() {
            return self.read_word();
        }

        if ch.is_ascii_digit() {
            return self.read_number();
        }

        if let Some(sym) = Symbol::from_char(ch) {
            self.advance();
            return Token::symbol(ch, sym);
        }

        if ch == '\'' {
            return self.read_string();
        }

        // not a word, number or symbol
        self.advance();
        Token::error(ch.to_string())
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_blanks(&mut self) {
        while !self.is_at_end() && self.current_char() == ' ' {
            self.advance();
        }
    }

    /// The character after a word or number must be in `allowed` (or the
    /// input must end). Otherwise that character is glued onto the lexeme.
    fn check_break(&mut self, lexeme: &mut String, allowed: &[char]) -> bool {
        if self.is_at_end() || allowed.contains(&self.current_char()) {
            return true;
        }
        lexeme.push(self.current_char());
        self.advance();
        false
    }

    /// Read an identifier or keyword
    fn read_word(&mut self) -> Token {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if !self.check_break(&mut value, STRING_BREAK) {
            return Token::error(value);
        }

        if let Some(kw) = Keyword::lookup(&value) {
            Token::keyword(value, kw)
        } else if value.len() <= MAX_IDENT_LEN {
            Token::identifier(value)
        } else {
            Token::error(value)
        }
    }

    /// Read an unsigned integer literal
    fn read_number(&mut self) -> Token {
        let mut value = String::new();

        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            value.push(self.current_char());
            self.advance();
        }

        if !self.check_break(&mut value, NUMBER_BREAK) {
            return Token::error(value);
        }

        Token::int_literal(value)
    }

    /// Read a string literal (single-quoted, no escapes)
    fn read_string(&mut self) -> Token {
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();
            self.advance();
            if ch == '\'' {
                return Token::string_literal(value);
            }
            value.push(ch);
        }

        Token::error(value)
    }
}

/// Tokenize a command string
pub fn tokenize(command: &str) -> Result<Vec<Token>> {
    Lexer::new(command).tokenize()
}

#[cfg(test)]
mod tests {
    use super::super::token::TokenValue;
    use super::*;

    fn values(input: &str) -> Vec<TokenValue> {
        Lexer::new(input).scan().iter().map(|t| t.value).collect()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            values("SELECT * FROM users"),
            vec![
                TokenValue::Keyword(Keyword::Select),
                TokenValue::Symbol(Symbol::Star),
                TokenValue::Keyword(Keyword::From),
                TokenValue::Identifier,
                TokenValue::Eoc,
            ]
        );
    }

    #[test]
    fn test_select_with_where() {
        let tokens = tokenize("select id, name from users where id = 1").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

        assert_eq!(
            texts,
            vec!["select", "id", ",", "name", "from", "users", "where", "id", "=", "1", ""]
        );
        assert_eq!(tokens[9].value, TokenValue::IntLiteral);
        assert_eq!(tokens[9].class, TokenClass::Constant);
    }

    #[test]
    fn test_create_table() {
        let tokens =
            tokenize("CREATE TABLE users (id int NOT NULL, name varchar(10))").unwrap();

        assert!(tokens[0].is_keyword(Keyword::Create));
        assert!(tokens[1].is_keyword(Keyword::Table));
        assert_eq!(tokens[2].class, TokenClass::Identifier);
        assert!(tokens[3].is_symbol(Symbol::LParen));
        assert_eq!(tokens[5].class, TokenClass::TypeName);
        assert_eq!(tokens[10].class, TokenClass::TypeName);
        assert!(tokens.last().unwrap().is_eoc());
    }

    #[test]
    fn test_function_names() {
        let tokens = tokenize("SELECT COUNT(*), avg(x) FROM t").unwrap();
        assert_eq!(tokens[1].class, TokenClass::FunctionName);
        assert_eq!(tokens[6].class, TokenClass::FunctionName);
    }

    #[test]
    fn test_string_literal() {
        let tokens = tokenize("INSERT INTO t VALUES ('hello world', 'x')").unwrap();

        assert_eq!(tokens[5].text, "hello world");
        assert_eq!(tokens[5].value, TokenValue::StringLiteral);
        assert_eq!(tokens[7].text, "x");
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::new("SELECT 'abc").scan();
        let last = tokens.last().unwrap();
        assert_eq!(last.class, TokenClass::Error);
        assert_eq!(last.text, "abc");

        assert!(matches!(
            tokenize("SELECT 'abc"),
            Err(Error::InvalidToken(text)) if text == "abc"
        ));
    }

    #[test]
    fn test_bad_character_after_word() {
        let tokens = Lexer::new("SELECT a; FROM t").scan();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text, "a;");
        assert_eq!(tokens[1].class, TokenClass::Error);
    }

    #[test]
    fn test_bad_character_after_number() {
        let tokens = Lexer::new("VALUES (12a)").scan();
        let last = tokens.last().unwrap();
        assert_eq!(last.text, "12a");
        assert_eq!(last.value, TokenValue::Invalid);
    }

    #[test]
    fn test_identifier_too_long() {
        assert!(tokenize("DROP TABLE abcdefghijklmnop").is_ok());
        assert!(matches!(
            tokenize("DROP TABLE abcdefghijklmnopq"),
            Err(Error::InvalidToken(_))
        ));
    }

    #[test]
    fn test_comparison_symbols() {
        let tokens = tokenize("a<1 AND b>2 OR c=3").unwrap();
        assert!(tokens[1].is_symbol(Symbol::Lt));
        assert!(tokens[5].is_symbol(Symbol::Gt));
        assert!(tokens[9].is_symbol(Symbol::Eq));
    }

    #[test]
    fn test_stray_character() {
        assert!(matches!(tokenize("SELECT * FROM t WHERE a ! 1"), Err(Error::InvalidToken(t)) if t == "!"));
    }
}
