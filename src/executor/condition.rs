//! WHERE clause conditions
//!
//! A WHERE clause is a flat chain of comparisons joined by AND/OR. The chain
//! is folded strictly left to right with no precedence.

use std::cmp::Ordering;

use super::row::{BoundColumn, RowSchema};
use crate::catalog::ColumnType;
use crate::error::{Error, Result};
use crate::sql::{Keyword, Symbol, TokenStream, TokenValue};
use crate::storage::Value;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Gt,
    IsNull,
    IsNotNull,
}

/// Link to the next condition in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    And,
    Or,
}

/// One parsed comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCondition {
    pub column_name: String,
    pub operator: CompareOp,
    /// Comparison value (`Null` for IS [NOT] NULL)
    pub literal: Value,
    /// How this condition joins the next one
    pub chain: Option<Chain>,
    /// Token index of the column name, for error reporting
    pub token_index: usize,
}

impl QueryCondition {
    /// Parse the condition chain following WHERE
    pub fn parse_chain(stream: &mut TokenStream) -> Result<Vec<QueryCondition>> {
        let mut conditions = Vec::new();

        loop {
            let mut condition = Self::parse_one(stream)?;

            condition.chain = if stream.eat_keyword(Keyword::And) {
                Some(Chain::And)
            } else if stream.eat_keyword(Keyword::Or) {
                Some(Chain::Or)
            } else {
                None
            };

            let more = condition.chain.is_some();
            conditions.push(condition);
            if !more {
                break;
            }
        }

        Ok(conditions)
    }

    fn parse_one(stream: &mut TokenStream) -> Result<QueryCondition> {
        if stream.at_end() {
            return Err(stream.reject(Error::InvalidStatement));
        }
        if !stream.current().is_name() {
            let name = stream.current().text.clone();
            return Err(stream.reject(Error::ColumnNotExist(name)));
        }
        let token_index = stream.position();
        let column_name = stream.next_token().text;

        let (operator, literal) = if stream.eat_keyword(Keyword::Is) {
            if stream.eat_keyword(Keyword::Null) {
                (CompareOp::IsNull, Value::Null)
            } else if stream.eat_keyword(Keyword::Not) {
                if !stream.eat_keyword(Keyword::Null) {
                    return Err(stream.reject(Error::InvalidStatement));
                }
                (CompareOp::IsNotNull, Value::Null)
            } else {
                return Err(stream.reject(Error::InvalidStatement));
            }
        } else {
            let operator = if stream.eat_symbol(Symbol::Eq) {
                CompareOp::Eq
            } else if stream.eat_symbol(Symbol::Lt) {
                CompareOp::Lt
            } else if stream.eat_symbol(Symbol::Gt) {
                CompareOp::Gt
            } else {
                return Err(stream.reject(Error::InvalidStatement));
            };
            (operator, parse_literal(stream, &column_name)?)
        };

        Ok(QueryCondition {
            column_name,
            operator,
            literal,
            chain: None,
            token_index,
        })
    }

    /// Resolve the column against `schema` and check the literal's kind
    pub fn bind(self, schema: &RowSchema, stream: &mut TokenStream) -> Result<BoundCondition> {
        let column = match schema.resolve(&self.column_name) {
            Some(column) => column,
            None => {
                return Err(stream.reject_at(
                    self.token_index,
                    Error::ColumnNotExist(self.column_name),
                ))
            }
        };

        let kind_ok = match (&self.literal, column.column_type) {
            (Value::Null, _) => true,
            (Value::Int(_), ColumnType::Int) => true,
            (Value::Str(_), ColumnType::Char | ColumnType::Varchar) => true,
            _ => false,
        };
        if !kind_ok {
            // point at the literal: name, operator, literal
            return Err(stream.reject_at(
                self.token_index + 2,
                Error::TypeMismatch(column.name),
            ));
        }

        Ok(BoundCondition {
            column,
            operator: self.operator,
            literal: self.literal,
            chain: self.chain,
        })
    }
}

fn parse_literal(stream: &mut TokenStream, column_name: &str) -> Result<Value> {
    let token = stream.current().clone();
    match token.value {
        TokenValue::IntLiteral => match token.text.parse::<i32>() {
            Ok(v) => {
                stream.advance();
                Ok(Value::Int(v))
            }
            Err(_) => Err(stream.reject(Error::TypeMismatch(column_name.to_string()))),
        },
        TokenValue::StringLiteral => {
            stream.advance();
            Ok(Value::Str(token.text))
        }
        _ => Err(stream.reject(Error::InvalidStatement)),
    }
}

/// A condition resolved against a row layout
#[derive(Debug, Clone)]
pub struct BoundCondition {
    pub column: BoundColumn,
    pub operator: CompareOp,
    pub literal: Value,
    pub chain: Option<Chain>,
}

impl BoundCondition {
    /// Evaluate against one row. IS [NOT] NULL looks only at the length
    /// byte; every other comparison is false on NULL.
    pub fn matches(&self, schema: &RowSchema, row: &[u8]) -> bool {
        let is_null = schema.field_len(row, &self.column) == 0;

        let ordering = match self.operator {
            CompareOp::IsNull => return is_null,
            CompareOp::IsNotNull => return !is_null,
            _ if is_null => return false,
            _ => match (&self.literal, schema.value(row, &self.column)) {
                (Value::Int(lit), Value::Int(v)) => v.cmp(lit),
                (Value::Str(lit), _) => schema
                    .field_bytes(row, &self.column)
                    .cmp(lit.as_bytes()),
                _ => return false,
            },
        };

        match self.operator {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::IsNull | CompareOp::IsNotNull => false,
        }
    }
}

/// Fold a condition chain left to right. An empty chain matches every row.
pub fn evaluate_chain(conditions: &[BoundCondition], schema: &RowSchema, row: &[u8]) -> bool {
    let mut iter = conditions.iter();
    let Some(first) = iter.next() else {
        return true;
    };

    let mut result = first.matches(schema, row);
    let mut chain = first.chain;
    for condition in iter {
        let current = condition.matches(schema, row);
        result = match chain {
            Some(Chain::And) => result && current,
            Some(Chain::Or) => result || current,
            None => result,
        };
        chain = condition.chain;
    }
    result
}

/// Parse an optional WHERE clause and bind it
pub fn parse_where(stream: &mut TokenStream, schema: &RowSchema) -> Result<Vec<BoundCondition>> {
    if !stream.eat_keyword(Keyword::Where) {
        return Ok(Vec::new());
    }
    let conditions = QueryCondition::parse_chain(stream)?;
    conditions
        .into_iter()
        .map(|c| c.bind(schema, stream))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{TableBuilder, TableDescriptor};
    use crate::sql::tokenize;
    use crate::storage::RecordLayout;

    fn table() -> TableDescriptor {
        TableBuilder::new("t")
            .int("a")
            .int("b")
            .int("c")
            .column("s", ColumnType::Varchar, 8)
            .descriptor()
            .unwrap()
    }

    fn bind(sql: &str) -> Result<Vec<BoundCondition>> {
        let schema = RowSchema::single(&table());
        let mut stream = TokenStream::new(tokenize(sql).unwrap());
        parse_where(&mut stream, &schema)
    }

    fn row(values: &[Value]) -> Vec<u8> {
        RecordLayout::new(&table()).encode(values)
    }

    fn eval(sql: &str, values: &[Value]) -> bool {
        let schema = RowSchema::single(&table());
        evaluate_chain(&bind(sql).unwrap(), &schema, &row(values))
    }

    #[test]
    fn test_parse_chain() {
        let mut stream =
            TokenStream::new(tokenize("a = 1 OR s IS NOT NULL AND b > 2").unwrap());
        let conditions = QueryCondition::parse_chain(&mut stream).unwrap();

        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[0].operator, CompareOp::Eq);
        assert_eq!(conditions[0].literal, Value::Int(1));
        assert_eq!(conditions[0].chain, Some(Chain::Or));
        assert_eq!(conditions[1].operator, CompareOp::IsNotNull);
        assert_eq!(conditions[1].chain, Some(Chain::And));
        assert_eq!(conditions[2].chain, None);
        assert!(stream.at_end());
    }

    #[test]
    fn test_left_to_right_fold() {
        // ((a=1) OR (b=2)) AND (c=3)
        let sql = "WHERE a = 1 OR b = 2 AND c = 3";
        let values = |a, b, c| [Value::Int(a), Value::Int(b), Value::Int(c), Value::Null];

        assert!(!eval(sql, &values(1, 0, 0)));
        assert!(eval(sql, &values(1, 0, 3)));
        assert!(eval(sql, &values(0, 2, 3)));
        assert!(!eval(sql, &values(0, 0, 3)));
    }

    #[test]
    fn test_null_handling() {
        let values = [Value::Null, Value::Int(1), Value::Int(1), Value::Null];

        assert!(eval("WHERE a IS NULL", &values));
        assert!(!eval("WHERE a IS NOT NULL", &values));
        assert!(!eval("WHERE a = 0", &values));
        assert!(!eval("WHERE a < 0", &values));
        assert!(!eval("WHERE s > 'a'", &values));
    }

    #[test]
    fn test_string_comparison() {
        let values = [Value::Int(0), Value::Int(0), Value::Int(0), Value::Str("abc".into())];

        assert!(eval("WHERE s = 'abc'", &values));
        assert!(!eval("WHERE s = 'ab'", &values));
        assert!(eval("WHERE s > 'ab'", &values));
        assert!(eval("WHERE s < 'abd'", &values));
        assert!(eval("WHERE a < 1 AND s > 'ABC'", &values));
    }

    #[test]
    fn test_negative_numbers_compare_signed() {
        let values = [Value::Int(-5), Value::Int(0), Value::Int(0), Value::Null];
        assert!(eval("WHERE a < 0", &values));
        assert!(!eval("WHERE a > 0", &values));
    }

    #[test]
    fn test_bind_errors() {
        assert!(matches!(bind("WHERE zz = 1"), Err(Error::ColumnNotExist(_))));
        assert!(matches!(bind("WHERE a = 'x'"), Err(Error::TypeMismatch(_))));
        assert!(matches!(bind("WHERE s = 5"), Err(Error::TypeMismatch(_))));
        assert!(matches!(bind("WHERE a IS 5"), Err(Error::InvalidStatement)));
        assert!(matches!(bind("WHERE a ( 5"), Err(Error::InvalidStatement)));
        assert!(matches!(bind("WHERE , = 5"), Err(Error::ColumnNotExist(_))));
        assert!(matches!(bind("WHERE"), Err(Error::InvalidStatement)));
        assert!(matches!(bind("WHERE a = 1 AND"), Err(Error::InvalidStatement)));
    }

    #[test]
    fn test_empty_where_matches_all() {
        assert!(bind("").unwrap().is_empty());
        assert!(eval("", &[Value::Null, Value::Null, Value::Null, Value::Null]));
    }
}
