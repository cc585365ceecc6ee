//! SELECT execution
//!
//! Parse projection, FROM, optional NATURAL JOIN, WHERE and ORDER BY, then
//! scan, join, filter, sort and project or aggregate. Every statement is a
//! full scan over the table files.

use tracing::{debug, warn};

use super::condition::{evaluate_chain, BoundCondition, QueryCondition};
use super::result::{AggregateFunction, AggregateValue, QueryResult};
use super::row::{BoundColumn, RowSchema};
use crate::catalog::{Catalog, ColumnType, TableDescriptor};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::sql::{Keyword, Symbol, TokenClass, TokenStream};
use crate::storage::{TableFile, Value};

/// Warning printed when NATURAL JOIN finds nothing to join on
pub const NO_COMMON_COLUMNS: &str = "Warning: No common columns found for NATURAL JOIN";

/// A name together with the token it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    pub name: String,
    pub token_index: usize,
}

impl NameRef {
    fn take(stream: &mut TokenStream) -> Self {
        let token_index = stream.position();
        Self {
            name: stream.next_token().text,
            token_index,
        }
    }
}

/// One aggregate call in the select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateCall {
    pub function: AggregateFunction,
    /// Argument column; `None` for COUNT(*)
    pub column: Option<NameRef>,
}

/// Select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`
    All,
    /// Explicit column list
    Columns(Vec<NameRef>),
    /// One or more aggregate calls
    Aggregates(Vec<AggregateCall>),
}

/// ORDER BY clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: NameRef,
    pub descending: bool,
}

/// A parsed SELECT statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub projection: Projection,
    pub table: NameRef,
    pub join: Option<NameRef>,
    pub conditions: Vec<QueryCondition>,
    pub order_by: Option<OrderBy>,
}

impl SelectQuery {
    /// Parse everything after the SELECT keyword
    pub fn parse(stream: &mut TokenStream) -> Result<Self> {
        let projection = parse_projection(stream)?;

        if !stream.eat_keyword(Keyword::From) {
            return Err(stream.reject(Error::InvalidStatement));
        }
        if !stream.current().is_name() {
            return Err(stream.reject(Error::InvalidTableName));
        }
        let table = NameRef::take(stream);

        let join = if stream.eat_keyword(Keyword::Natural) {
            if !stream.eat_keyword(Keyword::Join) {
                return Err(stream.reject(Error::InvalidStatement));
            }
            if !stream.current().is_name() {
                return Err(stream.reject(Error::InvalidTableName));
            }
            Some(NameRef::take(stream))
        } else {
            None
        };

        let conditions = if stream.eat_keyword(Keyword::Where) {
            QueryCondition::parse_chain(stream)?
        } else {
            Vec::new()
        };

        let order_by = if stream.eat_keyword(Keyword::Order) {
            if !stream.eat_keyword(Keyword::By) {
                return Err(stream.reject(Error::InvalidStatement));
            }
            if !stream.current().is_name() {
                return Err(stream.reject(Error::InvalidColumnName));
            }
            let column = NameRef::take(stream);
            let descending = stream.eat_keyword(Keyword::Desc);
            Some(OrderBy { column, descending })
        } else {
            None
        };

        if !stream.at_end() {
            return Err(stream.reject(Error::InvalidStatement));
        }

        Ok(Self {
            projection,
            table,
            join,
            conditions,
            order_by,
        })
    }
}

fn parse_projection(stream: &mut TokenStream) -> Result<Projection> {
    if stream.eat_symbol(Symbol::Star) {
        return Ok(Projection::All);
    }

    if stream.current().class == TokenClass::FunctionName {
        let mut calls = Vec::new();
        loop {
            calls.push(parse_aggregate(stream)?);
            if !stream.eat_symbol(Symbol::Comma) {
                break;
            }
            if stream.current().class != TokenClass::FunctionName {
                return Err(stream.reject(Error::InvalidSelectDefinition));
            }
        }
        return Ok(Projection::Aggregates(calls));
    }

    let mut columns = Vec::new();
    loop {
        if !stream.current().is_name() {
            return Err(stream.reject(Error::InvalidSelectDefinition));
        }
        columns.push(NameRef::take(stream));
        if !stream.eat_symbol(Symbol::Comma) {
            break;
        }
    }
    Ok(Projection::Columns(columns))
}

fn parse_aggregate(stream: &mut TokenStream) -> Result<AggregateCall> {
    let function = match stream.current().as_keyword() {
        Some(Keyword::Sum) => AggregateFunction::Sum,
        Some(Keyword::Avg) => AggregateFunction::Avg,
        Some(Keyword::Count) => AggregateFunction::Count,
        _ => return Err(stream.reject(Error::InvalidSelectDefinition)),
    };
    stream.advance();

    if !stream.eat_symbol(Symbol::LParen) {
        return Err(stream.reject(Error::InvalidSelectDefinition));
    }

    let column = if stream.check_symbol(Symbol::Star) {
        if function != AggregateFunction::Count {
            return Err(stream.reject(Error::InvalidSelectDefinition));
        }
        stream.advance();
        None
    } else if stream.current().is_name() {
        Some(NameRef::take(stream))
    } else {
        return Err(stream.reject(Error::InvalidSelectDefinition));
    };

    if !stream.eat_symbol(Symbol::RParen) {
        return Err(stream.reject(Error::InvalidSelectDefinition));
    }

    Ok(AggregateCall { function, column })
}

/// Aggregate call with its argument resolved
struct BoundAggregate {
    function: AggregateFunction,
    column: Option<BoundColumn>,
}

/// Look up a table, marking its name token when missing
fn lookup_table(
    catalog: &Catalog,
    name: &NameRef,
    stream: &mut TokenStream,
) -> Result<TableDescriptor> {
    match catalog.find(&name.name) {
        Some(table) => Ok(table.clone()),
        None => Err(stream.reject_at(name.token_index, Error::TableNotExist(name.name.clone()))),
    }
}

fn resolve(schema: &RowSchema, name: &NameRef, stream: &mut TokenStream) -> Result<BoundColumn> {
    match schema.resolve(&name.name) {
        Some(column) => Ok(column),
        None => Err(stream.reject_at(name.token_index, Error::ColumnNotExist(name.name.clone()))),
    }
}

/// Column pairs (left index, right index) sharing a name
pub fn common_columns(left: &TableDescriptor, right: &TableDescriptor) -> Vec<(usize, usize)> {
    left.columns
        .iter()
        .enumerate()
        .filter_map(|(li, col)| right.column_index(&col.name).map(|ri| (li, ri)))
        .collect()
}

/// Join key equality: NULL matches NULL, NULL never matches a value, values
/// match when their bytes are identical.
fn join_fields_match(
    schema: &RowSchema,
    row: &[u8],
    left: &BoundColumn,
    right: &BoundColumn,
) -> bool {
    let left_null = schema.field_len(row, left) == 0;
    let right_null = schema.field_len(row, right) == 0;
    match (left_null, right_null) {
        (true, true) => true,
        (false, false) => schema.field_bytes(row, left) == schema.field_bytes(row, right),
        _ => false,
    }
}

/// Execute a parsed SELECT
pub fn execute_select(
    catalog: &Catalog,
    config: &Config,
    stream: &mut TokenStream,
    query: SelectQuery,
) -> Result<QueryResult> {
    let left = lookup_table(catalog, &query.table, stream)?;
    let right = match &query.join {
        Some(name) => Some(lookup_table(catalog, name, stream)?),
        None => None,
    };

    let schema = match &right {
        Some(right) => RowSchema::joined(&left, right),
        None => RowSchema::single(&left),
    };

    // Resolve every name before touching the data files
    let aggregates = match &query.projection {
        Projection::Aggregates(calls) => Some(bind_aggregates(calls, &schema, stream)?),
        _ => None,
    };

    let conditions = query
        .conditions
        .into_iter()
        .map(|c| c.bind(&schema, stream))
        .collect::<Result<Vec<BoundCondition>>>()?;

    let order_by = match &query.order_by {
        Some(order) => Some((resolve(&schema, &order.column, stream)?, order.descending)),
        None => None,
    };

    let common = match &right {
        Some(right) => common_columns(&left, right),
        None => Vec::new(),
    };

    let output = match &query.projection {
        Projection::All => star_columns(&schema, right.is_some(), &common),
        Projection::Columns(names) => names
            .iter()
            .map(|name| resolve(&schema, name, stream))
            .collect::<Result<Vec<_>>>()?,
        Projection::Aggregates(_) => Vec::new(),
    };

    let mut warning = None;
    let mut rows = Vec::new();

    let mut left_file = TableFile::open(config.table_path(&left.name), &left)?;
    let left_records = left_file.scan()?;

    match &right {
        None => {
            for record in left_records {
                if evaluate_chain(&conditions, &schema, &record) {
                    rows.push(record);
                }
            }
        }
        Some(right) => {
            let mut right_file = TableFile::open(config.table_path(&right.name), right)?;
            let right_records = right_file.scan()?;

            if common.is_empty() {
                warn!(left = %left.name, right = %right.name, "no common columns for NATURAL JOIN");
                warning = Some(NO_COMMON_COLUMNS.to_string());
            } else {
                let keys: Vec<(BoundColumn, BoundColumn)> = common
                    .iter()
                    .map(|&(li, ri)| (schema.column(0, li), schema.column(1, ri)))
                    .collect();

                for l in &left_records {
                    for r in &right_records {
                        let mut row = Vec::with_capacity(l.len() + r.len());
                        row.extend_from_slice(l);
                        row.extend_from_slice(r);

                        let joined = keys
                            .iter()
                            .all(|(lk, rk)| join_fields_match(&schema, &row, lk, rk));
                        if joined && evaluate_chain(&conditions, &schema, &row) {
                            rows.push(row);
                        }
                    }
                }
            }
        }
    }

    debug!(table = %left.name, matched = rows.len(), "rows selected");

    if let Some((column, descending)) = &order_by {
        rows.sort_unstable_by(|a, b| {
            let ordering = schema.value(a, column).cmp(&schema.value(b, column));
            if *descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    let result = match aggregates {
        Some(aggregates) => QueryResult::with_aggregates(
            aggregates
                .iter()
                .map(|agg| compute_aggregate(agg, &schema, &rows))
                .collect(),
        ),
        None => QueryResult::with_rows(
            output.iter().map(|c| c.output()).collect(),
            rows.iter()
                .map(|row| output.iter().map(|c| schema.value(row, c)).collect())
                .collect(),
        ),
    };
    Ok(match warning {
        Some(warning) => result.warning(warning),
        None => result,
    })
}

/// `*` output: for a join, the common columns once (from the left table),
/// then the rest of the left table, then the rest of the right table
fn star_columns(schema: &RowSchema, joined: bool, common: &[(usize, usize)]) -> Vec<BoundColumn> {
    if !joined {
        return schema.columns_of(0);
    }

    let mut columns: Vec<BoundColumn> = common
        .iter()
        .map(|&(li, _)| schema.column(0, li))
        .collect();
    columns.extend(
        schema
            .columns_of(0)
            .into_iter()
            .filter(|c| !common.iter().any(|&(li, _)| li == c.index)),
    );
    columns.extend(
        schema
            .columns_of(1)
            .into_iter()
            .filter(|c| !common.iter().any(|&(_, ri)| ri == c.index)),
    );
    columns
}

fn bind_aggregates(
    calls: &[AggregateCall],
    schema: &RowSchema,
    stream: &mut TokenStream,
) -> Result<Vec<BoundAggregate>> {
    let mut bound = Vec::with_capacity(calls.len());
    for call in calls {
        let column = match &call.column {
            Some(name) => {
                let column = resolve(schema, name, stream)?;
                if call.function != AggregateFunction::Count && column.column_type != ColumnType::Int {
                    return Err(stream.reject_at(name.token_index, Error::InvalidSelectDefinition));
                }
                Some(column)
            }
            None => None,
        };
        bound.push(BoundAggregate {
            function: call.function,
            column,
        });
    }
    Ok(bound)
}

fn compute_aggregate(agg: &BoundAggregate, schema: &RowSchema, rows: &[Vec<u8>]) -> AggregateValue {
    let Some(column) = &agg.column else {
        return AggregateValue {
            function: agg.function,
            value: rows.len() as i64,
        };
    };

    let mut count: i64 = 0;
    let mut sum: i64 = 0;
    for row in rows {
        if schema.field_len(row, column) == 0 {
            continue;
        }
        count += 1;
        if let Value::Int(v) = schema.value(row, column) {
            sum += v as i64;
        }
    }

    let value = match agg.function {
        AggregateFunction::Count => count,
        AggregateFunction::Sum => sum,
        AggregateFunction::Avg if count > 0 => sum / count,
        AggregateFunction::Avg => 0,
    };
    AggregateValue {
        function: agg.function,
        value,
    }
}
