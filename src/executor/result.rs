//! Statement results and their console text

use serde::Serialize;
use std::fmt;

use crate::catalog::ColumnType;
use crate::storage::Value;

/// Narrowest display width of an INT column
const MIN_INT_WIDTH: usize = 5;

/// Display width of an aggregate column
const AGGREGATE_WIDTH: usize = 10;

/// A column of a SELECT result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub length: u32,
}

impl OutputColumn {
    /// Display width: the name, widened to 5 for INT or to the declared
    /// length for strings
    pub fn width(&self) -> usize {
        let floor = match self.column_type {
            ColumnType::Int => MIN_INT_WIDTH,
            _ => self.length as usize,
        };
        self.name.len().max(floor)
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Sum => write!(f, "SUM"),
            AggregateFunction::Avg => write!(f, "AVG"),
            AggregateFunction::Count => write!(f, "COUNT"),
        }
    }
}

/// One computed aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateValue {
    pub function: AggregateFunction,
    pub value: i64,
}

/// Data produced by a SELECT
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResultSet {
    /// Not a query
    None,
    /// Projected rows
    Rows {
        columns: Vec<OutputColumn>,
        rows: Vec<Vec<Value>>,
    },
    /// Aggregate values, one per call in the select list
    Aggregates(Vec<AggregateValue>),
}

/// Query result
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub result_set: ResultSet,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
    /// Non-fatal condition printed ahead of the result
    pub warning: Option<String>,
}

impl QueryResult {
    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            result_set: ResultSet::None,
            affected_rows: 0,
            message: Some(message.into()),
            warning: None,
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            ..Self::with_message(message)
        }
    }

    /// Create a row result
    pub fn with_rows(columns: Vec<OutputColumn>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            affected_rows: 0,
            result_set: ResultSet::Rows { columns, rows },
            message: None,
            warning: None,
        }
    }

    /// Create an aggregate result
    pub fn with_aggregates(values: Vec<AggregateValue>) -> Self {
        Self {
            affected_rows: 0,
            result_set: ResultSet::Aggregates(values),
            message: None,
            warning: None,
        }
    }

    /// Attach a warning line
    pub fn warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    /// Number of rows a SELECT returned
    pub fn row_count(&self) -> usize {
        match &self.result_set {
            ResultSet::Rows { rows, .. } => rows.len(),
            _ => 0,
        }
    }
}

fn format_cell(value: &Value, width: usize) -> String {
    match value {
        Value::Int(v) => format!("{:>width$} ", v, width = width),
        other => format!("{:<width$} ", other, width = width),
    }
}

fn render_rows(columns: &[OutputColumn], rows: &[Vec<Value>]) -> Vec<String> {
    let widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    let mut lines = Vec::with_capacity(rows.len() + 4);

    lines.push(
        columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$} ", c.name, width = *w))
            .collect(),
    );
    lines.push(widths.iter().map(|w| format!("{} ", "-".repeat(*w))).collect());

    for row in rows {
        lines.push(
            row.iter()
                .zip(&widths)
                .map(|(v, w)| format_cell(v, *w))
                .collect(),
        );
    }

    lines.push(String::new());
    lines.push(format!(" {} record(s) selected.", rows.len()));
    lines
}

fn render_aggregates(values: &[AggregateValue]) -> Vec<String> {
    let header = values
        .iter()
        .map(|a| format!("{:<width$}", a.function.to_string(), width = AGGREGATE_WIDTH))
        .collect::<Vec<_>>()
        .join(" ");
    let separator = vec!["-".repeat(AGGREGATE_WIDTH); values.len()].join(" ");
    let row = values
        .iter()
        .map(|a| format!("{:>width$}", a.value, width = AGGREGATE_WIDTH))
        .collect::<Vec<_>>()
        .join(" ");
    vec![header, separator, row]
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();

        if let Some(warning) = &self.warning {
            lines.push(warning.clone());
        }
        if let Some(message) = &self.message {
            lines.push(message.clone());
        }
        match &self.result_set {
            ResultSet::None => {}
            ResultSet::Rows { columns, rows } => lines.extend(render_rows(columns, rows)),
            ResultSet::Aggregates(values) => lines.extend(render_aggregates(values)),
        }

        write!(f, "{}", lines.join("\n"))
    }
}
