//! Result row layout
//!
//! A result row is the raw bytes of one table record, or for a NATURAL JOIN
//! the left record followed by the right one. `RowSchema` resolves column
//! names to fields inside such a row.

use crate::catalog::{ColumnType, TableDescriptor};
use crate::storage::{RecordLayout, Value};

use super::result::OutputColumn;

/// One table's record inside a result row
#[derive(Debug, Clone)]
struct Segment {
    table: TableDescriptor,
    layout: RecordLayout,
    /// Offset of this record inside the row
    base: usize,
}

/// A column resolved against a `RowSchema`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundColumn {
    pub segment: usize,
    pub index: usize,
    pub name: String,
    pub column_type: ColumnType,
    pub length: u32,
}

impl BoundColumn {
    pub fn output(&self) -> OutputColumn {
        OutputColumn {
            name: self.name.clone(),
            column_type: self.column_type,
            length: self.length,
        }
    }
}

/// Layout of the rows a statement works on
#[derive(Debug, Clone)]
pub struct RowSchema {
    segments: Vec<Segment>,
}

impl RowSchema {
    /// Rows of a single table
    pub fn single(table: &TableDescriptor) -> Self {
        Self {
            segments: vec![Segment {
                table: table.clone(),
                layout: RecordLayout::new(table),
                base: 0,
            }],
        }
    }

    /// Left record followed by right record
    pub fn joined(left: &TableDescriptor, right: &TableDescriptor) -> Self {
        let left_layout = RecordLayout::new(left);
        let base = left_layout.record_size();
        Self {
            segments: vec![
                Segment {
                    table: left.clone(),
                    layout: left_layout,
                    base: 0,
                },
                Segment {
                    table: right.clone(),
                    layout: RecordLayout::new(right),
                    base,
                },
            ],
        }
    }

    /// Column `index` of table `segment`
    pub fn column(&self, segment: usize, index: usize) -> BoundColumn {
        let column = &self.segments[segment].table.columns[index];
        BoundColumn {
            segment,
            index,
            name: column.name.clone(),
            column_type: column.column_type,
            length: column.length,
        }
    }

    /// Resolve a column name, left table first
    pub fn resolve(&self, name: &str) -> Option<BoundColumn> {
        self.segments.iter().enumerate().find_map(|(segment, s)| {
            s.table
                .column_index(name)
                .map(|index| self.column(segment, index))
        })
    }

    /// Every column of table `segment`, in declaration order
    pub fn columns_of(&self, segment: usize) -> Vec<BoundColumn> {
        (0..self.segments[segment].table.columns.len())
            .map(|index| self.column(segment, index))
            .collect()
    }

    fn record<'r>(&self, row: &'r [u8], segment: usize) -> &'r [u8] {
        let s = &self.segments[segment];
        &row[s.base..s.base + s.layout.record_size()]
    }

    /// Length byte of a field (0 = NULL)
    pub fn field_len(&self, row: &[u8], column: &BoundColumn) -> u8 {
        let s = &self.segments[column.segment];
        s.layout.field_len(self.record(row, column.segment), column.index)
    }

    /// Payload bytes of a field over its true length
    pub fn field_bytes<'r>(&self, row: &'r [u8], column: &BoundColumn) -> &'r [u8] {
        let s = &self.segments[column.segment];
        s.layout
            .field_bytes(self.record(row, column.segment), column.index)
    }

    /// Decode a field
    pub fn value(&self, row: &[u8], column: &BoundColumn) -> Value {
        let s = &self.segments[column.segment];
        s.layout
            .decode_field(self.record(row, column.segment), column.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableBuilder;

    #[test]
    fn test_joined_row_resolution() {
        let left = TableBuilder::new("a")
            .int("id")
            .column("x", ColumnType::Char, 2)
            .descriptor()
            .unwrap();
        let right = TableBuilder::new("b")
            .int("ID")
            .int("y")
            .descriptor()
            .unwrap();
        let schema = RowSchema::joined(&left, &right);

        let mut row = RecordLayout::new(&left).encode(&[Value::Int(1), Value::Str("hi".into())]);
        row.extend(RecordLayout::new(&right).encode(&[Value::Int(2), Value::Int(3)]));

        // left table wins for shared names
        let id = schema.resolve("id").unwrap();
        assert_eq!(id.segment, 0);
        assert_eq!(schema.value(&row, &id), Value::Int(1));

        let y = schema.resolve("Y").unwrap();
        assert_eq!((y.segment, y.index), (1, 1));
        assert_eq!(schema.value(&row, &y), Value::Int(3));

        let x = schema.resolve("x").unwrap();
        assert_eq!(schema.field_bytes(&row, &x), b"hi");
        assert!(schema.resolve("z").is_none());
    }
}
