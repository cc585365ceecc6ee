//! Record codec for flatdb
//!
//! A record is a fixed-size byte buffer holding one field per column: a
//! length byte (0 means NULL) followed by the column's payload region. INT
//! payloads are little-endian `i32`; string payloads are zero-padded.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::catalog::{ColumnType, TableDescriptor};

/// A field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Integer value (32-bit)
    Int(i32),
    /// String value
    Str(String),
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// NULL sorts lowest; strings compare bytewise over their true length
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::Int(_), Value::Str(_)) => Ordering::Less,
            (Value::Str(_), Value::Int(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.pad("NULL"),
            Value::Int(v) => fmt::Display::fmt(v, f),
            Value::Str(s) => f.pad(s),
        }
    }
}

/// Location of one field inside a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    /// Offset of the length byte
    pub offset: usize,
    pub column_type: ColumnType,
    /// Payload capacity
    pub length: usize,
}

/// Byte layout of one table's records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    fields: Vec<FieldSlot>,
    record_size: usize,
}

impl RecordLayout {
    /// Compute the layout for a table: fields packed in column order, total
    /// rounded up to a multiple of 4.
    pub fn new(table: &TableDescriptor) -> Self {
        let mut fields = Vec::with_capacity(table.columns.len());
        let mut offset = 0;

        for column in &table.columns {
            fields.push(FieldSlot {
                offset,
                column_type: column.column_type,
                length: column.length as usize,
            });
            offset += column.field_width();
        }

        Self {
            fields,
            record_size: round4(offset),
        }
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Encode a full row of values into a new record
    pub fn encode(&self, values: &[Value]) -> Vec<u8> {
        let mut record = vec![0u8; self.record_size];
        for (idx, value) in values.iter().enumerate().take(self.fields.len()) {
            self.write_field(&mut record, idx, value);
        }
        record
    }

    /// Overwrite one field. Strings longer than the column are cut to fit.
    pub fn write_field(&self, record: &mut [u8], idx: usize, value: &Value) {
        let slot = self.fields[idx];
        let region = &mut record[slot.offset..slot.offset + 1 + slot.length];
        region.fill(0);

        match value {
            Value::Null => {}
            Value::Int(v) => {
                region[0] = 4;
                LittleEndian::write_i32(&mut region[1..5], *v);
            }
            Value::Str(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len().min(slot.length);
                region[0] = len as u8;
                region[1..1 + len].copy_from_slice(&bytes[..len]);
            }
        }
    }

    /// Length byte of a field (0 = NULL)
    pub fn field_len(&self, record: &[u8], idx: usize) -> u8 {
        record[self.fields[idx].offset]
    }

    /// Payload bytes of a field over its true length
    pub fn field_bytes<'a>(&self, record: &'a [u8], idx: usize) -> &'a [u8] {
        let slot = &self.fields[idx];
        let len = (record[slot.offset] as usize).min(slot.length);
        &record[slot.offset + 1..slot.offset + 1 + len]
    }

    /// Decode one field
    pub fn decode_field(&self, record: &[u8], idx: usize) -> Value {
        if self.field_len(record, idx) == 0 {
            return Value::Null;
        }
        let slot = &self.fields[idx];
        match slot.column_type {
            ColumnType::Int => {
                let start = slot.offset + 1;
                Value::Int(LittleEndian::read_i32(&record[start..start + 4]))
            }
            ColumnType::Char | ColumnType::Varchar => {
                Value::Str(String::from_utf8_lossy(self.field_bytes(record, idx)).into_owned())
            }
        }
    }

    /// Decode every field of a record
    pub fn decode(&self, record: &[u8]) -> Vec<Value> {
        (0..self.fields.len())
            .map(|idx| self.decode_field(record, idx))
            .collect()
    }
}

/// Round up to a multiple of 4
pub fn round4(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableBuilder;

    fn layout() -> RecordLayout {
        let table = TableBuilder::new("t1")
            .int("id")
            .column("name", ColumnType::Char, 10)
            .descriptor()
            .unwrap();
        RecordLayout::new(&table)
    }

    #[test]
    fn test_record_size_is_rounded() {
        // (1 + 4) + (1 + 10) = 16
        assert_eq!(layout().record_size(), 16);

        let table = TableBuilder::new("t2")
            .int("a")
            .column("b", ColumnType::Varchar, 3)
            .descriptor()
            .unwrap();
        // 5 + 4 = 9 -> 12
        assert_eq!(RecordLayout::new(&table).record_size(), 12);
        assert_eq!(round4(0), 0);
        assert_eq!(round4(13), 16);
    }

    #[test]
    fn test_field_encoding() {
        let layout = layout();
        let record = layout.encode(&[Value::Int(-2), Value::Str("abc".into())]);

        assert_eq!(record.len(), 16);
        assert_eq!(record[0], 4);
        assert_eq!(&record[1..5], &(-2i32).to_le_bytes());
        assert_eq!(record[5], 3);
        assert_eq!(&record[6..9], b"abc");
        assert!(record[9..].iter().all(|&b| b == 0));

        assert_eq!(
            layout.decode(&record),
            vec![Value::Int(-2), Value::Str("abc".into())]
        );
    }

    #[test]
    fn test_null_fields() {
        let layout = layout();
        let mut record = layout.encode(&[Value::Int(7), Value::Null]);

        assert_eq!(layout.field_len(&record, 1), 0);
        assert_eq!(layout.decode_field(&record, 1), Value::Null);

        layout.write_field(&mut record, 0, &Value::Null);
        assert_eq!(layout.decode_field(&record, 0), Value::Null);
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn test_value_ordering() {
        let mut values = vec![
            Value::Int(3),
            Value::Null,
            Value::Int(-1),
        ];
        values.sort();
        assert_eq!(values, vec![Value::Null, Value::Int(-1), Value::Int(3)]);

        assert!(Value::Str("ab".into()) < Value::Str("abc".into()));
        assert!(Value::Str("B".into()) < Value::Str("a".into()));
    }
}
