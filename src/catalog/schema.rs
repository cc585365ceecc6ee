//! Table descriptors for flatdb
//!
//! This module defines table and column descriptors and their binary catalog
//! entry format.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

use super::types::{ColumnType, INT_WIDTH, MAX_STRING_LEN};
use crate::error::{Error, Result};

/// Maximum number of columns per table
pub const MAX_NUM_COL: usize = 16;

/// Width of the NUL-padded name fields in catalog entries
pub const NAME_FIELD_LEN: usize = 20;

/// Size of the fixed part of a table entry
pub const TABLE_ENTRY_SIZE: usize = 36;

/// Size of one column entry
pub const COLUMN_ENTRY_SIZE: usize = 36;

/// Column definition in a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Column position (0-indexed)
    pub id: u32,
    /// Column type
    pub column_type: ColumnType,
    /// Payload length: 4 for INT, declared length for strings
    pub length: u32,
    /// Is NULL rejected?
    pub not_null: bool,
}

impl ColumnDescriptor {
    /// Create a new column. INT columns always get a payload length of 4.
    pub fn new(name: impl Into<String>, column_type: ColumnType, length: u32) -> Self {
        let length = match column_type {
            ColumnType::Int => INT_WIDTH,
            _ => length,
        };
        Self {
            name: name.into(),
            id: 0,
            column_type,
            length,
            not_null: false,
        }
    }

    /// Set not-null flag
    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    /// Encoded width of this column's field: length byte plus payload
    pub fn field_width(&self) -> usize {
        1 + self.length as usize
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        put_name(buf, &self.name);
        put_u32(buf, self.id);
        put_u32(buf, self.column_type.code());
        put_u32(buf, self.length);
        put_u32(buf, self.not_null as u32);
    }

    fn decode(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let name = get_name(cursor)?;
        let id = get_u32(cursor)?;
        let column_type = ColumnType::from_code(get_u32(cursor)?)?;
        let length = get_u32(cursor)?;
        let not_null = get_u32(cursor)? != 0;

        let length_ok = match column_type {
            ColumnType::Int => length == INT_WIDTH,
            _ => (1..=MAX_STRING_LEN).contains(&length),
        };
        if !length_ok {
            return Err(Error::CatalogCorruption(format!(
                "column '{}' has invalid length {}",
                name, length
            )));
        }

        Ok(Self {
            name,
            id,
            column_type,
            length,
            not_null,
        })
    }
}

/// Table descriptor - name plus ordered column list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnDescriptor>,
    /// Entry flags (always written as 0)
    pub flags: u32,
}

impl TableDescriptor {
    /// Create a descriptor with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            flags: 0,
        }
    }

    /// Append a column, assigning its position. Names must be unique
    /// (case-insensitively) and the column count is capped.
    pub fn add_column(&mut self, mut column: ColumnDescriptor) -> Result<()> {
        if self.find_column(&column.name).is_some() {
            return Err(Error::DuplicateColumnName(column.name));
        }
        if self.columns.len() >= MAX_NUM_COL {
            return Err(Error::MaxColumnExceeded(MAX_NUM_COL));
        }
        column.id = self.columns.len() as u32;
        self.columns.push(column);
        Ok(())
    }

    /// Byte size of this descriptor's catalog entry
    pub fn entry_size(&self) -> u32 {
        (TABLE_ENTRY_SIZE + self.columns.len() * COLUMN_ENTRY_SIZE) as u32
    }

    /// Get column index by name (case-insensitive)
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get column by name (case-insensitive)
    pub fn find_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    /// Serialize to a catalog entry
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.entry_size() as usize);

        put_u32(&mut buf, self.entry_size());
        put_name(&mut buf, &self.name);
        put_u32(&mut buf, self.columns.len() as u32);
        put_u32(&mut buf, TABLE_ENTRY_SIZE as u32);
        put_u32(&mut buf, self.flags);

        for column in &self.columns {
            column.encode(&mut buf);
        }
        buf
    }

    /// Deserialize one catalog entry from the front of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let entry_size = get_u32(&mut cursor)? as usize;
        let name = get_name(&mut cursor)?;
        let num_columns = get_u32(&mut cursor)? as usize;
        let cd_offset = get_u32(&mut cursor)? as usize;
        let flags = get_u32(&mut cursor)?;

        if num_columns > MAX_NUM_COL
            || cd_offset != TABLE_ENTRY_SIZE
            || entry_size != TABLE_ENTRY_SIZE + num_columns * COLUMN_ENTRY_SIZE
            || entry_size > bytes.len()
        {
            return Err(Error::CatalogCorruption(format!(
                "bad entry header for table '{}'",
                name
            )));
        }

        let mut columns = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            columns.push(ColumnDescriptor::decode(&mut cursor)?);
        }

        Ok(Self {
            name,
            columns,
            flags,
        })
    }
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    let mut field = [0u8; 4];
    LittleEndian::write_u32(&mut field, value);
    buf.extend_from_slice(&field);
}

fn put_name(buf: &mut Vec<u8>, name: &str) {
    let mut field = [0u8; NAME_FIELD_LEN];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_FIELD_LEN - 1);
    field[..len].copy_from_slice(&bytes[..len]);
    buf.extend_from_slice(&field);
}

fn get_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::CatalogCorruption("truncated entry".to_string()))
}

fn get_name(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let mut field = [0u8; NAME_FIELD_LEN];
    cursor
        .read_exact(&mut field)
        .map_err(|_| Error::CatalogCorruption("truncated entry".to_string()))?;
    let len = field.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
    Ok(String::from_utf8_lossy(&field[..len]).into_owned())
}
