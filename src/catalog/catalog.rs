//! System Catalog for flatdb
//!
//! The catalog is a single flat file: an 8-byte header (`total_size`,
//! `table_count`) followed by the concatenated table entries. An empty catalog
//! still carries one zeroed entry slot after the header. Every mutation
//! rewrites the whole file and reloads the in-memory copy from disk.

use byteorder::{ByteOrder, LittleEndian};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::schema::{ColumnDescriptor, TableDescriptor, TABLE_ENTRY_SIZE};
use super::types::ColumnType;
use crate::error::{Error, Result};

/// Size of the catalog file header
pub const CATALOG_HEADER_SIZE: usize = 8;

/// Size of an empty catalog file (header plus placeholder slot)
pub const EMPTY_CATALOG_SIZE: usize = CATALOG_HEADER_SIZE + TABLE_ENTRY_SIZE;

/// System Catalog - all table descriptors, backed by the catalog file
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
    tables: Vec<TableDescriptor>,
}

impl Catalog {
    /// Load the catalog file, creating an empty one if it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!(path = %path.display(), "creating empty catalog");
            write_image(&path, &empty_image())?;
        }

        let mut catalog = Self {
            path,
            tables: Vec::new(),
        };
        catalog.refresh()?;
        Ok(catalog)
    }

    /// Path of the catalog file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find a table by name (case-insensitive)
    pub fn find(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Get a table by name
    pub fn get_table(&self, name: &str) -> Result<&TableDescriptor> {
        self.find(name)
            .ok_or_else(|| Error::TableNotExist(name.to_string()))
    }

    /// All tables in catalog order
    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    /// Check if the catalog holds no tables
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// `total_size` as it is written to the catalog header
    pub fn total_size(&self) -> u32 {
        if self.tables.is_empty() {
            EMPTY_CATALOG_SIZE as u32
        } else {
            CATALOG_HEADER_SIZE as u32 + self.tables.iter().map(|t| t.entry_size()).sum::<u32>()
        }
    }

    /// Add a table and rewrite the catalog file. The first table overlays
    /// the placeholder slot.
    pub fn add(&mut self, table: TableDescriptor) -> Result<()> {
        if self.find(&table.name).is_some() {
            return Err(Error::DuplicateTableName(table.name));
        }

        let old = self.image();
        let keep = if self.tables.is_empty() {
            CATALOG_HEADER_SIZE
        } else {
            old.len()
        };

        let entry = table.to_bytes();
        let mut image = Vec::with_capacity(keep + entry.len());
        image.extend_from_slice(&old[..keep]);
        image.extend_from_slice(&entry);
        set_header(&mut image, self.tables.len() as u32 + 1);

        write_image(&self.path, &image)?;
        self.refresh()?;
        info!(table = %table.name, total_size = self.total_size(), "catalog entry added");
        Ok(())
    }

    /// Remove a table and rewrite the catalog with its entry cut out.
    /// Returns the removed descriptor.
    pub fn remove(&mut self, name: &str) -> Result<TableDescriptor> {
        let index = self
            .tables
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::TableNotExist(name.to_string()))?;

        let removed = self.tables[index].clone();

        let image = if self.tables.len() == 1 {
            empty_image()
        } else {
            let old = self.image();
            let start = CATALOG_HEADER_SIZE
                + self.tables[..index]
                    .iter()
                    .map(|t| t.entry_size() as usize)
                    .sum::<usize>();
            let end = start + removed.entry_size() as usize;

            let mut image = Vec::with_capacity(old.len() - (end - start));
            image.extend_from_slice(&old[..CATALOG_HEADER_SIZE]);
            image.extend_from_slice(&old[CATALOG_HEADER_SIZE..start]);
            image.extend_from_slice(&old[end..]);
            set_header(&mut image, self.tables.len() as u32 - 1);
            image
        };

        write_image(&self.path, &image)?;
        self.refresh()?;
        info!(table = %removed.name, total_size = self.total_size(), "catalog entry removed");
        Ok(removed)
    }

    /// Get table schema info as a formatted string (for LIST SCHEMA)
    pub fn get_table_info(&self, name: &str) -> Result<String> {
        let table = self.get_table(name)?;
        let mut info = String::new();

        let _ = writeln!(info, "Table PD size            (tpd_size)    = {}", table.entry_size());
        let _ = writeln!(info, "Table Name               (table_name)  = {}", table.name);
        let _ = writeln!(info, "Number of Columns        (num_columns) = {}", table.columns.len());
        let _ = writeln!(info, "Column Descriptor Offset (cd_offset)   = {}", TABLE_ENTRY_SIZE);
        let _ = writeln!(info, "Table PD Flags           (tpd_flags)   = {}", table.flags);
        info.push('\n');

        for col in &table.columns {
            let _ = writeln!(info, "Column Name   (col_name) = {}", col.name);
            let _ = writeln!(info, "Column Id     (col_id)   = {}", col.id);
            let _ = writeln!(info, "Column Type   (col_type) = {}", col.column_type.code());
            let _ = writeln!(info, "Column Length (col_len)  = {}", col.length);
            let _ = writeln!(info, "Not Null flag (not_null) = {}", col.not_null as u32);
            info.push('\n');
        }

        Ok(info)
    }

    /// Serialize the in-memory catalog to its file image
    fn image(&self) -> Vec<u8> {
        if self.tables.is_empty() {
            return empty_image();
        }
        let mut image = vec![0u8; CATALOG_HEADER_SIZE];
        for table in &self.tables {
            image.extend_from_slice(&table.to_bytes());
        }
        set_header(&mut image, self.tables.len() as u32);
        image
    }

    /// Reload the in-memory tables from the catalog file
    fn refresh(&mut self) -> Result<()> {
        let bytes = std::fs::read(&self.path).map_err(|e| Error::read(&self.path, e))?;
        self.tables = parse_image(&bytes)?;
        debug!(
            path = %self.path.display(),
            size = bytes.len(),
            tables = self.tables.len(),
            "catalog loaded"
        );
        Ok(())
    }
}

fn empty_image() -> Vec<u8> {
    let mut image = vec![0u8; EMPTY_CATALOG_SIZE];
    set_header(&mut image, 0);
    image
}

/// Write `total_size` (the image length) and `table_count` into the header
fn set_header(image: &mut [u8], table_count: u32) {
    let total_size = image.len() as u32;
    LittleEndian::write_u32(&mut image[0..4], total_size);
    LittleEndian::write_u32(&mut image[4..8], table_count);
}

fn parse_image(bytes: &[u8]) -> Result<Vec<TableDescriptor>> {
    if bytes.len() < CATALOG_HEADER_SIZE {
        return Err(Error::CatalogCorruption(format!(
            "file is only {} bytes",
            bytes.len()
        )));
    }

    let total_size = LittleEndian::read_u32(&bytes[0..4]) as usize;
    let table_count = LittleEndian::read_u32(&bytes[4..8]) as usize;

    if total_size != bytes.len() {
        return Err(Error::CatalogCorruption(format!(
            "header says {} bytes, file has {}",
            total_size,
            bytes.len()
        )));
    }

    if table_count == 0 {
        if total_size != EMPTY_CATALOG_SIZE {
            return Err(Error::CatalogCorruption(format!(
                "empty catalog has {} bytes",
                total_size
            )));
        }
        return Ok(Vec::new());
    }

    let mut tables = Vec::with_capacity(table_count);
    let mut offset = CATALOG_HEADER_SIZE;
    for _ in 0..table_count {
        if offset >= bytes.len() {
            return Err(Error::CatalogCorruption(format!(
                "expected {} tables, found {}",
                table_count,
                tables.len()
            )));
        }
        let table = TableDescriptor::from_bytes(&bytes[offset..])?;
        offset += table.entry_size() as usize;
        tables.push(table);
    }

    if offset != bytes.len() {
        return Err(Error::CatalogCorruption(format!(
            "{} trailing bytes after last entry",
            bytes.len() - offset
        )));
    }

    Ok(tables)
}

fn write_image(path: &Path, image: &[u8]) -> Result<()> {
    std::fs::write(path, image).map_err(|e| Error::write(path, e))
}

/// Builder for creating tables with a fluent API
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDescriptor>,
}

impl TableBuilder {
    /// Start building a new table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add an INT column
    pub fn int(mut self, name: impl Into<String>) -> Self {
        self.columns
            .push(ColumnDescriptor::new(name, ColumnType::Int, 0));
        self
    }

    /// Add a column
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType, length: u32) -> Self {
        self.columns
            .push(ColumnDescriptor::new(name, column_type, length));
        self
    }

    /// Add a NOT NULL column
    pub fn column_not_null(
        mut self,
        name: impl Into<String>,
        column_type: ColumnType,
        length: u32,
    ) -> Self {
        self.columns
            .push(ColumnDescriptor::new(name, column_type, length).not_null(true));
        self
    }

    /// Build the descriptor without registering it
    pub fn descriptor(self) -> Result<TableDescriptor> {
        let mut table = TableDescriptor::new(self.name);
        for column in self.columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Build the table in the catalog
    #[cfg(test)]
    pub(crate) fn build(self, catalog: &mut Catalog) -> Result<TableDescriptor> {
        let table = self.descriptor()?;
        catalog.add(table.clone())?;
        Ok(table)
    }
}
