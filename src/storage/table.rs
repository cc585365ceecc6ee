//! Table storage for flatdb
//!
//! Each table lives in its own `<name>.tab` file: a 24-byte header followed by
//! `num_records` fixed-size records.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::record::RecordLayout;
use crate::catalog::TableDescriptor;
use crate::error::{Error, Result};

/// Size of the table file header
pub const TABLE_HEADER_SIZE: usize = 24;

/// Most records a table may hold
pub const MAX_ROWS: u32 = 100;

/// Table file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFileHeader {
    pub record_size: u32,
    pub num_records: u32,
    /// Offset of the first record
    pub record_offset: u32,
    pub file_size: u32,
    pub flags: u32,
    pub reserved: u32,
}

impl TableFileHeader {
    /// Header of an empty table
    pub fn new(record_size: u32) -> Self {
        let mut header = Self {
            record_size,
            num_records: 0,
            record_offset: TABLE_HEADER_SIZE as u32,
            file_size: 0,
            flags: 0,
            reserved: 0,
        };
        header.file_size = header.computed_file_size() as u32;
        header
    }

    /// `record_offset + record_size * num_records`, widened so a damaged
    /// header cannot overflow
    pub fn computed_file_size(&self) -> u64 {
        self.record_position(self.num_records)
    }

    /// Byte position of record `index`
    pub fn record_position(&self, index: u32) -> u64 {
        self.record_offset as u64 + index as u64 * self.record_size as u64
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; TABLE_HEADER_SIZE];
        let fields = [
            self.record_size,
            self.num_records,
            self.record_offset,
            self.file_size,
            self.flags,
            self.reserved,
        ];
        for (slot, field) in buf.chunks_exact_mut(4).zip(fields) {
            LittleEndian::write_u32(slot, field);
        }
        buf
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> std::io::Result<Self> {
        let mut cursor = Cursor::new(bytes);
        Ok(Self {
            record_size: cursor.read_u32::<LittleEndian>()?,
            num_records: cursor.read_u32::<LittleEndian>()?,
            record_offset: cursor.read_u32::<LittleEndian>()?,
            file_size: cursor.read_u32::<LittleEndian>()?,
            flags: cursor.read_u32::<LittleEndian>()?,
            reserved: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// An open table data file
#[derive(Debug)]
pub struct TableFile {
    path: PathBuf,
    file: File,
    header: TableFileHeader,
    layout: RecordLayout,
}

impl TableFile {
    /// Create a new, empty table file (overwrites any existing file)
    pub fn create(path: impl AsRef<Path>, table: &TableDescriptor) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let layout = RecordLayout::new(table);
        let header = TableFileHeader::new(layout.record_size() as u32);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::open(&path, e))?;

        let mut table_file = Self {
            path,
            file,
            header,
            layout,
        };
        table_file.persist_header()?;

        info!(
            path = %table_file.path.display(),
            record_size = header.record_size,
            "table file created"
        );
        Ok(table_file)
    }

    /// Open an existing table file and read its header. A missing or
    /// truncated file is an open error.
    pub fn open(path: impl AsRef<Path>, table: &TableDescriptor) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| Error::open(&path, e))?;

        let mut buf = [0u8; TABLE_HEADER_SIZE];
        file.read_exact(&mut buf)
            .map_err(|e| Error::open(&path, e))?;
        let header = TableFileHeader::from_bytes(&buf).map_err(|e| Error::open(&path, e))?;

        let layout = RecordLayout::new(table);
        let actual_len = file
            .metadata()
            .map_err(|e| Error::open(&path, e))?
            .len();

        if header.record_size as usize != layout.record_size()
            || header.record_offset as usize != TABLE_HEADER_SIZE
            || header.num_records > MAX_ROWS
            || actual_len < header.computed_file_size()
        {
            return Err(Error::open(
                &path,
                std::io::Error::new(
                    ErrorKind::InvalidData,
                    format!(
                        "header does not match table '{}' ({} bytes on disk)",
                        table.name, actual_len
                    ),
                ),
            ));
        }

        debug!(path = %path.display(), num_records = header.num_records, "table file opened");
        Ok(Self {
            path,
            file,
            header,
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &TableFileHeader {
        &self.header
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    pub fn num_records(&self) -> u32 {
        self.header.num_records
    }

    /// Read record `index`
    #[cfg(test)]
    pub(crate) fn read_record(&mut self, index: u32) -> Result<Vec<u8>> {
        let mut record = vec![0u8; self.header.record_size as usize];
        self.file
            .seek(SeekFrom::Start(self.header.record_position(index)))
            .map_err(|e| Error::read(&self.path, e))?;
        self.file
            .read_exact(&mut record)
            .map_err(|e| Error::read(&self.path, e))?;
        Ok(record)
    }

    /// Write record `index` (which may be one past the last record)
    pub fn write_record(&mut self, index: u32, record: &[u8]) -> Result<()> {
        debug_assert_eq!(record.len(), self.header.record_size as usize);
        self.file
            .seek(SeekFrom::Start(self.header.record_position(index)))
            .map_err(|e| Error::write(&self.path, e))?;
        self.file
            .write_all(record)
            .map_err(|e| Error::write(&self.path, e))?;
        Ok(())
    }

    /// Append a record and persist the grown header
    pub fn append(&mut self, record: &[u8]) -> Result<()> {
        let index = self.header.num_records;
        self.write_record(index, record)?;
        self.header.num_records += 1;
        self.persist_header()
    }

    /// Read every record in file order
    pub fn scan(&mut self) -> Result<Vec<Vec<u8>>> {
        let record_size = self.header.record_size as usize;
        let mut data = vec![0u8; record_size * self.header.num_records as usize];

        self.file
            .seek(SeekFrom::Start(self.header.record_offset as u64))
            .map_err(|e| Error::read(&self.path, e))?;
        self.file
            .read_exact(&mut data)
            .map_err(|e| Error::read(&self.path, e))?;

        if record_size == 0 {
            return Ok(Vec::new());
        }
        Ok(data.chunks(record_size).map(|r| r.to_vec()).collect())
    }

    /// Set the record count (takes effect on the next persist)
    pub fn set_num_records(&mut self, num_records: u32) {
        self.header.num_records = num_records;
    }

    /// Recompute `file_size`, rewrite the header in place and cut the file
    /// to that size.
    pub fn persist_header(&mut self) -> Result<()> {
        // num_records never exceeds MAX_ROWS, so the size fits in u32
        self.header.file_size = self.header.computed_file_size() as u32;

        self.file
            .seek(SeekFrom::Start(0))
            .map_err(|e| Error::write(&self.path, e))?;
        self.file
            .write_all(&self.header.to_bytes())
            .map_err(|e| Error::write(&self.path, e))?;
        self.file
            .set_len(self.header.file_size as u64)
            .map_err(|e| Error::write(&self.path, e))?;
        self.file
            .flush()
            .map_err(|e| Error::write(&self.path, e))?;
        Ok(())
    }

    /// Delete a table file. A file that is already gone counts as removed.
    pub fn remove(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!(path = %path.display(), "table file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::write(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnType, TableBuilder};
    use crate::storage::record::Value;
    use tempfile::TempDir;

    fn users() -> TableDescriptor {
        TableBuilder::new("users")
            .int("id")
            .column("name", ColumnType::Varchar, 7)
            .descriptor()
            .unwrap()
    }

    #[test]
    fn test_create_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.tab");

        let table = TableFile::create(&path, &users()).unwrap();
        assert_eq!(table.header().record_size, 16);
        assert_eq!(table.num_records(), 0);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), TABLE_HEADER_SIZE);
        assert_eq!(TableFileHeader::from_bytes(&bytes).unwrap(), *table.header());
    }

    #[test]
    fn test_append_and_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.tab");
        let desc = users();

        let mut table = TableFile::create(&path, &desc).unwrap();
        for i in 0..3 {
            let record = table
                .layout()
                .encode(&[Value::Int(i), Value::Str(format!("u{}", i))]);
            table.append(&record).unwrap();
        }

        let mut reopened = TableFile::open(&path, &desc).unwrap();
        assert_eq!(reopened.num_records(), 3);
        assert_eq!(reopened.header().file_size, 24 + 3 * 16);

        let record = reopened.read_record(2).unwrap();
        assert_eq!(reopened.layout().decode_field(&record, 1), Value::Str("u2".into()));
        assert_eq!(reopened.scan().unwrap().len(), 3);
    }

    #[test]
    fn test_shrink_truncates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.tab");
        let desc = users();

        let mut table = TableFile::create(&path, &desc).unwrap();
        let record = table.layout().encode(&[Value::Int(1), Value::Null]);
        table.append(&record).unwrap();
        table.append(&record).unwrap();

        table.set_num_records(1);
        table.persist_header().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 24 + 16);
    }

    #[test]
    fn test_open_missing_or_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.tab");

        assert!(matches!(
            TableFile::open(&path, &users()),
            Err(Error::FileOpen { .. })
        ));

        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(matches!(
            TableFile::open(&path, &users()),
            Err(Error::FileOpen { .. })
        ));
    }

    #[test]
    fn test_open_rejects_oversized_record_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.tab");
        TableFile::create(&path, &users()).unwrap();

        // record_size * num_records would overflow 32 bits
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[4..8].copy_from_slice(&0x2000_0000u32.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            TableFile::open(&path, &users()),
            Err(Error::FileOpen { .. })
        ));

        // one past the row limit, with the bytes present on disk
        bytes[4..8].copy_from_slice(&(MAX_ROWS + 1).to_le_bytes());
        bytes.resize(TABLE_HEADER_SIZE + 16 * (MAX_ROWS as usize + 1), 0);
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            TableFile::open(&path, &users()),
            Err(Error::FileOpen { .. })
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.tab");

        TableFile::create(&path, &users()).unwrap();
        TableFile::remove(&path).unwrap();
        assert!(!path.exists());
        TableFile::remove(&path).unwrap();
    }
}
