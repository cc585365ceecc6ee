//! Engine configuration
//!
//! Where the catalog file and the per-table data files live.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default catalog file name
pub const DEFAULT_CATALOG_FILE: &str = "dbfile.bin";

/// Extension of per-table data files
pub const TABLE_FILE_EXTENSION: &str = "tab";

/// Environment variable naming a JSON config file
pub const CONFIG_ENV: &str = "FLATDB_CONFIG";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "FLATDB_DATA_DIR";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the catalog, table files and schema reports
    pub data_dir: PathBuf,
    /// Catalog file name inside `data_dir`
    pub catalog_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            catalog_file: DEFAULT_CATALOG_FILE.to_string(),
        }
    }
}

impl Config {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the catalog file name
    pub fn catalog_file(mut self, name: impl Into<String>) -> Self {
        self.catalog_file = name.into();
        self
    }

    /// Read a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        serde_json::from_str(&json).map_err(|e| {
            Error::read(
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    /// Build the config from `FLATDB_CONFIG` and `FLATDB_DATA_DIR`
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Full path of the catalog file
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    /// Full path of a table's data file
    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", table_name, TABLE_FILE_EXTENSION))
    }

    /// Full path of a schema report file
    pub fn report_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// Create the data directory if it does not exist
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|e| Error::write(&self.data_dir, e))?;
        }
        Ok(())
    }
}
