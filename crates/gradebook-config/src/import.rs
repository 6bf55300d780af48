//! Spreadsheet import configuration.
//!
//! # Environment Variables
//!
//! - `IMPORT_MAX_ROWS`: Maximum number of data rows accepted in one file (default: `1000`)
//! - `IMPORT_MAX_FILE_SIZE`: Maximum upload size in bytes (default: 10 MiB)
//! - `IMPORT_PROGRESS_INTERVAL`: Emit a progress checkpoint every N rows (default: `10`)

use crate::env_or;

pub const DEFAULT_MAX_ROWS: usize = 1000;
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportConfig {
    /// Files with more data rows than this are rejected before any row is read.
    pub max_rows: usize,
    pub max_file_size: usize,
    pub progress_interval: usize,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self {
            max_rows: env_or("IMPORT_MAX_ROWS", DEFAULT_MAX_ROWS),
            max_file_size: env_or("IMPORT_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
            // zero would divide by zero in the progress loop
            progress_interval: env_or("IMPORT_PROGRESS_INTERVAL", DEFAULT_PROGRESS_INTERVAL).max(1),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.max_rows, 1000);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.progress_interval, 10);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        assert_eq!(env_or("GRADEBOOK_TEST_UNSET_VARIABLE", 42usize), 42);
    }
}
