use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the nursery monitor.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A spreadsheet file or payload could not be decoded.
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    /// The workbook file extension is not one the loaders understand.
    #[error("Unsupported workbook format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A process identifier is not present in the process table.
    #[error("Unknown process: {0}")]
    UnknownProcess(String),

    /// A month or week selector string could not be parsed.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// A spreadsheet identifier (or URL) could not be understood.
    #[error("Invalid sheet id: {0}")]
    InvalidSheetId(String),

    /// A cell under a parameter column does not hold a number.
    #[error("Invalid value in sheet {sheet:?}, column {column:?}: {raw}")]
    InvalidCellValue {
        sheet: String,
        column: String,
        raw: String,
    },

    /// The remote spreadsheet export could not be fetched.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A background worker panicked or was cancelled before finishing.
    #[error("Background task failed: {0}")]
    Task(String),
}

/// Convenience alias used throughout the nursery crates.
pub type Result<T> = std::result::Result<T, DashboardError>;
