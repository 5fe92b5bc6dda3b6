/// Error types for monthly aggregation and series adjustment
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    /// Dates and values of a time series differ in length
    #[error("Time series length mismatch: {dates} dates but {values} values")]
    LengthMismatch { dates: usize, values: usize },

    /// The identity column is absent from a monthly value table
    #[error("Identity column {column:?} not found in {table}")]
    MissingIdColumn { column: String, table: String },

    /// A monthly value table has no recognisable month columns
    #[error("No month columns found in {0}")]
    NoMonthColumns(String),

    /// A factor table column is not a month name
    #[error("Unknown month column {0:?}")]
    UnknownMonth(String),

    /// A date could not be parsed
    #[error("Failed to parse date {value:?} on line {line}")]
    DateParse { line: u64, value: String },

    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read or write delimited text
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Type alias for Results using DataError
pub type Result<T> = std::result::Result<T, DataError>;
