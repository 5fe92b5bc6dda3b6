/// Error types for the basin-geo library
use thiserror::Error;

/// Main error type for layer and join operations
#[derive(Error, Debug)]
pub enum GeoError {
    /// Two layers taking part in a join use different coordinate reference systems
    #[error("CRS mismatch between layers: basin layer is {basin}, auxiliary layer is {aux}")]
    CrsMismatch { basin: String, aux: String },

    /// A required attribute field is absent from a layer's schema
    #[error("Field {field:?} not found in {layer} layer")]
    MissingField { layer: String, field: String },

    /// A non-blank fallback table line could not be parsed
    #[error("Malformed fallback table line {line}: {reason}")]
    FallbackParse { line: u64, reason: String },

    /// Shapefile reading failed
    #[error("Shapefile error: {0}")]
    Shapefile(String),

    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read or write delimited text
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

impl From<shapefile::Error> for GeoError {
    fn from(e: shapefile::Error) -> Self {
        GeoError::Shapefile(e.to_string())
    }
}

impl From<shapefile::dbase::Error> for GeoError {
    fn from(e: shapefile::dbase::Error) -> Self {
        GeoError::Shapefile(e.to_string())
    }
}

impl GeoError {
    /// True for the precondition failures (CRS mismatch, missing field).
    pub fn is_schema_error(&self) -> bool {
        matches!(self, GeoError::CrsMismatch { .. } | GeoError::MissingField { .. })
    }
}

/// Type alias for Results using GeoError
pub type Result<T> = std::result::Result<T, GeoError>;
