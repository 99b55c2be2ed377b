//! The error types shared across the crate.
//!
//! [`FrameError`] covers schema, codec, and ingestion failures;
//! [`StoreError`] covers backend I/O and is wrapped transparently so both
//! can travel through one `Result` type. Errors always name the field,
//! line, record index, or destination involved so a caller can tell a bad
//! input record from an unavailable backend without inspecting internals.

use thiserror::Error;

/// Top-level error for frame, codec, and ingestion operations.
#[derive(Error, Debug)]
pub enum FrameError {
    /// A raw payload could not be decoded into the target record shape.
    /// Carries the verbatim payload for operator inspection.
    #[error("failed to decode payload into {shape}: {source}")]
    Decode {
        shape: &'static str,
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    /// A line-delimited artifact contained an unparseable line. The whole
    /// decode fails; `line` is 1-based.
    #[error("malformed record on line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The artifact lacks a column that the target shape requires.
    #[error("artifact has no column '{field}' required by {shape}")]
    SchemaMismatch { field: String, shape: &'static str },

    /// A columnar artifact's footer row count disagrees with the number of
    /// rows actually decoded.
    #[error("artifact declares {declared} rows but {decoded} were decoded")]
    RowCountMismatch { declared: usize, decoded: usize },

    /// A single record failed to encode; the whole artifact is aborted.
    #[error("record at index {index} cannot be encoded: {source}")]
    BadRecord {
        index: usize,
        #[source]
        source: Box<FrameError>,
    },

    /// A cell value did not match the physical type its field maps to.
    #[error("field '{field}' expected {expected}, found {found}")]
    CellType {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// A row cursor was asked for a field its schema does not map.
    #[error("row maps no field named '{field}'")]
    UnknownField { field: String },

    /// A record produced a row whose cell count disagrees with its schema.
    #[error("row has {found} cells but the schema maps {expected} fields")]
    RowShape { expected: usize, found: usize },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("Parquet operation failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend I/O failure, categorized so callers can distinguish a missing
/// artifact from an unreachable store. Every variant names the destination.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("destination not found: {location}")]
    NotFound { location: String },

    #[error("permission denied for {location}")]
    PermissionDenied { location: String },

    #[error("backend unavailable for {location}: {source}")]
    Unavailable {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("storage failure at {location}: {source}")]
    Other {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("missing credentials: {variable} is not set")]
    Credentials { variable: &'static str },
}

impl StoreError {
    /// Map a `std::io::Error` onto the backend taxonomy, tagging it with
    /// the destination it occurred at.
    pub(crate) fn from_io(location: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StoreError::NotFound {
                location: location.to_string(),
            },
            std::io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
                location: location.to_string(),
            },
            _ => StoreError::Other {
                location: location.to_string(),
                source: Box::new(err),
            },
        }
    }
}
