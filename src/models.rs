//! Core data models shared by the ingestion and persistence paths.
//!
//! [`RecordInfo`] is the provenance block stamped onto a record at
//! ingestion time: the verbatim raw payload, a content hash over its
//! bytes, the ingestion timestamp, and a free-text source identifier.
//! It is created exactly once, by the parser in [`crate::ingest`], and
//! never mutated afterward.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::schema::{Cell, Field, PhysicalType, Row};

/// Wire name of the raw-payload column/field.
pub const RAW_DATA: &str = "_raw_data";
/// Wire name of the content-hash column/field.
pub const ROW_HASH: &str = "_row_hash";
/// Wire name of the ingestion-timestamp column/field.
pub const INGEST_TIMESTAMP: &str = "_ingest_timestamp";
/// Wire name of the source-identifier column/field.
pub const SOURCE_INFO: &str = "_source_info";

/// Provenance metadata attached to an ingested record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordInfo {
    /// The raw payload, verbatim, as text.
    #[serde(rename = "_raw_data")]
    pub raw_data: String,
    /// Hex-encoded SHA-256 over the exact raw payload bytes.
    #[serde(rename = "_row_hash")]
    pub row_hash: String,
    /// Ingestion wall-clock time, milliseconds since epoch, UTC.
    #[serde(rename = "_ingest_timestamp")]
    pub ingest_timestamp: i64,
    /// Where the record came from, as supplied by the caller.
    #[serde(rename = "_source_info")]
    pub source_info: String,
}

impl RecordInfo {
    /// The four columns a columnar artifact carries for the provenance
    /// block. All nullable: records constructed directly (not ingested)
    /// have no provenance.
    ///
    /// `Tabular` implementations append these to their own fields and
    /// pair them with [`RecordInfo::append_row`] / [`RecordInfo::take_row`].
    pub fn schema_fields() -> Vec<Field> {
        vec![
            Field::new(RAW_DATA, PhysicalType::Utf8).nullable(),
            Field::new(ROW_HASH, PhysicalType::Utf8).nullable(),
            Field::new(INGEST_TIMESTAMP, PhysicalType::Int64).nullable(),
            Field::new(SOURCE_INFO, PhysicalType::Utf8).nullable(),
        ]
    }

    /// Append the provenance cells (or nulls) to a row under construction.
    pub fn append_row(info: Option<&RecordInfo>, row: &mut Vec<Cell>) {
        match info {
            Some(info) => {
                row.push(Cell::Utf8(info.raw_data.clone()));
                row.push(Cell::Utf8(info.row_hash.clone()));
                row.push(Cell::Int64(info.ingest_timestamp));
                row.push(Cell::Utf8(info.source_info.clone()));
            }
            None => row.extend([Cell::Null, Cell::Null, Cell::Null, Cell::Null]),
        }
    }

    /// Take the provenance cells back out of a decoded row. Returns
    /// `None` when the row was persisted without provenance.
    pub fn take_row(row: &mut Row<'_>) -> Result<Option<RecordInfo>, FrameError> {
        let raw_data = row.take_opt_utf8(RAW_DATA)?;
        let row_hash = row.take_opt_utf8(ROW_HASH)?;
        let ingest_timestamp = row.take_opt_i64(INGEST_TIMESTAMP)?;
        let source_info = row.take_opt_utf8(SOURCE_INFO)?;
        Ok(
            match (raw_data, row_hash, ingest_timestamp, source_info) {
                (Some(raw_data), Some(row_hash), Some(ingest_timestamp), Some(source_info)) => {
                    Some(RecordInfo {
                        raw_data,
                        row_hash,
                        ingest_timestamp,
                        source_info,
                    })
                }
                _ => None,
            },
        )
    }
}

/// Capability of carrying a [`RecordInfo`] provenance block.
///
/// The ingestion parser requires this bound, so a record shape without a
/// usable metadata slot is rejected when the call is compiled rather than
/// when it runs. Typical implementation over an `Option<RecordInfo>`
/// field:
///
/// ```rust
/// use rowboat::models::{HasRecordInfo, RecordInfo};
///
/// struct Event {
///     kind: String,
///     info: Option<RecordInfo>,
/// }
///
/// impl HasRecordInfo for Event {
///     fn set_record_info(&mut self, info: RecordInfo) {
///         self.info = Some(info);
///     }
///     fn record_info(&self) -> Option<&RecordInfo> {
///         self.info.as_ref()
///     }
/// }
/// ```
pub trait HasRecordInfo {
    /// Install the provenance block. Called once per record, at ingestion.
    fn set_record_info(&mut self, info: RecordInfo);

    /// The provenance block, if the record passed through ingestion.
    fn record_info(&self) -> Option<&RecordInfo>;
}
