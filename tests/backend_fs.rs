//! Artifact atomicity on the filesystem backend: an interrupted encode
//! must never leave a readable artifact behind.

use tempfile::TempDir;

use rowboat::backend_fs::FsBackend;
use rowboat::codec_parquet::ParquetCodec;
use rowboat::dataframe::DataFrame;
use rowboat::error::{FrameError, StoreError};
use rowboat::schema::{Cell, Field, PhysicalType, Row, Schema, Tabular};

/// A shape that can be told to produce a malformed row, simulating a
/// record that fails mid-encode.
#[derive(Debug, Clone, PartialEq)]
struct Flaky {
    value: i32,
    corrupt: bool,
}

impl Flaky {
    fn good(value: i32) -> Self {
        Flaky {
            value,
            corrupt: false,
        }
    }

    fn bad() -> Self {
        Flaky {
            value: 0,
            corrupt: true,
        }
    }
}

impl Tabular for Flaky {
    fn schema() -> Schema {
        Schema::new(vec![Field::new("value", PhysicalType::Int32)])
    }

    fn row(&self) -> Vec<Cell> {
        if self.corrupt {
            vec![Cell::Utf8("not an int".to_string())]
        } else {
            vec![Cell::Int32(self.value)]
        }
    }

    fn from_row(mut row: Row<'_>) -> Result<Self, FrameError> {
        Ok(Flaky::good(row.take_i32("value")?))
    }
}

#[test]
fn failed_encode_leaves_no_artifact() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("data.parquet");
    let location = path.to_string_lossy().to_string();

    let frame = DataFrame::from_records(vec![Flaky::good(1), Flaky::bad(), Flaky::good(3)]);
    let err = frame
        .write(&location, &ParquetCodec::new(), &FsBackend::new())
        .unwrap_err();
    match err {
        FrameError::BadRecord { index, .. } => assert_eq!(index, 1),
        other => panic!("unexpected error: {other}"),
    }

    // Nothing at the destination, not even a temp file.
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);

    // A subsequent read finds nothing.
    let result: Result<DataFrame<Flaky>, FrameError> =
        DataFrame::read(&location, &ParquetCodec::new(), &FsBackend::new());
    match result.unwrap_err() {
        FrameError::Storage(StoreError::NotFound { .. }) => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_rewrite_preserves_previous_artifact() {
    let tmp = TempDir::new().unwrap();
    let location = tmp.path().join("data.parquet").to_string_lossy().to_string();

    let first = DataFrame::from_records(vec![Flaky::good(1), Flaky::good(2)]);
    first
        .write(&location, &ParquetCodec::new(), &FsBackend::new())
        .unwrap();

    let second = DataFrame::from_records(vec![Flaky::good(9), Flaky::bad()]);
    second
        .write(&location, &ParquetCodec::new(), &FsBackend::new())
        .unwrap_err();

    // The earlier artifact is still intact and readable.
    let back: DataFrame<Flaky> =
        DataFrame::read(&location, &ParquetCodec::new(), &FsBackend::new()).unwrap();
    assert_eq!(back.records(), first.records());
}

#[test]
fn successful_rewrite_truncates() {
    let tmp = TempDir::new().unwrap();
    let location = tmp.path().join("data.parquet").to_string_lossy().to_string();

    DataFrame::from_records(vec![Flaky::good(1), Flaky::good(2), Flaky::good(3)])
        .write(&location, &ParquetCodec::new(), &FsBackend::new())
        .unwrap();
    DataFrame::from_records(vec![Flaky::good(7)])
        .write(&location, &ParquetCodec::new(), &FsBackend::new())
        .unwrap();

    let back: DataFrame<Flaky> =
        DataFrame::read(&location, &ParquetCodec::new(), &FsBackend::new()).unwrap();
    assert_eq!(back.records(), &[Flaky::good(7)][..]);
}

#[test]
fn write_into_missing_directory_fails_without_creating_it() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("not-created");
    let location = dir.join("data.parquet").to_string_lossy().to_string();

    let frame = DataFrame::from_records(vec![Flaky::good(1)]);
    let err = frame
        .write(&location, &ParquetCodec::new(), &FsBackend::new())
        .unwrap_err();
    match err {
        FrameError::Storage(StoreError::NotFound { .. }) => {}
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.exists());
}
