//! Columnar codec backed by Apache Parquet.
//!
//! Encoding projects records through their [`Tabular`] mapping into Arrow
//! columns and writes a self-describing Parquet artifact (embedded
//! schema, compressed column chunks, trailing footer). Column arrays can
//! be materialized by a bounded pool of scoped worker threads; the knob
//! affects throughput only, never the artifact's content or row order.
//!
//! Decoding reads the artifact back and aligns its columns to the target
//! shape's schema by name: extra columns are ignored, a missing nullable
//! column decodes as nulls, and a missing required column is a
//! [`SchemaMismatch`](FrameError::SchemaMismatch). The footer-declared
//! row count must match the rows actually decoded.

use std::io::{Read, Write};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float32Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::schema::types::ColumnPath;

use crate::codec::Codec;
use crate::error::FrameError;
use crate::schema::{Cell, Encoding, Field, PhysicalType, Row, Schema, Tabular};

/// Per-artifact compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    Snappy,
    Zstd,
}

/// Default number of concurrently-materialized column chunks.
pub const DEFAULT_PARALLELISM: usize = 4;

/// The columnar codec. Carries the per-artifact configuration.
#[derive(Debug, Clone)]
pub struct ParquetCodec {
    compression: Compression,
    parallelism: usize,
}

impl Default for ParquetCodec {
    fn default() -> Self {
        ParquetCodec {
            compression: Compression::Snappy,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl ParquetCodec {
    /// Codec with default configuration (Snappy, parallelism 4).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Cap on concurrently-built column arrays. Clamped to at least 1.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    fn writer_properties(&self, schema: &Schema) -> WriterProperties {
        let mut builder = WriterProperties::builder()
            .set_compression(match self.compression {
                Compression::None => ParquetCompression::UNCOMPRESSED,
                Compression::Snappy => ParquetCompression::SNAPPY,
                Compression::Zstd => ParquetCompression::ZSTD(ZstdLevel::default()),
            })
            // Dictionary pages only where the schema asks for them.
            .set_dictionary_enabled(false);
        for field in schema.fields() {
            if field.encoding == Some(Encoding::Dictionary) {
                builder = builder
                    .set_column_dictionary_enabled(ColumnPath::new(vec![field.name.clone()]), true);
            }
        }
        builder.build()
    }
}

impl<T: Tabular> Codec<T> for ParquetCodec {
    fn encode<W: Write + Send>(&self, records: &[T], sink: W) -> Result<(), FrameError> {
        let schema = T::schema();
        let rows: Vec<Vec<Cell>> = records.iter().map(Tabular::row).collect();
        for (index, row) in rows.iter().enumerate() {
            if row.len() != schema.len() {
                return Err(FrameError::BadRecord {
                    index,
                    source: Box::new(FrameError::RowShape {
                        expected: schema.len(),
                        found: row.len(),
                    }),
                });
            }
        }

        let columns = build_columns(&schema, &rows, self.parallelism)?;
        let arrow_schema = Arc::new(to_arrow_schema(&schema));
        let batch = RecordBatch::try_new(arrow_schema.clone(), columns)?;

        let mut writer =
            ArrowWriter::try_new(sink, arrow_schema, Some(self.writer_properties(&schema)))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }

    fn decode<R: Read>(&self, mut source: R) -> Result<Vec<T>, FrameError> {
        let mut raw = Vec::new();
        source.read_to_end(&mut raw)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::from(raw))?;
        let declared = builder.metadata().file_metadata().num_rows() as usize;

        let schema = T::schema();
        let shape = std::any::type_name::<T>();
        let file_schema = builder.schema().clone();
        for field in schema.fields() {
            let present = file_schema
                .fields()
                .iter()
                .any(|f| f.name().as_str() == field.name);
            if !present && !field.nullable {
                return Err(FrameError::SchemaMismatch {
                    field: field.name.clone(),
                    shape,
                });
            }
        }

        let reader = builder.build()?;
        let mut records = Vec::with_capacity(declared);
        for batch in reader {
            let batch = batch?;
            let nrows = batch.num_rows();
            let mut columns: Vec<Vec<Cell>> = Vec::with_capacity(schema.len());
            for field in schema.fields() {
                match batch.column_by_name(&field.name) {
                    Some(array) => columns.push(column_cells(field, array)?),
                    // Upfront check proved the field nullable.
                    None => columns.push(vec![Cell::Null; nrows]),
                }
            }
            for i in 0..nrows {
                let cells: Vec<Cell> = columns.iter().map(|c| c[i].clone()).collect();
                records.push(T::from_row(Row::new(&schema, cells))?);
            }
        }

        if records.len() != declared {
            return Err(FrameError::RowCountMismatch {
                declared,
                decoded: records.len(),
            });
        }
        Ok(records)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Schema conversion
// ═══════════════════════════════════════════════════════════════════════

fn to_arrow_type(kind: PhysicalType) -> DataType {
    match kind {
        PhysicalType::Int32 => DataType::Int32,
        PhysicalType::Int64 => DataType::Int64,
        PhysicalType::Float32 => DataType::Float32,
        PhysicalType::Boolean => DataType::Boolean,
        PhysicalType::Utf8 => DataType::Utf8,
        PhysicalType::Date32 => DataType::Date32,
    }
}

fn to_arrow_schema(schema: &Schema) -> ArrowSchema {
    let fields: Vec<ArrowField> = schema
        .fields()
        .iter()
        .map(|f| ArrowField::new(f.name.as_str(), to_arrow_type(f.kind), f.nullable))
        .collect();
    ArrowSchema::new(fields)
}

// ═══════════════════════════════════════════════════════════════════════
// Column materialization (encode)
// ═══════════════════════════════════════════════════════════════════════

/// Build all column arrays, at most `parallelism` at a time.
///
/// Output is position-for-position identical to the sequential build;
/// the fan-out is purely a throughput knob.
fn build_columns(
    schema: &Schema,
    rows: &[Vec<Cell>],
    parallelism: usize,
) -> Result<Vec<ArrayRef>, FrameError> {
    let fields = schema.fields();
    if parallelism <= 1 || fields.len() <= 1 {
        return fields
            .iter()
            .enumerate()
            .map(|(idx, field)| build_column(field, rows, idx))
            .collect();
    }

    let workers = parallelism.min(fields.len());
    let per_worker = fields.len().div_ceil(workers);
    let mut results: Vec<Result<ArrayRef, FrameError>> = Vec::with_capacity(fields.len());
    std::thread::scope(|scope| {
        let handles: Vec<_> = fields
            .chunks(per_worker)
            .enumerate()
            .map(|(chunk_no, group)| {
                let base = chunk_no * per_worker;
                scope.spawn(move || {
                    group
                        .iter()
                        .enumerate()
                        .map(|(offset, field)| build_column(field, rows, base + offset))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            results.extend(handle.join().expect("column builder thread panicked"));
        }
    });
    results.into_iter().collect()
}

fn bad_cell(field: &Field, index: usize, found: &Cell) -> FrameError {
    FrameError::BadRecord {
        index,
        source: Box::new(FrameError::CellType {
            field: field.name.clone(),
            expected: field.kind.name(),
            found: found.kind().to_string(),
        }),
    }
}

macro_rules! column_of {
    ($field:expr, $rows:expr, $idx:expr, $variant:ident) => {{
        let mut values = Vec::with_capacity($rows.len());
        for (i, row) in $rows.iter().enumerate() {
            values.push(match &row[$idx] {
                Cell::$variant(v) => Some(v.clone()),
                Cell::Null if $field.nullable => None,
                other => return Err(bad_cell($field, i, other)),
            });
        }
        values
    }};
}

fn build_column(field: &Field, rows: &[Vec<Cell>], idx: usize) -> Result<ArrayRef, FrameError> {
    Ok(match field.kind {
        PhysicalType::Int32 => {
            Arc::new(Int32Array::from(column_of!(field, rows, idx, Int32))) as ArrayRef
        }
        PhysicalType::Int64 => Arc::new(Int64Array::from(column_of!(field, rows, idx, Int64))),
        PhysicalType::Float32 => {
            Arc::new(Float32Array::from(column_of!(field, rows, idx, Float32)))
        }
        PhysicalType::Boolean => {
            Arc::new(BooleanArray::from(column_of!(field, rows, idx, Boolean)))
        }
        PhysicalType::Utf8 => Arc::new(StringArray::from_iter(column_of!(field, rows, idx, Utf8))),
        PhysicalType::Date32 => {
            Arc::new(Date32Array::from(column_of!(field, rows, idx, Date32)))
        }
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Column extraction (decode)
// ═══════════════════════════════════════════════════════════════════════

fn wrong_column(field: &Field, array: &ArrayRef) -> FrameError {
    FrameError::CellType {
        field: field.name.clone(),
        expected: field.kind.name(),
        found: array.data_type().to_string(),
    }
}

macro_rules! cells_from {
    ($field:expr, $array:expr, $arr_ty:ty, $make:expr) => {{
        let arr = $array
            .as_any()
            .downcast_ref::<$arr_ty>()
            .ok_or_else(|| wrong_column($field, $array))?;
        (0..arr.len())
            .map(|i| {
                if arr.is_null(i) {
                    Cell::Null
                } else {
                    $make(arr.value(i))
                }
            })
            .collect()
    }};
}

fn column_cells(field: &Field, array: &ArrayRef) -> Result<Vec<Cell>, FrameError> {
    Ok(match field.kind {
        PhysicalType::Int32 => cells_from!(field, array, Int32Array, Cell::Int32),
        PhysicalType::Int64 => cells_from!(field, array, Int64Array, Cell::Int64),
        PhysicalType::Float32 => cells_from!(field, array, Float32Array, Cell::Float32),
        PhysicalType::Boolean => cells_from!(field, array, BooleanArray, Cell::Boolean),
        PhysicalType::Utf8 => {
            cells_from!(field, array, StringArray, |v: &str| Cell::Utf8(v.to_string()))
        }
        PhysicalType::Date32 => cells_from!(field, array, Date32Array, Cell::Date32),
    })
}
