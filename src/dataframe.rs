//! The tabular container and its persistence orchestration.
//!
//! A [`DataFrame`] owns an ordered sequence of records of one shape and
//! composes a [`Codec`] with a [`StorageBackend`] — both chosen at the
//! call site — to persist them and to reconstruct itself. The frame does
//! no deduplication or validation beyond schema derivation; appending and
//! ingesting are the caller's responsibility.

use std::sync::OnceLock;

use serde::de::DeserializeOwned;

use crate::backend::StorageBackend;
use crate::codec::Codec;
use crate::error::FrameError;
use crate::ingest;
use crate::models::HasRecordInfo;
use crate::schema::{Schema, Tabular};

/// An ordered sequence of records of one shape, with a cached schema.
#[derive(Debug, Clone)]
pub struct DataFrame<T> {
    records: Vec<T>,
    schema: OnceLock<Schema>,
}

impl<T> DataFrame<T> {
    /// An empty frame.
    pub fn new() -> Self {
        DataFrame {
            records: Vec::new(),
            schema: OnceLock::new(),
        }
    }

    /// Wrap an existing record sequence. Order is preserved.
    pub fn from_records(records: Vec<T>) -> Self {
        DataFrame {
            records,
            schema: OnceLock::new(),
        }
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    pub fn push(&mut self, record: T) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Persist the frame: open a write stream at `location` on `backend`,
    /// encode through `codec`, and finalize.
    ///
    /// On any encode or stream error the sink is dropped uncommitted, so
    /// no reader ever observes a complete-looking artifact; whatever was
    /// partially written is best-effort removed by the backend.
    pub fn write<C, B>(&self, location: &str, codec: &C, backend: &B) -> Result<(), FrameError>
    where
        C: Codec<T>,
        B: StorageBackend,
    {
        let mut sink = backend.open_write(location)?;
        codec.encode(&self.records, &mut sink)?;
        sink.commit()?;
        log::debug!("wrote {} records to {}", self.records.len(), location);
        Ok(())
    }

    /// Reconstruct a frame from the artifact at `location`.
    ///
    /// No side effects beyond the transient read stream, which is
    /// released when this returns.
    pub fn read<C, B>(location: &str, codec: &C, backend: &B) -> Result<Self, FrameError>
    where
        C: Codec<T>,
        B: StorageBackend,
    {
        let source = backend.open_read(location)?;
        let records = codec.decode(source)?;
        log::debug!("read {} records from {}", records.len(), location);
        Ok(Self::from_records(records))
    }
}

impl<T: Tabular> DataFrame<T> {
    /// The on-disk schema of this frame's record shape.
    ///
    /// Derived lazily from the shape, not the records' values, so an
    /// empty frame still resolves one.
    pub fn schema(&self) -> &Schema {
        self.schema.get_or_init(T::schema)
    }
}

impl<T: DeserializeOwned + HasRecordInfo> DataFrame<T> {
    /// Parse and enrich one raw payload via [`ingest::parse_json`], then
    /// append the resulting record.
    pub fn ingest_json(&mut self, raw: &[u8], source_info: &str) -> Result<(), FrameError> {
        let record = ingest::parse_json(raw, source_info)?;
        self.records.push(record);
        Ok(())
    }
}

impl<T> Default for DataFrame<T> {
    fn default() -> Self {
        Self::new()
    }
}
