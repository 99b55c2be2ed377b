//! Codec abstraction: records to bytes and back.
//!
//! A [`Codec`] turns an in-memory sequence of records into a persisted
//! artifact's bytes and reconstructs the sequence from them. The two
//! built-in variants are [`ParquetCodec`](crate::codec_parquet::ParquetCodec)
//! (columnar, schema-projected) and
//! [`JsonlCodec`](crate::codec_jsonl::JsonlCodec) (line-delimited,
//! whole-record). Codecs know nothing about where bytes live; backends
//! know nothing about what they contain.

use std::io::{Read, Write};

use crate::error::FrameError;

/// Encode a record sequence to a byte sink, and decode one from a byte
/// source.
///
/// Encoding writes records in the order given and fails atomically: the
/// first record that cannot be encoded aborts the whole artifact (the
/// sink is never committed), and encode is not resumable. Decoding
/// reconstructs records in on-artifact order.
pub trait Codec<T> {
    /// Encode `records` into `sink`.
    fn encode<W: Write + Send>(&self, records: &[T], sink: W) -> Result<(), FrameError>;

    /// Decode all records out of `source`.
    fn decode<R: Read>(&self, source: R) -> Result<Vec<T>, FrameError>;
}
