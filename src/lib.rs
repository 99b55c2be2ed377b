//! # Rowboat
//!
//! A typed tabular-data container with pluggable codecs and storage
//! backends.
//!
//! Rowboat stores an ordered sequence of records of one shape in a
//! [`DataFrame`](dataframe::DataFrame), persists it through a codec
//! (columnar Parquet or line-delimited JSON) composed with a backend
//! (local filesystem or S3-compatible object storage), and populates it
//! from raw ingested payloads via a schema-enrichment parser that stamps
//! each record with content-addressed provenance.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Raw payloads │──▶│   Ingest    │──▶│ DataFrame<T> │
//! │ (JSON bytes) │   │ + enrich    │   │  (records)   │
//! └──────────────┘   └─────────────┘   └──────┬───────┘
//!                                             │ write / read
//!                            ┌────────────────┴───────────────┐
//!                            ▼                                ▼
//!                      ┌───────────┐                   ┌────────────┐
//!                      │   Codec   │                   │  Backend   │
//!                      │ Parquet / │ ──── bytes ─────▶ │  FS / S3   │
//!                      │   JSONL   │                   │            │
//!                      └───────────┘                   └────────────┘
//! ```
//!
//! Codec and backend are independent capability sets composed at the
//! call site, so new encodings and stores plug in without touching the
//! container.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`schema`] | Record-shape to on-disk schema mapping (`Tabular`) |
//! | [`models`] | Provenance block (`RecordInfo`) and its capability trait |
//! | [`codec`] | Codec contract |
//! | [`codec_parquet`] | Columnar Parquet codec |
//! | [`codec_jsonl`] | Line-delimited JSON codec |
//! | [`backend`] | Storage backend contract |
//! | [`backend_fs`] | Local filesystem backend |
//! | [`backend_s3`] | S3-compatible object storage backend |
//! | [`dataframe`] | The container and write/read orchestration |
//! | [`ingest`] | Schema-enrichment parser |
//! | [`error`] | Error taxonomy |

pub mod backend;
pub mod backend_fs;
pub mod backend_s3;
pub mod codec;
pub mod codec_jsonl;
pub mod codec_parquet;
pub mod dataframe;
pub mod error;
pub mod ingest;
pub mod models;
pub mod schema;
