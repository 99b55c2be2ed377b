//! Schema-enrichment parser.
//!
//! Turns a raw ingested payload into a record of the target shape with
//! provenance stamped on it. Per call:
//!
//! 1. decode the payload as JSON into the target shape;
//! 2. hash the exact payload bytes (SHA-256, hex) — the record's content
//!    fingerprint, independent of how the payload was parsed;
//! 3. capture the ingestion wall-clock time (UTC, milliseconds);
//! 4. install the [`RecordInfo`] through the shape's
//!    [`HasRecordInfo`] slot.
//!
//! Enrichment is mandatory, not best-effort: downstream consumers rely
//! on provenance being present on anything that passed through here,
//! which is why the metadata slot is a trait bound resolved at compile
//! time rather than a lookup that can fail at runtime.

use chrono::Utc;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use crate::error::FrameError;
use crate::models::{HasRecordInfo, RecordInfo};

/// Parse one raw JSON payload into an enriched record.
///
/// `source_info` is a free-text label of where the payload came from and
/// is stored verbatim in the provenance block.
///
/// # Errors
///
/// [`FrameError::Decode`] when the payload does not match the target
/// shape; the error carries the verbatim payload and the underlying
/// cause.
pub fn parse_json<T>(raw: &[u8], source_info: &str) -> Result<T, FrameError>
where
    T: DeserializeOwned + HasRecordInfo,
{
    let mut record: T = serde_json::from_slice(raw).map_err(|e| FrameError::Decode {
        shape: std::any::type_name::<T>(),
        payload: String::from_utf8_lossy(raw).into_owned(),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(raw);
    let row_hash = format!("{:x}", hasher.finalize());

    record.set_record_info(RecordInfo {
        raw_data: String::from_utf8_lossy(raw).into_owned(),
        row_hash,
        ingest_timestamp: Utc::now().timestamp_millis(),
        source_info: source_info.to_string(),
    });

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Student {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Age")]
        age: i32,
        #[serde(rename = "Id")]
        id: i64,
        #[serde(rename = "Weight")]
        weight: f32,
        #[serde(rename = "Sex")]
        sex: bool,
        #[serde(rename = "Day")]
        day: i32,
        #[serde(rename = "_recordinfo", default)]
        info: Option<RecordInfo>,
    }

    impl HasRecordInfo for Student {
        fn set_record_info(&mut self, info: RecordInfo) {
            self.info = Some(info);
        }
        fn record_info(&self) -> Option<&RecordInfo> {
            self.info.as_ref()
        }
    }

    #[derive(Debug, Deserialize)]
    struct NameOnly {
        #[serde(rename = "Name")]
        #[allow(dead_code)]
        name: String,
        #[serde(skip)]
        info: Option<RecordInfo>,
    }

    impl HasRecordInfo for NameOnly {
        fn set_record_info(&mut self, info: RecordInfo) {
            self.info = Some(info);
        }
        fn record_info(&self) -> Option<&RecordInfo> {
            self.info.as_ref()
        }
    }

    const PAYLOAD: &[u8] =
        br#"{"Name":"Alice","Age":22,"Id":1001,"Weight":65.5,"Sex":false,"Day":10957}"#;

    #[test]
    fn test_enrichment_populates_all_provenance() {
        let student: Student = parse_json(PAYLOAD, "myjson").unwrap();
        assert_eq!(student.name, "Alice");
        assert_eq!(student.age, 22);
        assert_eq!(student.id, 1001);
        assert_eq!(student.weight, 65.5);
        assert!(!student.sex);
        assert_eq!(student.day, 10957);

        let info = student.record_info().expect("enriched record has info");
        assert!(!info.row_hash.is_empty());
        assert!(info.ingest_timestamp > 0);
        assert_eq!(info.source_info, "myjson");
        assert_eq!(info.raw_data.as_bytes(), PAYLOAD);
    }

    #[test]
    fn test_hash_is_deterministic_across_shapes_and_sources() {
        let a: Student = parse_json(PAYLOAD, "first").unwrap();
        let b: Student = parse_json(PAYLOAD, "second").unwrap();
        let c: NameOnly = parse_json(PAYLOAD, "third").unwrap();

        let hash_a = &a.record_info().unwrap().row_hash;
        let hash_b = &b.record_info().unwrap().row_hash;
        let hash_c = &c.record_info().unwrap().row_hash;
        assert_eq!(hash_a, hash_b);
        assert_eq!(hash_a, hash_c);
    }

    #[test]
    fn test_hash_differs_for_different_payloads() {
        let a: Student = parse_json(PAYLOAD, "src").unwrap();
        let other =
            br#"{"Name":"Bob","Age":22,"Id":1002,"Weight":65.5,"Sex":false,"Day":10957}"#;
        let b: Student = parse_json(other, "src").unwrap();
        assert_ne!(
            a.record_info().unwrap().row_hash,
            b.record_info().unwrap().row_hash
        );
    }

    #[test]
    fn test_decode_failure_carries_payload() {
        let bad = br#"{"Name":12}"#;
        let err = parse_json::<Student>(bad, "myjson").unwrap_err();
        match err {
            FrameError::Decode { payload, shape, .. } => {
                assert_eq!(payload.as_bytes(), bad);
                assert!(shape.contains("Student"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
