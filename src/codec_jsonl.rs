//! Line-delimited JSON codec.
//!
//! One self-contained JSON object per `\n`-terminated line, serialized
//! whole-record under the shape's external (serde) field names — no
//! schema projection, independent of the columnar mapper. Decoding skips
//! blank lines and is strict: the first malformed line fails the whole
//! decode with its 1-based line number.

use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::Codec;
use crate::error::FrameError;

/// The line-delimited codec. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlCodec;

impl JsonlCodec {
    pub fn new() -> Self {
        JsonlCodec
    }
}

impl<T> Codec<T> for JsonlCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode<W: Write + Send>(&self, records: &[T], sink: W) -> Result<(), FrameError> {
        let mut out = BufWriter::new(sink);
        for (index, record) in records.iter().enumerate() {
            // Serialize fully before writing so a failing record never
            // leaves a partial line in the stream.
            let mut line = serde_json::to_vec(record).map_err(|e| FrameError::BadRecord {
                index,
                source: Box::new(FrameError::Json(e)),
            })?;
            line.push(b'\n');
            out.write_all(&line)?;
        }
        out.flush()?;
        Ok(())
    }

    fn decode<R: Read>(&self, source: R) -> Result<Vec<T>, FrameError> {
        let reader = BufReader::new(source);
        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: T =
                serde_json::from_str(&line).map_err(|e| FrameError::MalformedLine {
                    line: idx + 1,
                    source: e,
                })?;
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i64,
        label: String,
    }

    #[test]
    fn test_roundtrip_preserves_order_and_values() {
        let points = vec![
            Point {
                x: 1,
                label: "a".to_string(),
            },
            Point {
                x: -2,
                label: "b".to_string(),
            },
        ];
        let mut buf = Vec::new();
        JsonlCodec::new().encode(&points, &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));

        let back: Vec<Point> = JsonlCodec::new().decode(buf.as_slice()).unwrap();
        assert_eq!(back, points);
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let input = b"{\"x\":1,\"label\":\"a\"}\n\n   \n{\"x\":2,\"label\":\"b\"}\n";
        let back: Vec<Point> = JsonlCodec::new().decode(&input[..]).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].x, 2);
    }

    #[test]
    fn test_malformed_line_fails_with_line_number() {
        let input = b"{\"x\":1,\"label\":\"a\"}\n{not json}\n{\"x\":3,\"label\":\"c\"}\n";
        let result: Result<Vec<Point>, FrameError> = JsonlCodec::new().decode(&input[..]);
        match result.unwrap_err() {
            FrameError::MalformedLine { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_input_decodes_to_empty() {
        let back: Vec<Point> = JsonlCodec::new().decode(&b""[..]).unwrap();
        assert!(back.is_empty());
    }
}
