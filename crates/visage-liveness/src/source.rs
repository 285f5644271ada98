//! Landmark frame sources.
//!
//! The session itself is independent of how frames arrive. Live pipelines
//! push frames from a capture loop; recordings are replayed from JSON Lines,
//! one [`LandmarkFrame`] object per line.

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::RawFace;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read frame source: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: invalid landmark frame: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// One frame of detections from the landmark extractor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Capture time in milliseconds. Assigned by the consumer when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    #[serde(default)]
    pub faces: Vec<RawFace>,
}

/// Iterator over frames stored as JSON Lines.
///
/// Blank lines and lines starting with `#` are skipped.
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Result<LandmarkFrame, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(SourceError::Io(e))),
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            return Some(
                serde_json::from_str(text).map_err(|source| SourceError::Parse {
                    line: self.line,
                    source,
                }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_frames_and_skips_comments() {
        let input = "# recorded at 10 fps\n\
                     {\"timestamp_ms\": 0, \"faces\": []}\n\
                     \n\
                     {\"faces\": []}\n";
        let frames: Vec<_> = JsonLinesSource::new(Cursor::new(input))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].timestamp_ms, Some(0));
        assert_eq!(frames[1].timestamp_ms, None);
        assert!(frames[1].faces.is_empty());
    }

    #[test]
    fn test_parse_error_reports_line() {
        let input = "{\"faces\": []}\n# comment\nnot json\n";
        let mut src = JsonLinesSource::new(Cursor::new(input));
        assert!(src.next().unwrap().is_ok());
        match src.next().unwrap() {
            Err(SourceError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_faces_field_defaults_empty() {
        let frame: LandmarkFrame = serde_json::from_str("{\"timestamp_ms\": 42}").unwrap();
        assert!(frame.faces.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(JsonLinesSource::new(Cursor::new("")).next().is_none());
    }
}
