// SupportSleuth - core/frame.rs
//
// Decoder for rotated container logs written by the "local" logging driver.
//
// Wire format, repeated until end of buffer:
//
//   | 4B BE length L | protobuf record (L bytes) | 4B BE length repeat |
//
// A frame that is truncated, fails to decode, or whose trailing length does
// not repeat L is replaced by one inline diagnostic line, after which the
// decoder scans forward byte by byte for the next plausible frame start
// (three zero bytes, any byte, then 0x0A) and carries on from there.

use crate::util::constants::{
    FRAME_DIAGNOSTIC_PREFIX, FRAME_LENGTH_BYTES, FRAME_RESYNC_MARKER, FRAME_RESYNC_WINDOW,
};
use crate::util::error::FrameError;
use chrono::{DateTime, SecondsFormat};
use prost::Message;

/// One container log record.
#[derive(Clone, PartialEq, Message)]
pub struct ContainerRecord {
    /// Stream the line was written to (`stdout` / `stderr`).
    #[prost(string, optional, tag = "1")]
    pub source: Option<String>,

    /// Nanoseconds since the Unix epoch.
    #[prost(uint64, optional, tag = "2")]
    pub time_nano: Option<u64>,

    /// The raw line, without trailing newline.
    #[prost(bytes = "vec", optional, tag = "3")]
    pub line: Option<Vec<u8>>,
}

impl ContainerRecord {
    /// Record with all three fields populated.
    pub fn new(source: &str, time_nano: u64, line: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            time_nano: Some(time_nano),
            line: Some(line.as_bytes().to_vec()),
        }
    }

    /// Render as one text line: `[<ISO-8601>] <line>` when a timestamp is
    /// present, the bare line otherwise.
    pub fn render(&self) -> String {
        let line = self
            .line
            .as_deref()
            .map(String::from_utf8_lossy)
            .unwrap_or_default();

        match self.time_nano.filter(|&ns| ns != 0) {
            Some(ns) => {
                let millis = (ns / 1_000_000) as i64;
                match DateTime::from_timestamp_millis(millis) {
                    Some(ts) => format!(
                        "[{}] {line}",
                        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
                    ),
                    None => line.into_owned(),
                }
            }
            None => line.into_owned(),
        }
    }
}

/// Outcome of decoding one buffer.
#[derive(Debug, Default)]
pub struct DecodeOutcome {
    /// One rendered line per frame (diagnostics included), newline-terminated.
    pub text: String,

    /// Frames decoded successfully.
    pub frames: usize,

    /// Frames replaced by a diagnostic line.
    pub errors: usize,
}

/// Encode one record as a complete frame.
pub fn encode_frame(record: &ContainerRecord) -> Vec<u8> {
    let body = record.encode_to_vec();
    let len = (body.len() as u32).to_be_bytes();
    let mut frame = Vec::with_capacity(body.len() + 2 * FRAME_LENGTH_BYTES);
    frame.extend_from_slice(&len);
    frame.extend_from_slice(&body);
    frame.extend_from_slice(&len);
    frame
}

/// Decode a concatenation of frames into text, one line per frame in file
/// order. `log_name` only feeds the diagnostics.
pub fn decode_frames(buf: &[u8], log_name: &str) -> DecodeOutcome {
    let mut outcome = DecodeOutcome::default();
    let mut pos = 0usize;

    while pos < buf.len() {
        match decode_one(buf, pos) {
            Ok((record, next)) => {
                outcome.text.push_str(&record.render());
                outcome.text.push('\n');
                outcome.frames += 1;
                pos = next;
            }
            Err(err) => {
                outcome.errors += 1;
                tracing::warn!(file = %log_name, error = %err, "Corrupt container log frame");

                let mut diagnostic =
                    format!("{FRAME_DIAGNOSTIC_PREFIX} Error decoding logs in {log_name}: {err}");

                match find_frame_start(buf, pos + 1) {
                    Some(resume) => {
                        let skipped = &buf[pos..resume];
                        diagnostic.push_str(&format!(
                            " - skipped {} bytes to resynchronise: {}",
                            skipped.len(),
                            String::from_utf8_lossy(skipped)
                        ));
                        tracing::debug!(
                            file = %log_name,
                            from = pos,
                            to = resume,
                            "Resynchronised container log"
                        );
                        pos = resume;
                    }
                    None => {
                        let skipped = &buf[pos..];
                        diagnostic.push_str(&format!(
                            " - unable to resynchronise, discarded remaining {} bytes: {}",
                            skipped.len(),
                            String::from_utf8_lossy(skipped)
                        ));
                        pos = buf.len();
                    }
                }

                // Keep the diagnostic on a single line.
                outcome
                    .text
                    .push_str(&diagnostic.replace(['\n', '\r'], " "));
                outcome.text.push('\n');
            }
        }
    }

    tracing::debug!(
        file = %log_name,
        frames = outcome.frames,
        errors = outcome.errors,
        "Container log decoded"
    );

    outcome
}

/// Decode the frame starting at `pos`, returning the record and the offset
/// of the next frame.
fn decode_one(buf: &[u8], pos: usize) -> Result<(ContainerRecord, usize), FrameError> {
    let leading = read_be_u32(buf, pos)?;
    let body_start = pos + FRAME_LENGTH_BYTES;
    let body_end = body_start + leading as usize;

    // The body and its trailer must both fit.
    let needed = body_end + FRAME_LENGTH_BYTES - pos;
    if buf.len() < pos + needed {
        return Err(FrameError::Truncated {
            offset: pos,
            needed,
            available: buf.len() - pos,
        });
    }

    let record = ContainerRecord::decode(&buf[body_start..body_end])
        .map_err(|source| FrameError::Decode { offset: pos, source })?;

    let trailing = read_be_u32(buf, body_end)?;
    if trailing != leading {
        return Err(FrameError::LengthMismatch {
            leading,
            trailing,
            offset: body_end,
        });
    }

    Ok((record, body_end + FRAME_LENGTH_BYTES))
}

fn read_be_u32(buf: &[u8], pos: usize) -> Result<u32, FrameError> {
    let bytes = buf
        .get(pos..pos + FRAME_LENGTH_BYTES)
        .ok_or(FrameError::Truncated {
            offset: pos,
            needed: FRAME_LENGTH_BYTES,
            available: buf.len().saturating_sub(pos),
        })?;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// First offset at or after `from` whose next five bytes look like a frame
/// start: `00 00 00 ?? 0A`.
fn find_frame_start(buf: &[u8], from: usize) -> Option<usize> {
    if buf.len() < FRAME_RESYNC_WINDOW {
        return None;
    }
    (from..=buf.len() - FRAME_RESYNC_WINDOW).find(|&i| {
        buf[i] == 0 && buf[i + 1] == 0 && buf[i + 2] == 0 && buf[i + 4] == FRAME_RESYNC_MARKER
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS_2024_07_16: u64 = 1_721_162_678_339_000_000;

    fn frames(lines: &[&str]) -> Vec<Vec<u8>> {
        lines
            .iter()
            .enumerate()
            .map(|(i, l)| encode_frame(&ContainerRecord::new("stdout", NS_2024_07_16 + i as u64, l)))
            .collect()
    }

    #[test]
    fn test_record_roundtrip() {
        let record = ContainerRecord::new("stderr", NS_2024_07_16, "zigbee up");
        let frame = encode_frame(&record);
        let body = &frame[4..frame.len() - 4];
        let decoded = ContainerRecord::decode(body).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_render_with_timestamp() {
        let record = ContainerRecord::new("stdout", NS_2024_07_16, "hello");
        assert_eq!(record.render(), "[2024-07-16T20:44:38.339Z] hello");
    }

    #[test]
    fn test_render_without_timestamp() {
        let record = ContainerRecord {
            source: None,
            time_nano: None,
            line: Some(b"bare".to_vec()),
        };
        assert_eq!(record.render(), "bare");
    }

    #[test]
    fn test_decode_valid_frames_in_order() {
        let buf: Vec<u8> = frames(&["a", "b", "c"]).concat();
        let outcome = decode_frames(&buf, "core");
        assert_eq!(outcome.frames, 3);
        assert_eq!(outcome.errors, 0);
        let lines: Vec<_> = outcome.text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("] a"));
        assert!(lines[1].ends_with("] b"));
        assert!(lines[2].ends_with("] c"));
    }

    #[test]
    fn test_empty_buffer_decodes_to_nothing() {
        let outcome = decode_frames(&[], "core");
        assert!(outcome.text.is_empty());
        assert_eq!(outcome.frames, 0);
    }

    #[test]
    fn test_corrupt_trailer_resynchronises() {
        let lines = ["one", "two", "three", "four", "five"];
        let mut parts = frames(&lines);
        let k = 2;
        let last = parts[k].len() - 1;
        parts[k][last] ^= 0xFF;
        let buf = parts.concat();

        let outcome = decode_frames(&buf, "core");
        let out: Vec<_> = outcome.text.lines().collect();

        assert_eq!(out.len(), lines.len());
        assert_eq!(outcome.errors, 1);
        for (i, line) in out.iter().enumerate() {
            if i == k {
                assert!(line.starts_with(FRAME_DIAGNOSTIC_PREFIX), "{line}");
                assert!(line.contains("core"));
                assert!(line.contains("length mismatch"));
            } else {
                assert!(line.ends_with(&format!("] {}", lines[i])), "{line}");
            }
        }
    }

    #[test]
    fn test_undecodable_record_reported_and_skipped() {
        let parts = frames(&["one", "two"]);
        // Wire type 7 does not exist, so the body cannot decode.
        let bad: [u8; 11] = [0, 0, 0, 3, 0x0F, 0x01, 0x02, 0, 0, 0, 3];
        let buf = [parts[0].as_slice(), &bad, parts[1].as_slice()].concat();

        let outcome = decode_frames(&buf, "core");
        let out: Vec<_> = outcome.text.lines().collect();

        assert_eq!(out.len(), 3, "{out:?}");
        assert_eq!(outcome.errors, 1);
        assert!(out[0].ends_with("] one"), "{}", out[0]);
        assert!(out[1].starts_with(FRAME_DIAGNOSTIC_PREFIX), "{}", out[1]);
        assert!(out[1].contains("malformed record"), "{}", out[1]);
        assert!(out[2].ends_with("] two"), "{}", out[2]);
    }

    #[test]
    fn test_corrupt_last_frame_reports_failed_recovery() {
        let mut parts = frames(&["a", "b"]);
        let last = parts[1].len() - 1;
        parts[1][last] ^= 0x01;
        let buf = parts.concat();

        let outcome = decode_frames(&buf, "core");
        let out: Vec<_> = outcome.text.lines().collect();
        assert_eq!(out.len(), 2);
        assert!(out[0].ends_with("] a"));
        assert!(out[1].contains("unable to resynchronise"));
    }

    #[test]
    fn test_oversized_length_is_truncation_not_panic() {
        let mut buf = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0A, 0x01];
        buf.extend(frames(&["after"]).concat());
        let outcome = decode_frames(&buf, "core");
        let out: Vec<_> = outcome.text.lines().collect();
        assert_eq!(out.len(), 2);
        assert!(out[0].contains("truncated frame"));
        assert!(out[1].ends_with("] after"));
    }

    #[test]
    fn test_trailing_garbage_shorter_than_header() {
        let mut buf = frames(&["a"]).concat();
        buf.extend_from_slice(&[0x00, 0x01]);
        let outcome = decode_frames(&buf, "core");
        assert_eq!(outcome.frames, 1);
        assert_eq!(outcome.errors, 1);
        assert_eq!(outcome.text.lines().count(), 2);
    }
}
