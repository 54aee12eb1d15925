// SupportSleuth - core/upload.rs
//
// The upload boundary: the only place raw input enters the pipeline.
// Only `.tgz` uploads are accepted; in-browser data URLs are unwrapped here.

use crate::util::constants::{DATA_URL_PREFIX, UPLOAD_SUFFIX};
use crate::util::error::IngestError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// One uploaded support package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// File name as supplied by the uploader.
    pub name: String,

    /// Raw bytes (gzip+tar, or a legacy text package).
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Unwrap `data:<mime>;base64,<payload>`.
    ///
    /// Everything up to the first `,` is treated as the header; the rest must
    /// be standard base64.
    pub fn from_data_url(name: impl Into<String>, data_url: &str) -> Result<Self, IngestError> {
        let trimmed = data_url.trim();
        if !trimmed.starts_with(DATA_URL_PREFIX) {
            return Err(IngestError::MalformedDataUrl {
                reason: "missing 'data:' prefix",
            });
        }
        let (_, payload) = trimmed
            .split_once(',')
            .ok_or(IngestError::MalformedDataUrl {
                reason: "no ',' between header and payload",
            })?;
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|source| IngestError::Base64 { source })?;
        Ok(Self::new(name, bytes))
    }

    /// Reject uploads that must not reach the pipeline.
    pub fn validate(&self, max_bytes: u64) -> Result<(), IngestError> {
        if !self.name.ends_with(UPLOAD_SUFFIX) {
            return Err(IngestError::UnsupportedUpload {
                name: self.name.clone(),
            });
        }
        let size = self.bytes.len() as u64;
        if size > max_bytes {
            return Err(IngestError::InputTooLarge {
                size,
                max: max_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_tgz_accepted() {
        assert!(Upload::new("bundle.tgz", vec![1]).validate(10).is_ok());
        assert!(matches!(
            Upload::new("bundle.zip", vec![1]).validate(10),
            Err(IngestError::UnsupportedUpload { .. })
        ));
        assert!(matches!(
            Upload::new("bundle.tar.gz", vec![1]).validate(10),
            Err(IngestError::UnsupportedUpload { .. })
        ));
    }

    #[test]
    fn test_size_limit() {
        let err = Upload::new("b.tgz", vec![0; 11]).validate(10).unwrap_err();
        assert!(matches!(err, IngestError::InputTooLarge { size: 11, max: 10 }));
    }

    #[test]
    fn test_data_url_decodes_payload() {
        let upload =
            Upload::from_data_url("b.tgz", "data:application/gzip;base64,SGVsbG8=").unwrap();
        assert_eq!(upload.bytes, b"Hello");
        assert_eq!(upload.name, "b.tgz");
    }

    #[test]
    fn test_data_url_errors() {
        assert!(matches!(
            Upload::from_data_url("b.tgz", "data:application/gzip;base64"),
            Err(IngestError::MalformedDataUrl { .. })
        ));
        assert!(matches!(
            Upload::from_data_url("b.tgz", "SGVsbG8="),
            Err(IngestError::MalformedDataUrl { .. })
        ));
        assert!(matches!(
            Upload::from_data_url("b.tgz", "data:x;base64,***"),
            Err(IngestError::Base64 { .. })
        ));
    }
}
