// SupportSleuth - core/archive.rs
//
// Unpacks a gzip-wrapped tar support package into the flat file store.
//
// - Members that are themselves gzip-compressed are inflated and stored
//   without their `.gz` suffix.
// - Rotated container logs are decoded from binary frames to text.
// - JSON members are re-serialised in indented form.
//
// A bundle that is not gzip+tar is not an error: it is an old single-file
// package, stored verbatim under the legacy marker name. Nothing here
// returns an error to the caller.

use crate::core::frame;
use crate::core::store::FileStore;
use crate::util::constants::{
    COMPRESSED_SUFFIX, CONTAINER_LOG_FILE, CONTAINER_LOG_ROOT, DEFAULT_MAX_DECOMPRESSED_BYTES,
    JSON_INDENT, JSON_SUFFIX, LEGACY_PACKAGE_FILE,
};
use flate2::read::GzDecoder;
use serde::Serialize;
use std::io::{self, Read};

/// gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Resource bounds applied while unpacking.
#[derive(Debug, Clone, Copy)]
pub struct UnpackLimits {
    /// Maximum output of any single gzip stream.
    pub max_decompressed_bytes: u64,
}

impl Default for UnpackLimits {
    fn default() -> Self {
        Self {
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
        }
    }
}

/// One extracted, decoded member of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveMember {
    /// Store path (`./` prefix and `.gz` suffix removed).
    pub path: String,

    /// Decoded text.
    pub contents: String,
}

/// The input is not a gzip+tar bundle; treat it as a legacy package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFallback {
    pub reason: String,
}

/// What [`unpack_into`] did with the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnpackOutcome {
    /// Multi-file bundle; this many members were stored.
    Archive { members: usize },

    /// Old single-file package, stored under the legacy marker name.
    Legacy { reason: String },
}

/// Populate `store` from the raw upload bytes.
pub fn unpack_into(store: &mut FileStore, bytes: &[u8], limits: &UnpackLimits) -> UnpackOutcome {
    match unpack_archive(bytes, limits) {
        Ok(members) => {
            let count = members.len();
            for member in members {
                store.create(member.path, member.contents);
            }
            tracing::info!(members = count, "Support package unpacked");
            UnpackOutcome::Archive { members: count }
        }
        Err(fallback) => {
            tracing::info!(
                reason = %fallback.reason,
                "Not a gzip/tar bundle; treating as a legacy single-file package"
            );
            store.create(LEGACY_PACKAGE_FILE, String::from_utf8_lossy(bytes));
            UnpackOutcome::Legacy {
                reason: fallback.reason,
            }
        }
    }
}

/// Gunzip and untar `bytes`, returning every non-empty regular file.
///
/// Any failure of the outer gzip stream or of the tar structure yields
/// `Err(LegacyFallback)`; no partial member list is returned in that case.
pub fn unpack_archive(
    bytes: &[u8],
    limits: &UnpackLimits,
) -> Result<Vec<ArchiveMember>, LegacyFallback> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Err(LegacyFallback {
            reason: "missing gzip header".to_string(),
        });
    }

    let tarball = gunzip(bytes, limits.max_decompressed_bytes).map_err(|e| LegacyFallback {
        reason: format!("gunzip failed: {e}"),
    })?;

    read_tar(&tarball, limits).map_err(|e| LegacyFallback {
        reason: format!("tar parse failed: {e}"),
    })
}

fn read_tar(tarball: &[u8], limits: &UnpackLimits) -> io::Result<Vec<ArchiveMember>> {
    let mut archive = tar::Archive::new(tarball);
    let mut members = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let raw_path = entry.path()?.to_string_lossy().replace('\\', "/");
        let path = raw_path.trim_start_matches("./").to_string();

        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        if data.is_empty() || path.is_empty() {
            continue;
        }

        tracing::debug!(file = %path, bytes = data.len(), "Archive member available");
        members.push(decode_member(path, data, limits));
    }

    Ok(members)
}

/// Inflate (if `.gz`) and decode one member to text.
fn decode_member(path: String, data: Vec<u8>, limits: &UnpackLimits) -> ArchiveMember {
    let stripped = path.strip_suffix(COMPRESSED_SUFFIX).map(str::to_string);
    let (path, data) = match stripped {
        Some(stripped) => match gunzip(&data, limits.max_decompressed_bytes) {
            Ok(inflated) => {
                tracing::debug!(file = %path, to = %stripped, "Decompressed nested member");
                (stripped, inflated)
            }
            Err(e) => {
                tracing::warn!(
                    file = %path,
                    error = %e,
                    "Nested member could not be decompressed; keeping it verbatim"
                );
                (path, data)
            }
        },
        None => (path, data),
    };

    // A member that failed to inflate still holds gzip bytes, not frames.
    let contents = if is_container_log(&path) && !path.ends_with(COMPRESSED_SUFFIX) {
        frame::decode_frames(&data, &path).text
    } else {
        String::from_utf8_lossy(&data).into_owned()
    };

    let contents = if path.ends_with(JSON_SUFFIX) {
        match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(value) => pretty_json(&value),
            Err(e) => {
                tracing::debug!(file = %path, error = %e, "JSON member kept as-is");
                contents
            }
        }
    } else {
        contents
    };

    ArchiveMember { path, contents }
}

/// True for rotated container logs (`logs/<name>/container.log[.<n>]`).
pub fn is_container_log(path: &str) -> bool {
    path.starts_with(CONTAINER_LOG_ROOT)
        && path
            .find(&format!("/{CONTAINER_LOG_FILE}"))
            .is_some_and(|idx| idx > 0)
}

/// Inflate one gzip stream, refusing output larger than `limit` bytes.
pub fn gunzip(bytes: &[u8], limit: u64) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)?;
    if out.len() as u64 > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decompressed size exceeds limit of {limit} bytes"),
        ));
    }
    Ok(out)
}

/// Serialise `value` with the package-wide JSON indentation.
pub fn pretty_json(value: &serde_json::Value) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        // Writing into a Vec cannot fail; fall back to the compact form.
        Err(_) => value.to_string(),
    }
}
