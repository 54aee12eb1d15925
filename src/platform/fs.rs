// SupportSleuth - platform/fs.rs
//
// Filesystem helpers for the command-line surface: reading uploads from disk
// and writing rendered output or an extracted bundle back out.
//
// Large uploads are memory-mapped; transient read errors are retried with a
// short capped backoff.

use crate::util::constants::LARGE_INPUT_THRESHOLD;
use crate::util::error::SupportSleuthError;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Maximum retry attempts for transient I/O errors.
const MAX_RETRIES: u32 = 3;

/// Backoff delays in milliseconds for each retry attempt.
const RETRY_DELAYS_MS: [u64; 3] = [50, 100, 200];

fn io_error(path: &Path, operation: &'static str, source: io::Error) -> SupportSleuthError {
    SupportSleuthError::Io {
        path: path.to_path_buf(),
        operation,
        source,
    }
}

/// Read an upload's raw bytes.
///
/// Files at or above [`LARGE_INPUT_THRESHOLD`] are memory-mapped instead of
/// read through a heap buffer that grows as it goes.
pub fn read_input(path: &Path) -> Result<Vec<u8>, SupportSleuthError> {
    let size = std::fs::metadata(path)
        .map_err(|e| io_error(path, "stat", e))?
        .len();

    let bytes = if size >= LARGE_INPUT_THRESHOLD {
        read_large_file(path)
    } else {
        with_retry(path, || std::fs::read(path))
    }
    .map_err(|e| io_error(path, "read", e))?;

    tracing::debug!(
        path = %path.display(),
        bytes = bytes.len(),
        mapped = size >= LARGE_INPUT_THRESHOLD,
        "Input read"
    );
    Ok(bytes)
}

/// Read a text file (a saved data URL, for instance).
pub fn read_text(path: &Path) -> Result<String, SupportSleuthError> {
    with_retry(path, || std::fs::read_to_string(path)).map_err(|e| io_error(path, "read", e))
}

/// Write `text` to `path` via a sibling temp file and a rename, so a reader
/// never sees a half-written file.
pub fn write_text_atomic(path: &Path, text: &str) -> Result<(), SupportSleuthError> {
    let tmp = temp_sibling(path);
    let write = || -> io::Result<()> {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        Ok(())
    };
    if let Err(e) = write() {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_error(&tmp, "write", e));
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        io_error(path, "rename", e)
    })
}

/// Write every `(relative path, contents)` pair under `dir`.
///
/// Paths that are absolute or climb out of `dir` are skipped with a warning.
/// Returns the number of files written.
pub fn write_tree<'a>(
    dir: &Path,
    files: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<usize, SupportSleuthError> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, "create directory", e))?;

    let mut written = 0usize;
    for (relative, contents) in files {
        let Some(target) = contained_join(dir, relative) else {
            tracing::warn!(path = relative, "Refusing to extract path outside target directory");
            continue;
        };
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| io_error(parent, "create directory", e))?;
        }
        std::fs::write(&target, contents).map_err(|e| io_error(&target, "write", e))?;
        written += 1;
    }

    tracing::info!(dir = %dir.display(), files = written, "Bundle extracted");
    Ok(written)
}

/// Join `relative` onto `dir` if it stays inside `dir`.
fn contained_join(dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    let mut out = dir.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (out != dir).then_some(out)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read using `memmap2` for large files.
fn read_large_file(path: &Path) -> io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    // SAFETY: the map is read-only and dropped before this function returns.
    // An external writer truncating the file while it is mapped could fault;
    // uploads are finished files, so that risk is accepted.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };
    Ok(mmap.to_vec())
}

/// Run `read`, retrying transient I/O errors with capped backoff.
/// Permanent errors are returned immediately.
fn with_retry<T>(path: &Path, mut read: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut last_err: Option<io::Error> = None;

    for attempt in 0..MAX_RETRIES {
        match read() {
            Ok(value) => return Ok(value),
            Err(e) if is_transient_error(&e) => {
                tracing::debug!(
                    file = %path.display(),
                    attempt = attempt + 1,
                    error = %e,
                    "Transient I/O error, retrying"
                );
                std::thread::sleep(Duration::from_millis(RETRY_DELAYS_MS[attempt as usize]));
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::other("Unknown read error")))
}

/// Returns true for transient I/O errors that are worth retrying.
fn is_transient_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}
