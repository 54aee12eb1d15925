// SupportSleuth - core/export.rs
//
// Text, CSV and JSON export of the current view.
// Core layer: writes to any Write trait object; the caller owns the file.

use crate::core::model::LogEntry;
use crate::util::error::ExportError;
use chrono::{DateTime, SecondsFormat};
use std::io::Write;
use std::path::Path;

/// Write the rendered view as UTF-8 text (the download artefact).
///
/// Returns the number of bytes written.
pub fn export_text<W: Write>(
    rendered: &str,
    mut writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let io_err = |source| ExportError::Io {
        path: export_path.to_path_buf(),
        source,
    };
    writer.write_all(rendered.as_bytes()).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(rendered.len())
}

/// Export entries to CSV.
///
/// Writes: timestamp_ms, timestamp, source_file, severity, component, message
pub fn export_csv<W: Write>(
    entries: &[&LogEntry],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: export_path.to_path_buf(),
        source,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record([
            "timestamp_ms",
            "timestamp",
            "source_file",
            "severity",
            "component",
            "message",
        ])
        .map_err(csv_err)?;

    for entry in entries {
        let millis = entry.timestamp_ms.to_string();
        let iso = iso_timestamp(entry.timestamp_ms);
        csv_writer
            .write_record([
                millis.as_str(),
                iso.as_str(),
                entry.source_file.as_str(),
                entry.severity.name(),
                entry.component.as_str(),
                entry.message.as_str(),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(entries.len())
}

/// Export entries to JSON (array of objects).
pub fn export_json<W: Write>(
    entries: &[&LogEntry],
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(writer, entries).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(entries.len())
}

/// ISO-8601 form of an epoch-millisecond timestamp; empty when unknown.
fn iso_timestamp(ms: i64) -> String {
    if ms == 0 {
        return String::new();
    }
    DateTime::from_timestamp_millis(ms)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
