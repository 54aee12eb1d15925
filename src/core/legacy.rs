// SupportSleuth - core/legacy.rs
//
// Splits an old single-file (RTOS) support package into its parts.
//
// The package is a run of sections separated by `----`. A section whose text
// contains a known header is routed either to its own file (direct sections)
// or into one merged JSON object written to the data model (subsystem
// sections). Headers are matched byte-for-byte.

use crate::core::archive::pretty_json;
use crate::core::store::FileStore;
use crate::util::constants::{
    DATAMODEL_FILE, LEGACY_DB_SECTION, LEGACY_DIRECT_SECTIONS, LEGACY_SECTION_DELIMITER,
    LEGACY_SUBSYSTEM_SECTIONS,
};
use crate::util::error::IngestError;
use serde_json::{Map, Value};

/// A section that was recognised but whose JSON body could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSection {
    pub header: String,
    pub error: String,
}

/// Manifest of one legacy split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyReport {
    /// Files created from direct sections, in creation order.
    pub files_written: Vec<String>,

    /// Subsystem fields merged into the data model.
    pub subsystems: Vec<String>,

    /// Recognised sections dropped because their JSON was malformed.
    pub skipped: Vec<SkippedSection>,
}

impl LegacyReport {
    pub fn is_empty(&self) -> bool {
        self.files_written.is_empty() && self.subsystems.is_empty() && self.skipped.is_empty()
    }
}

/// Split the legacy package stored under `marker`, if any.
///
/// A missing marker is a no-op. With `strict` set, the first malformed JSON
/// section aborts the split; otherwise it is recorded in the report and the
/// remaining sections are still processed. The marker is deleted once the
/// split completes.
pub fn split_legacy(
    store: &mut FileStore,
    marker: &str,
    strict: bool,
) -> Result<LegacyReport, IngestError> {
    let Some(content) = store.get(marker).map(str::to_string) else {
        tracing::debug!(file = %marker, "No legacy package present");
        return Ok(LegacyReport::default());
    };

    let mut report = LegacyReport::default();
    let mut subsystems = Map::new();

    for raw in content.split(LEGACY_SECTION_DELIMITER) {
        let section = raw.trim();

        if let Some((header, destination)) = LEGACY_DIRECT_SECTIONS
            .iter()
            .find(|(header, _)| section.contains(header))
        {
            tracing::debug!(section = %header, to = %destination, "Found legacy section");
            let body = section_body(section, header);

            let contents = if *header == LEGACY_DB_SECTION {
                parse_json(header, body, strict, &mut report)?.map(|value| pretty_json(&value))
            } else {
                Some(body.to_string())
            };

            if let Some(contents) = contents {
                store.create(*destination, contents);
                report.files_written.push(destination.to_string());
            }
        }

        for (header, field) in LEGACY_SUBSYSTEM_SECTIONS {
            if !section.contains(header) {
                continue;
            }
            tracing::debug!(section = %header, field = %field, "Found legacy subsystem section");
            let body = section_body(section, header);
            if let Some(value) = parse_json(header, body, strict, &mut report)? {
                subsystems.insert(field.to_string(), value);
                report.subsystems.push(field.to_string());
            }
        }
    }

    if !subsystems.is_empty() {
        store.create(DATAMODEL_FILE, pretty_json(&Value::Object(subsystems)));
        if !report.files_written.iter().any(|f| f == DATAMODEL_FILE) {
            report.files_written.push(DATAMODEL_FILE.to_string());
        }
    }

    store.delete(marker);

    tracing::info!(
        files = report.files_written.len(),
        subsystems = report.subsystems.len(),
        skipped = report.skipped.len(),
        "Legacy package split"
    );

    Ok(report)
}

/// Text after the first occurrence of `header`, trimmed.
fn section_body<'a>(section: &'a str, header: &str) -> &'a str {
    section
        .split_once(header)
        .map(|(_, rest)| rest.trim())
        .unwrap_or_default()
}

/// Parse a section body as JSON, honouring strict mode.
fn parse_json(
    header: &str,
    body: &str,
    strict: bool,
    report: &mut LegacyReport,
) -> Result<Option<Value>, IngestError> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(Some(value)),
        Err(source) if strict => Err(IngestError::LegacyJson {
            section: header.to_string(),
            source,
        }),
        Err(e) => {
            tracing::warn!(section = %header, error = %e, "Skipping malformed legacy JSON section");
            report.skipped.push(SkippedSection {
                header: header.to_string(),
                error: e.to_string(),
            });
            Ok(None)
        }
    }
}
