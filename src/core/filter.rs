// SupportSleuth - core/filter.rs
//
// Filter state for the rendered log view.
// All active criteria are AND-combined.
// Core layer: pure logic, no I/O.

use crate::core::database::LogDatabase;
use crate::core::model::{LogEntry, Severity};
use crate::core::store::logical_name;
use crate::util::error::FilterError;
use chrono::DateTime;
use std::collections::{BTreeMap, BTreeSet};

/// Which logs contribute to the rendered view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FileSelection {
    /// Every ingested log.
    #[default]
    All,

    /// Only these logs. Names may be logical (`core`) or store paths
    /// (`logs/core.log`); both resolve to the logical name.
    Only(BTreeSet<String>),
}

impl FileSelection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Only(
            names
                .into_iter()
                .map(|n| logical_name(n.as_ref()).to_string())
                .collect(),
        )
    }
}

/// Complete filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub files: FileSelection,

    /// Keep only entries at least this severe. `None` = no floor.
    pub severity_floor: Option<Severity>,

    /// Keep only entries from these components. `None` = any component.
    pub components: Option<BTreeSet<String>>,

    /// Per-component floors. A floor of [`Severity::None`] hides the
    /// component entirely.
    pub component_floors: BTreeMap<String, Severity>,

    /// Inclusive lower bound, epoch milliseconds.
    pub timestamp_start: Option<i64>,

    /// Inclusive upper bound, epoch milliseconds.
    pub timestamp_end: Option<i64>,

    /// Prefix every rendered line with its epoch-millisecond timestamp.
    pub include_timestamp: bool,

    /// Wrap every rendered line in its source's colour code.
    pub colorize: bool,
}

impl Filter {
    /// True if the entry passes every criterion except the file selection,
    /// which is resolved through the file index.
    pub fn passes(&self, entry: &LogEntry) -> bool {
        if let Some(floor) = self.severity_floor {
            if !entry.severity.at_least(floor) {
                return false;
            }
        }

        if let Some(ref components) = self.components {
            if !components.contains(&entry.component) {
                return false;
            }
        }

        if let Some(floor) = self.component_floors.get(&entry.component) {
            if !entry.severity.at_least(*floor) {
                return false;
            }
        }

        self.in_time_range(entry.timestamp_ms)
    }

    pub fn in_time_range(&self, timestamp_ms: i64) -> bool {
        self.timestamp_start.map_or(true, |start| timestamp_ms >= start)
            && self.timestamp_end.map_or(true, |end| timestamp_ms <= end)
    }

    /// Check every named file and component against the database.
    ///
    /// Unvalidated filters are still safe to render: unknown names just
    /// select nothing.
    pub fn validate(&self, db: &LogDatabase) -> Result<(), FilterError> {
        if let FileSelection::Only(ref names) = self.files {
            for name in names {
                if !db.file_index().contains_key(logical_name(name)) {
                    return Err(FilterError::UnknownFile { name: name.clone() });
                }
            }
        }

        let named_components = self
            .components
            .iter()
            .flatten()
            .chain(self.component_floors.keys());
        for name in named_components {
            if !db.component_index().contains_key(name) {
                return Err(FilterError::UnknownComponent { name: name.clone() });
            }
        }

        Ok(())
    }
}

/// Parse a time bound given as RFC 3339 or as epoch milliseconds.
pub fn parse_time_bound(raw: &str) -> Result<i64, FilterError> {
    let trimmed = raw.trim();
    if let Ok(ms) = trimmed.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| FilterError::InvalidTimestamp {
            raw: raw.to_string(),
        })
}

/// Parse `component=severity`.
pub fn parse_component_floor(raw: &str) -> Result<(String, Severity), FilterError> {
    let (component, severity) = raw
        .split_once('=')
        .ok_or_else(|| FilterError::InvalidComponentFloor {
            raw: raw.to_string(),
        })?;
    let component = component.trim();
    if component.is_empty() {
        return Err(FilterError::InvalidComponentFloor {
            raw: raw.to_string(),
        });
    }
    Ok((component.to_string(), severity.parse()?))
}
