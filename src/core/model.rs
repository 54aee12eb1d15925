// SupportSleuth - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Log Entry (normalised output of parsing)
// =============================================================================

/// A single parsed log line, normalised across all dialects.
///
/// Created once per non-blank line during ingestion and never mutated
/// afterwards. `message` is the original line including any embedded
/// timestamp/component/severity markup; only the epoch-seconds dialect
/// rewrites it (to put a readable timestamp in front).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch. 0 means unknown.
    pub timestamp_ms: i64,

    /// Short logical name of the originating log (`logs/core.log` -> `core`).
    pub source_file: String,

    /// Severity extracted from the line, or the default.
    pub severity: Severity,

    /// Subsystem name embedded in the line; empty when none was found.
    pub component: String,

    /// The line as rendered.
    pub message: String,

    /// Rendering hint: palette slot of the originating log.
    pub colour: ColourTag,
}

/// Opaque per-source rendering hint.
///
/// Holds the palette slot assigned to the originating log; the slot index
/// keeps growing past the palette length and wraps when resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct ColourTag(pub usize);

impl ColourTag {
    /// Terminal escape code for this tag.
    pub fn code(&self) -> &'static str {
        let palette = crate::util::constants::COLOUR_PALETTE;
        palette[self.0 % palette.len()]
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Syslog-style severity levels, ordered from least to most severe.
///
/// `None` is a sentinel used only as an "exclude everything" filter floor;
/// it is never assigned to a parsed entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    Debug = 1,
    Info = 2,
    #[default]
    Notice = 3,
    Warning = 4,
    Error = 5,
    Critical = 6,
    Alert = 7,
    Emergency = 8,
    None = 100,
}

impl Severity {
    /// The most severe level a real entry can carry.
    pub const HIGHEST: Severity = Severity::Emergency;

    /// Level assigned when a line's severity cannot be derived.
    pub const DEFAULT: Severity = Severity::Notice;

    /// Every level a real entry can carry, most severe first.
    pub fn levels() -> &'static [Severity] {
        &[
            Severity::Emergency,
            Severity::Alert,
            Severity::Critical,
            Severity::Error,
            Severity::Warning,
            Severity::Notice,
            Severity::Info,
            Severity::Debug,
        ]
    }

    /// Numeric syslog-style value.
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Reverse of [`Severity::value`].
    pub fn from_value(value: u8) -> Option<Severity> {
        match value {
            1 => Some(Severity::Debug),
            2 => Some(Severity::Info),
            3 => Some(Severity::Notice),
            4 => Some(Severity::Warning),
            5 => Some(Severity::Error),
            6 => Some(Severity::Critical),
            7 => Some(Severity::Alert),
            8 => Some(Severity::Emergency),
            100 => Some(Severity::None),
            _ => None,
        }
    }

    /// Lowercase canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
            Severity::Alert => "alert",
            Severity::Emergency => "emergency",
            Severity::None => "none",
        }
    }

    /// Case-insensitive name lookup.
    pub fn from_name(name: &str) -> Option<Severity> {
        match name.trim().to_lowercase().as_str() {
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            "notice" => Some(Severity::Notice),
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            "critical" => Some(Severity::Critical),
            "alert" => Some(Severity::Alert),
            "emergency" => Some(Severity::Emergency),
            "none" => Some(Severity::None),
            _ => None,
        }
    }

    /// Case-insensitive name lookup, falling back to [`Severity::DEFAULT`].
    pub fn from_name_or_default(name: &str) -> Severity {
        Self::from_name(name).unwrap_or(Self::DEFAULT)
    }

    /// True if an entry at this level passes a floor of `floor`.
    pub fn at_least(&self, floor: Severity) -> bool {
        floor != Severity::None && *self != Severity::None && *self >= floor
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = crate::util::error::FilterError;

    /// Accepts a level name (any case) or its numeric value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || crate::util::error::FilterError::UnknownSeverity {
            name: s.to_string(),
        };
        match s.trim().parse::<u8>() {
            Ok(value) => Severity::from_value(value).ok_or_else(unknown),
            Err(_) => Severity::from_name(s).ok_or_else(unknown),
        }
    }
}

// =============================================================================
// Analysed File (per-log summary)
// =============================================================================

/// Summary of one parsed log, shown by the analysis view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysedFile {
    /// Short logical name used in the file index.
    pub name: String,

    /// Full path of the log in the file store.
    pub path: String,

    /// Number of entries produced.
    pub entry_count: usize,

    /// Earliest non-zero timestamp seen, if any.
    pub earliest_ms: Option<i64>,

    /// Latest non-zero timestamp seen, if any.
    pub latest_ms: Option<i64>,

    /// Palette slot of this log.
    pub colour: ColourTag,
}

// =============================================================================
// View selection
// =============================================================================

/// What the collaborator currently displays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    /// Per-file summaries.
    #[default]
    Analysis,

    /// The filtered, merged log.
    AllLogs,

    /// One file from the store, shown verbatim.
    File(String),
}
