// SupportSleuth - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; every variant keeps its cause so the
// full chain reaches the diagnostic log.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all SupportSleuth operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum SupportSleuthError {
    /// Support-package ingestion failed.
    Ingest(IngestError),

    /// Filter value could not be interpreted.
    Filter(FilterError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for SupportSleuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest(e) => write!(f, "Ingest error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for SupportSleuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ingest(e) => Some(e),
            Self::Filter(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

/// Pipeline stage names, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Unpack,
    SplitLegacy,
    MergeRollingLogs,
    MergeContainerLogs,
    BuildDatabase,
}

impl Stage {
    /// All stages in the order the orchestrator runs them.
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Unpack,
            Stage::SplitLegacy,
            Stage::MergeRollingLogs,
            Stage::MergeContainerLogs,
            Stage::BuildDatabase,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Unpack => "unpack",
            Stage::SplitLegacy => "split legacy package",
            Stage::MergeRollingLogs => "merge rolling text logs",
            Stage::MergeContainerLogs => "merge container logs",
            Stage::BuildDatabase => "build log database",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Errors related to accepting and ingesting one support package.
#[derive(Debug)]
pub enum IngestError {
    /// The upload name does not carry the accepted suffix.
    UnsupportedUpload { name: String },

    /// A data-URL upload had no `,` separating header and payload.
    MalformedDataUrl { reason: &'static str },

    /// The base64 payload of a data-URL upload could not be decoded.
    Base64 { source: base64::DecodeError },

    /// The upload exceeds the configured size limit.
    InputTooLarge { size: u64, max: u64 },

    /// A legacy-package JSON section was malformed (strict mode only).
    LegacyJson {
        section: String,
        source: serde_json::Error,
    },

    /// A pipeline stage failed; earlier stages have already mutated the store.
    Stage {
        stage: Stage,
        completed: Vec<Stage>,
        source: Box<IngestError>,
    },

    /// The background ingestion did not finish in time.
    TimedOut { seconds: u64 },

    /// The background ingestion thread went away without reporting.
    WorkerLost,
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedUpload { name } => write!(
                f,
                "'{name}' is not a support package; only {} uploads are accepted",
                crate::util::constants::UPLOAD_SUFFIX
            ),
            Self::MalformedDataUrl { reason } => write!(f, "Malformed data URL: {reason}"),
            Self::Base64 { source } => write!(f, "Data URL payload is not valid base64: {source}"),
            Self::InputTooLarge { size, max } => write!(
                f,
                "Support package is {size} bytes, exceeds maximum of {max} bytes"
            ),
            Self::LegacyJson { section, source } => {
                write!(f, "Legacy section '{section}' is not valid JSON: {source}")
            }
            Self::Stage {
                stage,
                completed,
                source,
            } => write!(
                f,
                "Stage '{stage}' failed after {} completed stage(s): {source}",
                completed.len()
            ),
            Self::TimedOut { seconds } => {
                write!(f, "Ingestion did not finish within {seconds} seconds")
            }
            Self::WorkerLost => write!(f, "Ingestion worker exited without reporting a result"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Base64 { source } => Some(source),
            Self::LegacyJson { source, .. } => Some(source),
            Self::Stage { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<IngestError> for SupportSleuthError {
    fn from(e: IngestError) -> Self {
        Self::Ingest(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

/// A single container-log frame could not be decoded.
///
/// Never escapes the decoder: it is rendered into the inline diagnostic line
/// that replaces the corrupted frame.
#[derive(Debug)]
pub enum FrameError {
    /// Fewer bytes remain than the frame header or body requires.
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The trailing length does not repeat the leading length.
    LengthMismatch {
        leading: u32,
        trailing: u32,
        offset: usize,
    },

    /// The record body is not a valid protobuf message.
    Decode {
        offset: usize,
        source: prost::DecodeError,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated {
                offset,
                needed,
                available,
            } => write!(
                f,
                "truncated frame at position {offset}: needed {needed} bytes, {available} available"
            ),
            Self::LengthMismatch {
                leading,
                trailing,
                offset,
            } => write!(
                f,
                "length mismatch {leading} != {trailing} at position {offset}"
            ),
            Self::Decode { offset, source } => {
                write!(f, "malformed record at position {offset}: {source}")
            }
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors related to interpreting filter values against the database.
#[derive(Debug)]
pub enum FilterError {
    /// Severity name or number is not recognised.
    UnknownSeverity { name: String },

    /// No log with this logical name was ingested.
    UnknownFile { name: String },

    /// No entry carries this component.
    UnknownComponent { name: String },

    /// A time bound could not be parsed.
    InvalidTimestamp { raw: String },

    /// A `component=severity` floor is missing its `=`.
    InvalidComponentFloor { raw: String },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSeverity { name } => write!(f, "Invalid severity: {name}"),
            Self::UnknownFile { name } => write!(f, "File not found: {name}"),
            Self::UnknownComponent { name } => write!(f, "Component not found: {name}"),
            Self::InvalidTimestamp { raw } => write!(f, "Invalid time: {raw}"),
            Self::InvalidComponentFloor { raw } => write!(
                f,
                "Invalid component floor '{raw}': expected <component>=<severity>"
            ),
        }
    }
}

impl std::error::Error for FilterError {}

impl From<FilterError> for SupportSleuthError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for SupportSleuthError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<ConfigError> for SupportSleuthError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for SupportSleuth results.
pub type Result<T> = std::result::Result<T, SupportSleuthError>;
