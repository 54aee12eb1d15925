// SupportSleuth - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for SupportSleuth configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/supportsleuth/).
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Use `config_dir` instead of the platform default.
    pub fn with_config_dir(mut self, config_dir: PathBuf) -> Self {
        self.config_dir = config_dir;
        self
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[ingest]` section.
    pub ingest: IngestSection,
    /// `[render]` section.
    pub render: RenderSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[ingest]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct IngestSection {
    /// Largest accepted upload in bytes.
    pub max_input_bytes: Option<u64>,
    /// Cap on any single gzip stream's output in bytes.
    pub max_decompressed_bytes: Option<u64>,
    /// How long to wait for a background ingestion.
    pub timeout_seconds: Option<u64>,
    /// Abort on a malformed legacy JSON section instead of skipping it.
    pub strict_legacy_json: Option<bool>,
}

/// `[render]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RenderSection {
    /// Wrap rendered lines in per-source colour codes.
    pub colorize: Option<bool>,
    /// Prefix rendered lines with their epoch-millisecond timestamp.
    pub timestamps: Option<bool>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    // -- Ingest --
    pub max_input_bytes: u64,
    pub max_decompressed_bytes: u64,
    pub timeout_secs: u64,
    pub strict_legacy_json: bool,

    // -- Render --
    pub colorize: bool,
    pub timestamps: bool,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: constants::DEFAULT_MAX_INPUT_BYTES,
            max_decompressed_bytes: constants::DEFAULT_MAX_DECOMPRESSED_BYTES,
            timeout_secs: constants::DEFAULT_INGEST_TIMEOUT_SECS,
            strict_legacy_json: false,
            colorize: false,
            timestamps: false,
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first-run).
/// If the file is unreadable or unparseable, returns defaults with a warning;
/// the application still starts but the user is informed.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    match read_config(&config_path) {
        Ok((config, warnings)) => {
            tracing::info!(path = %config_path.display(), "Loaded config.toml");
            if !warnings.is_empty() {
                tracing::warn!(
                    count = warnings.len(),
                    "Config validation produced warnings"
                );
            }
            (config, warnings)
        }
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            (AppConfig::default(), vec![msg])
        }
    }
}

/// Read and validate one config file.
pub fn read_config(path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(validate(raw))
}

/// Validate each field against named constants, accumulating all warnings.
pub fn validate(raw: RawConfig) -> (AppConfig, Vec<String>) {
    let mut config = AppConfig::default();
    let mut warnings: Vec<String> = Vec::new();

    // -- Ingest: max_input_bytes --
    if let Some(bytes) = raw.ingest.max_input_bytes {
        if (1..=constants::ABSOLUTE_MAX_INPUT_BYTES).contains(&bytes) {
            config.max_input_bytes = bytes;
        } else {
            warnings.push(format!(
                "[ingest] max_input_bytes = {bytes} is out of range (1-{}). Using default ({}).",
                constants::ABSOLUTE_MAX_INPUT_BYTES,
                constants::DEFAULT_MAX_INPUT_BYTES,
            ));
        }
    }

    // -- Ingest: max_decompressed_bytes --
    if let Some(bytes) = raw.ingest.max_decompressed_bytes {
        if (constants::MIN_MAX_DECOMPRESSED_BYTES..=constants::ABSOLUTE_MAX_DECOMPRESSED_BYTES)
            .contains(&bytes)
        {
            config.max_decompressed_bytes = bytes;
        } else {
            warnings.push(format!(
                "[ingest] max_decompressed_bytes = {bytes} is out of range ({}-{}). Using default ({}).",
                constants::MIN_MAX_DECOMPRESSED_BYTES,
                constants::ABSOLUTE_MAX_DECOMPRESSED_BYTES,
                constants::DEFAULT_MAX_DECOMPRESSED_BYTES,
            ));
        }
    }

    // -- Ingest: timeout_seconds --
    if let Some(secs) = raw.ingest.timeout_seconds {
        if (constants::MIN_INGEST_TIMEOUT_SECS..=constants::MAX_INGEST_TIMEOUT_SECS)
            .contains(&secs)
        {
            config.timeout_secs = secs;
        } else {
            warnings.push(format!(
                "[ingest] timeout_seconds = {secs} is out of range ({}-{}). Using default ({}).",
                constants::MIN_INGEST_TIMEOUT_SECS,
                constants::MAX_INGEST_TIMEOUT_SECS,
                constants::DEFAULT_INGEST_TIMEOUT_SECS,
            ));
        }
    }

    if let Some(strict) = raw.ingest.strict_legacy_json {
        config.strict_legacy_json = strict;
    }

    // -- Render --
    if let Some(colorize) = raw.render.colorize {
        config.colorize = colorize;
    }
    if let Some(timestamps) = raw.render.timestamps {
        config.timestamps = timestamps;
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    (config, warnings)
}
