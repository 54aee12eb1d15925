// SupportSleuth - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// The support-package literals below (file names, section delimiters, shard
// names) are an interchange format with real gateway bundles and must be
// matched byte-for-byte.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "SupportSleuth";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "SupportSleuth";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Upload boundary
// =============================================================================

/// The only accepted upload file suffix.
pub const UPLOAD_SUFFIX: &str = ".tgz";

/// Prefix of an in-browser data-URL upload (`data:<mime>;base64,<payload>`).
pub const DATA_URL_PREFIX: &str = "data:";

/// Default maximum size of an uploaded bundle in bytes.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 512 * 1024 * 1024; // 512 MiB

/// Hard upper bound on the configurable input size.
pub const ABSOLUTE_MAX_INPUT_BYTES: u64 = 4 * 1024 * 1024 * 1024; // 4 GiB

/// Input files at or above this size are memory-mapped rather than copied.
pub const LARGE_INPUT_THRESHOLD: u64 = 64 * 1024 * 1024; // 64 MiB

// =============================================================================
// Decompression limits
// =============================================================================

/// Default cap on the output of any single gzip stream (outer or nested).
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: u64 = 2 * 1024 * 1024 * 1024; // 2 GiB

/// Minimum sensible decompression cap.
pub const MIN_MAX_DECOMPRESSED_BYTES: u64 = 1024 * 1024; // 1 MiB

/// Hard upper bound on the decompression cap.
pub const ABSOLUTE_MAX_DECOMPRESSED_BYTES: u64 = 16 * 1024 * 1024 * 1024; // 16 GiB

// =============================================================================
// Ingestion worker
// =============================================================================

/// Default time the caller waits for a background ingestion to finish.
pub const DEFAULT_INGEST_TIMEOUT_SECS: u64 = 300;

/// Minimum configurable ingestion timeout.
pub const MIN_INGEST_TIMEOUT_SECS: u64 = 1;

/// Maximum configurable ingestion timeout.
pub const MAX_INGEST_TIMEOUT_SECS: u64 = 3_600;

// =============================================================================
// File store names and suffixes
// =============================================================================

/// Sentinel file that holds an old-style single-file (RTOS) package.
pub const LEGACY_PACKAGE_FILE: &str = "SupportPackage.txt";

/// Token separating the sections of a legacy package.
pub const LEGACY_SECTION_DELIMITER: &str = "----";

/// Destination of the database dump and of the merged subsystem blobs.
pub const DATAMODEL_FILE: &str = "datamodel.json";

/// Section header of the database dump inside a legacy package.
pub const LEGACY_DB_SECTION: &str = "DB contents:";

/// Legacy sections copied to their own file: (header, destination).
pub const LEGACY_DIRECT_SECTIONS: &[(&str, &str)] = &[
    (LEGACY_DB_SECTION, DATAMODEL_FILE),
    ("Contents of file system:", "FileSystemContents.txt"),
    ("Reset Reasons", "ResetReasons.txt"),
    ("Journal Log", "logs/journal.log"),
];

/// Legacy subsystem sections merged into the data model: (header, field).
pub const LEGACY_SUBSYSTEM_SECTIONS: &[(&str, &str)] = &[
    ("Contents of /status/", "status"),
    ("Contents of /factory/", "factory"),
    ("Contents of /domain/", "domain"),
    ("Contents of /network/", "network"),
    ("Contents of /schedules/", "schedules"),
    ("Contents of /rus/", "rus"),
    ("Contents of /debug/", "debug"),
    ("Contents of /reset/", "reset"),
    ("Contents of /ocf/", "ocf"),
    ("Contents of /opentherm/", "opentherm"),
    ("Contents of /migration/", "migration"),
];

/// Suffix of files eligible for log parsing.
pub const LOG_SUFFIX: &str = ".log";

/// Suffix of compressed archive members.
pub const COMPRESSED_SUFFIX: &str = ".gz";

/// Suffix of JSON files that are pretty-printed on extraction.
pub const JSON_SUFFIX: &str = ".json";

/// Indentation used for every pretty-printed JSON document.
pub const JSON_INDENT: &[u8] = b"   ";

// =============================================================================
// Log consolidation
// =============================================================================

/// Folder holding the old rolling text logs.
pub const ROLLING_LOG_DIR: &str = "log/";

/// Logical name of the old rolling text log.
pub const ROLLING_LOG_NAME: &str = "wiser-home";

/// Suffix of the old rolling text log shards.
pub const ROLLING_LOG_SUFFIX: &str = ".txt";

/// Highest (oldest) rolling shard number looked for.
pub const ROLLING_LOG_MAX_SHARD: u32 = 8;

/// Consolidated destination of the old rolling text log.
pub const ROLLING_LOG_DESTINATION: &str = "logs/wiser-home.log";

/// Folder holding the per-container rotated logs.
pub const CONTAINER_LOG_ROOT: &str = "logs/";

/// File name of the current (newest) container log inside its folder.
pub const CONTAINER_LOG_FILE: &str = "container.log";

// =============================================================================
// Binary log frames
// =============================================================================

/// Size of the big-endian length prefix and of its trailing repeat.
pub const FRAME_LENGTH_BYTES: usize = 4;

/// Number of bytes inspected when looking for the next plausible frame start.
pub const FRAME_RESYNC_WINDOW: usize = 5;

/// Byte expected at the end of the resync window (protobuf tag of field 1).
pub const FRAME_RESYNC_MARKER: u8 = 0x0A;

/// Prefix of every inline decode diagnostic.
pub const FRAME_DIAGNOSTIC_PREFIX: &str = "!!!!!";

// =============================================================================
// Line parsing
// =============================================================================

/// Logical source name whose lines use the journal dialect.
pub const JOURNAL_SOURCE_NAME: &str = "journal";

/// Width of the year-less syslog timestamp at the start of a journal line.
pub const JOURNAL_TIMESTAMP_WIDTH: usize = 15;

/// Character index of the `.` in an epoch-seconds line.
pub const EPOCH_DOT_INDEX: usize = 10;

/// Width of the `<seconds>.<fraction>` prefix of an epoch-seconds line.
pub const EPOCH_TIMESTAMP_WIDTH: usize = 16;

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Rendering
// =============================================================================

/// Emitted instead of an empty rendered view.
pub const NO_ENTRIES_MATCHED: &str = "No log entries matched the current filter.";

/// Per-source colour codes (ANSI foreground colours), assigned in order.
pub const COLOUR_PALETTE: &[&str] = &[
    "\x1b[36m", // cyan
    "\x1b[33m", // yellow
    "\x1b[32m", // green
    "\x1b[35m", // magenta
    "\x1b[34m", // blue
    "\x1b[91m", // bright red
    "\x1b[96m", // bright cyan
    "\x1b[93m", // bright yellow
    "\x1b[92m", // bright green
    "\x1b[95m", // bright magenta
];

/// Colour reset code written after every colourised line.
pub const COLOUR_RESET: &str = "\x1b[0m";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
