// SupportSleuth - core/parser.rs
//
// Line-grammar parser: turns one consolidated text log into LogEntry values.
// Core layer: works on in-memory text, never touches the filesystem.
//
// Lines are classified by an ordered list of dialects. The predicates
// overlap, so the order is significant and must not change:
//
//   1. bracketed  `[2024-07-16 20:44:38.339] [zigbee    ] [notice    ] text`
//   2. journal    `Oct 02 07:00:54 WiserHeat05C2D7 component[id]: text`
//                 (only for the log whose logical name is `journal`)
//   3. epoch      `1721162678.33912 component[id]: text`
//   4. fallback   anything else

use crate::core::model::{ColourTag, LogEntry, Severity};
use crate::util::constants::{
    EPOCH_DOT_INDEX, EPOCH_TIMESTAMP_WIDTH, JOURNAL_SOURCE_NAME, JOURNAL_TIMESTAMP_WIDTH,
};
use crate::util::logging::preview;
use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};

/// Configuration for parsing operations.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// "Now" for the year-less journal timestamps. Injectable for tests.
    pub reference_time: DateTime<Utc>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            reference_time: Utc::now(),
        }
    }
}

/// Result of parsing a single log.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// One entry per non-blank line, in file order.
    pub entries: Vec<LogEntry>,

    /// Earliest non-zero timestamp produced.
    pub earliest_ms: Option<i64>,

    /// Latest non-zero timestamp produced.
    pub latest_ms: Option<i64>,

    /// Total lines seen, blank ones included.
    pub lines_processed: u64,
}

/// Parse one log's text.
///
/// `source_name` is the short logical name of the log (`core`, `journal`);
/// it is copied into every entry and selects the journal dialect. Entries
/// carry the default colour; the database assigns the real one.
///
/// A line that cannot derive its own timestamp inherits the last timestamp
/// produced in this file (0 before the first).
pub fn parse_content(content: &str, source_name: &str, config: &ParseConfig) -> ParseResult {
    let mut result = ParseResult::default();
    let mut default_timestamp: i64 = 0;

    for line in content.split('\n') {
        result.lines_processed += 1;
        if line.trim().is_empty() {
            continue;
        }

        let dialect = DIALECTS
            .iter()
            .copied()
            .find(|d| d.matches(line, source_name))
            .unwrap_or(&FALLBACK);
        let parsed = dialect.parse(line, config);

        let timestamp_ms = parsed.timestamp_ms.unwrap_or(default_timestamp);
        default_timestamp = timestamp_ms;

        if timestamp_ms != 0 {
            result.earliest_ms = Some(
                result
                    .earliest_ms
                    .map_or(timestamp_ms, |m| m.min(timestamp_ms)),
            );
            result.latest_ms = Some(
                result
                    .latest_ms
                    .map_or(timestamp_ms, |m| m.max(timestamp_ms)),
            );
        }

        tracing::trace!(
            file = %source_name,
            dialect = dialect.name(),
            timestamp_ms,
            line = preview(line),
            "Parsed line"
        );

        result.entries.push(LogEntry {
            timestamp_ms,
            source_file: source_name.to_string(),
            severity: parsed.severity,
            component: parsed.component,
            message: parsed.message.unwrap_or_else(|| line.to_string()),
            colour: ColourTag::default(),
        });
    }

    tracing::debug!(
        file = %source_name,
        entries = result.entries.len(),
        lines = result.lines_processed,
        "Parsing complete"
    );

    result
}

// =============================================================================
// Dialects
// =============================================================================

/// Metadata extracted from one line.
#[derive(Debug, Default, PartialEq, Eq)]
struct ParsedLine {
    /// `None` when the line carries no usable timestamp.
    timestamp_ms: Option<i64>,
    severity: Severity,
    component: String,
    /// Replacement message; `None` keeps the line verbatim.
    message: Option<String>,
}

/// One recognised line grammar.
trait Dialect {
    fn name(&self) -> &'static str;

    /// True if this dialect should handle `line` from log `source_name`.
    fn matches(&self, line: &str, source_name: &str) -> bool;

    fn parse(&self, line: &str, config: &ParseConfig) -> ParsedLine;
}

/// Evaluated top to bottom; the first match wins.
const DIALECTS: &[&dyn Dialect] = &[&Bracketed, &Journal, &EpochSeconds, &FALLBACK];

const FALLBACK: Fallback = Fallback;

/// `[<timestamp>] [<component>] [<severity>] <message>`
struct Bracketed;

impl Dialect for Bracketed {
    fn name(&self) -> &'static str {
        "bracketed"
    }

    fn matches(&self, line: &str, _source_name: &str) -> bool {
        line.starts_with('[')
    }

    fn parse(&self, line: &str, _config: &ParseConfig) -> ParsedLine {
        let Some((raw_ts, rest)) = bracket_group(line) else {
            return ParsedLine::default();
        };

        // Component and severity groups only count when they directly follow
        // the previous group.
        let (component, rest) = match bracket_group(rest) {
            Some((component, rest)) => (component.trim().to_string(), Some(rest)),
            None => (String::new(), None),
        };
        let severity = rest
            .and_then(bracket_group)
            .map(|(name, _)| Severity::from_name_or_default(name))
            .unwrap_or_default();

        ParsedLine {
            timestamp_ms: parse_bracket_timestamp(raw_ts),
            severity,
            component,
            message: None,
        }
    }
}

/// `Mon DD HH:MM:SS host component[id]: message`, year-less and UTC.
struct Journal;

impl Dialect for Journal {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn matches(&self, _line: &str, source_name: &str) -> bool {
        source_name == JOURNAL_SOURCE_NAME
    }

    fn parse(&self, line: &str, config: &ParseConfig) -> ParsedLine {
        let timestamp_ms = line
            .get(..JOURNAL_TIMESTAMP_WIDTH)
            .and_then(|raw| parse_journal_timestamp(raw, &config.reference_time));

        let rest = line.get(JOURNAL_TIMESTAMP_WIDTH + 1..).unwrap_or_default().trim();
        // Drop the host identifier.
        let rest = match rest.find(' ') {
            Some(idx) => rest[idx..].trim(),
            None => rest,
        };

        ParsedLine {
            timestamp_ms,
            severity: Severity::DEFAULT,
            component: component_before_colon(rest),
            message: None,
        }
    }
}

/// `SSSSSSSSSS.FFFFF component[id]: message` (seconds since the epoch).
///
/// The only dialect that rewrites the message: the numeric prefix is
/// replaced by a readable ISO-8601 timestamp.
struct EpochSeconds;

impl Dialect for EpochSeconds {
    fn name(&self) -> &'static str {
        "epoch"
    }

    fn matches(&self, line: &str, _source_name: &str) -> bool {
        line.as_bytes().get(EPOCH_DOT_INDEX) == Some(&b'.')
    }

    fn parse(&self, line: &str, _config: &ParseConfig) -> ParsedLine {
        let rest = line.get(EPOCH_TIMESTAMP_WIDTH..).unwrap_or_default().trim();

        let Some(timestamp_ms) = parse_epoch_prefix(line) else {
            return ParsedLine {
                component: component_before_colon(rest),
                ..ParsedLine::default()
            };
        };

        let message = DateTime::from_timestamp_millis(timestamp_ms).map(|ts| {
            format!(
                "[{}] {rest}",
                ts.to_rfc3339_opts(SecondsFormat::Millis, true)
            )
        });

        ParsedLine {
            timestamp_ms: Some(timestamp_ms),
            severity: Severity::DEFAULT,
            component: component_before_colon(rest),
            message,
        }
    }
}

/// Anything else: no component, default severity, inherited timestamp.
struct Fallback;

impl Dialect for Fallback {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn matches(&self, _line: &str, _source_name: &str) -> bool {
        true
    }

    fn parse(&self, _line: &str, _config: &ParseConfig) -> ParsedLine {
        ParsedLine::default()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Split `[inner] rest` (after leading whitespace) into `(inner, rest)`.
fn bracket_group(s: &str) -> Option<(&str, &str)> {
    s.trim_start().strip_prefix('[')?.split_once(']')
}

/// Text up to the first `:`, minus any `[id]` suffix. Empty without a `:`.
fn component_before_colon(text: &str) -> String {
    let Some(end) = text.find(':') else {
        return String::new();
    };
    let component = &text[..end];
    match component.find('[') {
        Some(idx) => component[..idx].trim().to_string(),
        None => component.trim().to_string(),
    }
}

/// Bracketed timestamps are UTC: RFC 3339 first, then ISO date-time with a
/// space or `T` separator and optional fraction.
fn parse_bracket_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    .map(|ndt| ndt.and_utc().timestamp_millis())
}

/// Year-less syslog timestamp, placed in the reference year, or the year
/// before when that would lie in the future.
fn parse_journal_timestamp(raw: &str, reference: &DateTime<Utc>) -> Option<i64> {
    let with_year = |year: i32| {
        NaiveDateTime::parse_from_str(&format!("{year} {raw}"), "%Y %b %e %H:%M:%S")
            .ok()
            .map(|ndt| ndt.and_utc())
    };

    let year = reference.year();
    // Feb 29 only exists in some years.
    let ts = with_year(year).or_else(|| with_year(year - 1))?;
    let ts = if ts > *reference {
        with_year(year - 1)?
    } else {
        ts
    };
    Some(ts.timestamp_millis())
}

/// `seconds * 1000 + fraction / 1000` from the first 16 characters.
fn parse_epoch_prefix(line: &str) -> Option<i64> {
    let seconds = line.get(..EPOCH_DOT_INDEX)?;
    let fraction = line.get(EPOCH_DOT_INDEX + 1..EPOCH_TIMESTAMP_WIDTH)?;
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !digits(seconds) || !digits(fraction) {
        return None;
    }
    let seconds: i64 = seconds.parse().ok()?;
    let fraction: i64 = fraction.parse().ok()?;
    Some(seconds * 1000 + fraction / 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config_at(year: i32, month: u32, day: u32) -> ParseConfig {
        ParseConfig {
            reference_time: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
        }
    }

    fn dialect_of(line: &str, source: &str) -> &'static str {
        DIALECTS
            .iter()
            .find(|d| d.matches(line, source))
            .map(|d| d.name())
            .unwrap()
    }

    const T_2024_07_16: i64 = 1_721_162_678_339;

    #[test]
    fn test_bracketed_line() {
        let line = "[2024-07-16 20:44:38.339] [zigbee    ] [ERROR     ] join failed";
        let result = parse_content(line, "core", &ParseConfig::default());
        assert_eq!(result.entries.len(), 1);
        let entry = &result.entries[0];
        assert_eq!(entry.timestamp_ms, T_2024_07_16);
        assert_eq!(entry.component, "zigbee");
        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.message, line);
        assert_eq!(entry.source_file, "core");
    }

    #[test]
    fn test_bracketed_rfc3339_timestamp() {
        let result = parse_content(
            "[2024-07-16T20:44:38.339Z] [cloud] [info] ok",
            "cloud",
            &ParseConfig::default(),
        );
        assert_eq!(result.entries[0].timestamp_ms, T_2024_07_16);
        assert_eq!(result.entries[0].severity, Severity::Info);
    }

    #[test]
    fn test_bracketed_optional_groups() {
        let result = parse_content(
            "[2024-07-16 20:44:38.339] plain message [not a group]",
            "core",
            &ParseConfig::default(),
        );
        let entry = &result.entries[0];
        assert_eq!(entry.component, "");
        assert_eq!(entry.severity, Severity::Notice);

        let result = parse_content(
            "[2024-07-16 20:44:38.339] [zigbee] message",
            "core",
            &ParseConfig::default(),
        );
        assert_eq!(result.entries[0].component, "zigbee");
        assert_eq!(result.entries[0].severity, Severity::Notice);
    }

    #[test]
    fn test_unrecognised_severity_defaults_to_notice() {
        let result = parse_content(
            "[2024-07-16 20:44:38.339] [zigbee] [urgent] hello",
            "core",
            &ParseConfig::default(),
        );
        assert_eq!(result.entries[0].severity, Severity::Notice);
    }

    #[test]
    fn test_timestamp_inheritance() {
        let content = "[2024-07-16 20:44:38.339] [zigbee] [info] first\n\
                       continuation one\n\
                       continuation two\n";
        let result = parse_content(content, "core", &ParseConfig::default());
        assert_eq!(result.entries.len(), 3);
        for entry in &result.entries {
            assert_eq!(entry.timestamp_ms, T_2024_07_16);
        }
        assert_eq!(result.entries[1].component, "");
        assert_eq!(result.entries[2].severity, Severity::Notice);
    }

    #[test]
    fn test_unparseable_bracketed_timestamp_inherits() {
        let content = "[2024-07-16 20:44:38.339] [a] [info] ok\n[garbage] [b] [error] bad";
        let result = parse_content(content, "core", &ParseConfig::default());
        assert_eq!(result.entries[1].timestamp_ms, T_2024_07_16);
        assert_eq!(result.entries[1].severity, Severity::Error);
    }

    #[test]
    fn test_untimestamped_log_stays_at_zero() {
        let result = parse_content("just text\nmore text", "misc", &ParseConfig::default());
        assert!(result.entries.iter().all(|e| e.timestamp_ms == 0));
        assert_eq!(result.earliest_ms, None);
        assert_eq!(result.latest_ms, None);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let result = parse_content("a\n\n   \nb\n", "misc", &ParseConfig::default());
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.lines_processed, 5);
    }

    #[test]
    fn test_min_max_ignore_zero() {
        let content = "untimed\n\
                       [2024-07-16 20:44:40] [a] [info] later\n\
                       [2024-07-16 20:44:38] [a] [info] earlier\n";
        let result = parse_content(content, "core", &ParseConfig::default());
        assert_eq!(result.earliest_ms, Some(1_721_162_678_000));
        assert_eq!(result.latest_ms, Some(1_721_162_680_000));
    }

    #[test]
    fn test_journal_line() {
        let line = "Jul 16 20:44:38 WiserHeat05C2D7 systemd[1]: Started thing";
        let result = parse_content(line, "journal", &config_at(2024, 9, 1));
        let entry = &result.entries[0];
        assert_eq!(entry.timestamp_ms, 1_721_162_678_000);
        assert_eq!(entry.component, "systemd");
        assert_eq!(entry.severity, Severity::Notice);
        assert_eq!(entry.message, line);
    }

    #[test]
    fn test_journal_future_date_steps_back_a_year() {
        let line = "Dec 31 23:00:00 gw app: late";
        let result = parse_content(line, "journal", &config_at(2025, 1, 2));
        let ts = DateTime::from_timestamp_millis(result.entries[0].timestamp_ms).unwrap();
        assert_eq!(ts.year(), 2024);
    }

    #[test]
    fn test_journal_only_for_journal_log() {
        let line = "Jul 16 20:44:38 gw app: text";
        assert_eq!(dialect_of(line, "journal"), "journal");
        assert_eq!(dialect_of(line, "core"), "fallback");
        // Bracketed wins even inside the journal.
        assert_eq!(dialect_of("[x] y", "journal"), "bracketed");
    }

    #[test]
    fn test_epoch_line_rewrites_message() {
        let line = "1721162678.12345 core[12]: started";
        let result = parse_content(line, "core", &ParseConfig::default());
        let entry = &result.entries[0];
        assert_eq!(entry.timestamp_ms, 1_721_162_678_012);
        assert_eq!(entry.message, "[2024-07-16T20:44:38.012Z] core[12]: started");
        assert_eq!(entry.component, "core");
    }

    #[test]
    fn test_epoch_unparseable_digits_inherit() {
        let content = "[2024-07-16 20:44:38.339] [a] [info] ok\nabcdefghij.klmno svc: x";
        let result = parse_content(content, "core", &ParseConfig::default());
        let entry = &result.entries[1];
        assert_eq!(entry.timestamp_ms, T_2024_07_16);
        assert_eq!(entry.message, "abcdefghij.klmno svc: x");
        assert_eq!(entry.component, "svc");
    }

    #[test]
    fn test_component_before_colon() {
        assert_eq!(component_before_colon("app[42]: hi"), "app");
        assert_eq!(component_before_colon("kernel: hi"), "kernel");
        assert_eq!(component_before_colon("no colon"), "");
    }
}
