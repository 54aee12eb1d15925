// SupportSleuth - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Background ingestion of one support package
// 4. Rendering, listing, exporting or extracting the result

use clap::Parser;
use std::error::Error as _;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use supportsleuth::app::ingest::IngestOptions;
use supportsleuth::app::state::SupportPackage;
use supportsleuth::app::worker::IngestWorker;
use supportsleuth::core::archive::UnpackLimits;
use supportsleuth::core::export;
use supportsleuth::core::filter::{
    parse_component_floor, parse_time_bound, FileSelection, Filter,
};
use supportsleuth::core::model::{Severity, View};
use supportsleuth::core::parser::ParseConfig;
use supportsleuth::core::upload::Upload;
use supportsleuth::platform::config::{self, AppConfig, PlatformPaths};
use supportsleuth::platform::fs;
use supportsleuth::util::constants;
use supportsleuth::util::error::{ExportError, Result, SupportSleuthError};
use supportsleuth::util::logging;

/// SupportSleuth - support-package ingestion and unified log analyser.
///
/// Unpacks a gateway diagnostic bundle, normalises its logs and prints the
/// merged, filterable timeline.
#[derive(Parser, Debug)]
#[command(name = "SupportSleuth", version, about)]
struct Cli {
    /// Support package (.tgz), or a file holding a data URL with --data-url.
    input: PathBuf,

    /// Treat INPUT as a text file containing a `data:...;base64,...` URL.
    #[arg(long = "data-url")]
    data_url: bool,

    /// Upload name to present (defaults to the input file name).
    #[arg(long)]
    name: Option<String>,

    /// View to render: "all", "analysis", or a path in the bundle.
    #[arg(short = 'v', long, default_value = "all", value_parser = parse_view)]
    view: View,

    /// Only show entries from this log (logical name); repeatable.
    #[arg(short = 'f', long = "file")]
    files: Vec<String>,

    /// Only show entries with this component; repeatable.
    #[arg(short = 'c', long = "component")]
    components: Vec<String>,

    /// Only show entries at least this severe (name or number).
    #[arg(short = 's', long)]
    severity: Option<Severity>,

    /// Per-component severity floor, as `component=severity`; repeatable.
    #[arg(long = "component-floor")]
    component_floors: Vec<String>,

    /// Earliest timestamp to show (epoch ms or RFC 3339).
    #[arg(long)]
    start: Option<String>,

    /// Latest timestamp to show (epoch ms or RFC 3339).
    #[arg(long)]
    end: Option<String>,

    /// Prefix each line with its epoch-millisecond timestamp.
    #[arg(short = 't', long)]
    timestamps: bool,

    /// Colour lines by source log.
    #[arg(long)]
    color: bool,

    /// List every file in the normalised bundle.
    #[arg(long)]
    list: bool,

    /// Print the per-log summary.
    #[arg(long)]
    summary: bool,

    /// Print components, severities, logs and files as JSON.
    #[arg(long)]
    structure: bool,

    /// Write the rendered view to this file instead of stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Export the filtered entries as CSV.
    #[arg(long = "export-csv")]
    export_csv: Option<PathBuf>,

    /// Export the filtered entries as JSON.
    #[arg(long = "export-json")]
    export_json: Option<PathBuf>,

    /// Write the normalised bundle's files under this directory.
    #[arg(long = "extract-dir")]
    extract_dir: Option<PathBuf>,

    /// Seconds to wait for ingestion (overrides config.toml).
    #[arg(long)]
    timeout: Option<u64>,

    /// Abort on malformed legacy JSON sections instead of skipping them.
    #[arg(long = "strict-legacy-json")]
    strict_legacy_json: bool,

    /// Directory holding config.toml (overrides the platform default).
    #[arg(long = "config-dir")]
    config_dir: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn parse_view(raw: &str) -> std::result::Result<View, String> {
    Ok(match raw {
        "" => return Err("view must not be empty".to_string()),
        "all" => View::AllLogs,
        "analysis" => View::Analysis,
        path => View::File(path.to_string()),
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut paths = PlatformPaths::resolve();
    if let Some(dir) = cli.config_dir.clone() {
        paths = paths.with_config_dir(dir);
    }
    let (app_config, config_warnings) = config::load_config(&paths.config_dir);

    logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "SupportSleuth starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    match run(&cli, &app_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "SupportSleuth failed");
            eprintln!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, app_config: &AppConfig) -> Result<()> {
    let upload = read_upload(cli)?;
    let options = IngestOptions {
        max_input_bytes: app_config.max_input_bytes,
        limits: UnpackLimits {
            max_decompressed_bytes: app_config.max_decompressed_bytes,
        },
        strict_legacy_json: cli.strict_legacy_json || app_config.strict_legacy_json,
        parse: ParseConfig::default(),
    };
    let timeout = Duration::from_secs(cli.timeout.unwrap_or(app_config.timeout_secs));

    let mut worker = IngestWorker::new();
    worker.start(upload, options);
    let ingested = worker.wait_timeout(timeout)?;

    let mut package = SupportPackage::new();
    package.adopt(*ingested);
    if let Some(report) = package.last_report() {
        for skipped in &report.legacy.skipped {
            eprintln!(
                "warning: skipped legacy section '{}': {}",
                skipped.header, skipped.error
            );
        }
    }

    let filter = build_filter(cli, app_config)?;
    filter.validate(package.db())?;
    package.filter = filter;
    package.set_view(cli.view.clone());

    let mut printed = false;
    if cli.list {
        for path in package.store().paths() {
            println!("{path}");
        }
        printed = true;
    }
    if cli.summary || cli.view == View::Analysis {
        print_summary(&package)?;
        printed = true;
    }
    if cli.structure {
        let structure = package.db().structure(package.store());
        let text = serde_json::to_string_pretty(&structure).map_err(|e| {
            SupportSleuthError::Export(ExportError::Json {
                path: PathBuf::from("-"),
                source: e,
            })
        })?;
        println!("{text}");
        printed = true;
    }

    if let Some(ref dir) = cli.extract_dir {
        let written = fs::write_tree(dir, package.store().iter())?;
        eprintln!("Extracted {written} file(s) to {}", dir.display());
        printed = true;
    }
    if let Some(ref path) = cli.export_csv {
        let entries = package.db().filtered_entries(&package.filter);
        let count = export::export_csv(&entries, create_export(path)?, path)?;
        eprintln!("Exported {count} entries to {}", path.display());
        printed = true;
    }
    if let Some(ref path) = cli.export_json {
        let entries = package.db().filtered_entries(&package.filter);
        let count = export::export_json(&entries, create_export(path)?, path)?;
        eprintln!("Exported {count} entries to {}", path.display());
        printed = true;
    }

    if let Some(ref path) = cli.output {
        fs::write_text_atomic(path, package.filtered_log())?;
        eprintln!("Wrote view to {}", path.display());
    } else if !printed {
        let stdout = std::io::stdout();
        export::export_text(package.filtered_log(), stdout.lock(), Path::new("-"))?;
    }
    Ok(())
}

fn read_upload(cli: &Cli) -> Result<Upload> {
    let name = cli.name.clone().unwrap_or_else(|| {
        cli.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    if cli.data_url {
        let text = fs::read_text(&cli.input)?;
        Ok(Upload::from_data_url(name, &text)?)
    } else {
        Ok(Upload::new(name, fs::read_input(&cli.input)?))
    }
}

fn build_filter(cli: &Cli, app_config: &AppConfig) -> Result<Filter> {
    let mut filter = Filter {
        severity_floor: cli.severity,
        include_timestamp: cli.timestamps || app_config.timestamps,
        colorize: cli.color || app_config.colorize,
        ..Default::default()
    };
    if !cli.files.is_empty() {
        filter.files = FileSelection::only(cli.files.iter());
    }
    if !cli.components.is_empty() {
        filter.components = Some(cli.components.iter().cloned().collect());
    }
    for raw in &cli.component_floors {
        let (component, floor) = parse_component_floor(raw)?;
        filter.component_floors.insert(component, floor);
    }
    filter.timestamp_start = cli.start.as_deref().map(parse_time_bound).transpose()?;
    filter.timestamp_end = cli.end.as_deref().map(parse_time_bound).transpose()?;
    Ok(filter)
}

fn create_export(path: &Path) -> Result<BufWriter<std::fs::File>> {
    std::fs::File::create(path)
        .map(BufWriter::new)
        .map_err(|source| SupportSleuthError::Io {
            path: path.to_path_buf(),
            operation: "create export",
            source,
        })
}

fn print_summary(package: &SupportPackage) -> Result<()> {
    let stdout = std::io::stdout();
    write_summary(package, stdout.lock()).map_err(|source| SupportSleuthError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "write summary",
        source,
    })
}

/// Per-log table: entry count, earliest and latest timestamp, bundle path.
fn write_summary(package: &SupportPackage, mut out: impl Write) -> std::io::Result<()> {
    let format_ms = |ms: Option<i64>| {
        ms.and_then(chrono::DateTime::from_timestamp_millis)
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    writeln!(
        out,
        "{:<24} {:>8}  {:<19}  {:<19}  path",
        "log", "entries", "earliest", "latest"
    )?;
    for file in package.db().analysed_files() {
        writeln!(
            out,
            "{:<24} {:>8}  {:<19}  {:<19}  {}",
            file.name,
            file.entry_count,
            format_ms(file.earliest_ms),
            format_ms(file.latest_ms),
            file.path
        )?;
    }
    writeln!(out, "{} entries total", package.db().len())?;
    out.flush()
}
