// SupportSleuth - app/ingest.rs
//
// The ingestion orchestrator. Runs the pipeline stages in a fixed order
// against one file store and database:
//
//   unpack -> split legacy -> merge rolling logs -> merge container logs
//          -> rebuild database
//
// A failing stage stops the run. Nothing is rolled back: the store keeps
// whatever the completed stages produced, and the error names the stage and
// the stages that did complete.

use crate::core::archive::{self, UnpackLimits, UnpackOutcome};
use crate::core::consolidate;
use crate::core::database::LogDatabase;
use crate::core::legacy::{self, LegacyReport};
use crate::core::parser::ParseConfig;
use crate::core::store::FileStore;
use crate::util::constants::{DEFAULT_MAX_INPUT_BYTES, LEGACY_PACKAGE_FILE};
use crate::util::error::{IngestError, Stage};
use std::time::{Duration, Instant};

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Uploads larger than this are rejected before the pipeline runs.
    pub max_input_bytes: u64,

    pub limits: UnpackLimits,

    /// Abort on the first malformed legacy JSON section instead of skipping it.
    pub strict_legacy_json: bool,

    pub parse: ParseConfig,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            limits: UnpackLimits::default(),
            strict_legacy_json: false,
            parse: ParseConfig::default(),
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Every stage, in execution order.
    pub completed: Vec<Stage>,

    pub unpack: UnpackOutcome,

    /// Empty unless the input was a legacy package.
    pub legacy: LegacyReport,

    /// Files written by the merge stages.
    pub consolidated: Vec<String>,

    /// Entries in the rebuilt database.
    pub entries: usize,

    /// Files left in the store.
    pub files: usize,

    pub duration: Duration,
}

/// Run every stage against `store` and `db`.
///
/// The store is expected to be empty; the caller decides whether a previous
/// bundle is cleared first.
pub fn run_pipeline(
    store: &mut FileStore,
    db: &mut LogDatabase,
    bytes: &[u8],
    options: &IngestOptions,
) -> Result<IngestReport, IngestError> {
    let started = Instant::now();
    let mut completed = Vec::with_capacity(Stage::all().len());

    tracing::info!(bytes = bytes.len(), "Ingestion started");

    begin(Stage::Unpack);
    let unpack = archive::unpack_into(store, bytes, &options.limits);
    finish(Stage::Unpack, &mut completed);

    begin(Stage::SplitLegacy);
    let legacy = legacy::split_legacy(store, LEGACY_PACKAGE_FILE, options.strict_legacy_json)
        .map_err(|e| fail(Stage::SplitLegacy, &completed, e))?;
    finish(Stage::SplitLegacy, &mut completed);

    begin(Stage::MergeRollingLogs);
    let mut consolidated: Vec<String> =
        consolidate::merge_rolling_logs(store).into_iter().collect();
    finish(Stage::MergeRollingLogs, &mut completed);

    begin(Stage::MergeContainerLogs);
    consolidated.extend(consolidate::merge_container_logs(store));
    finish(Stage::MergeContainerLogs, &mut completed);

    begin(Stage::BuildDatabase);
    let entries = db.rebuild(store, &options.parse);
    finish(Stage::BuildDatabase, &mut completed);

    let duration = started.elapsed();
    tracing::info!(
        files = store.len(),
        entries,
        duration_ms = duration.as_millis() as u64,
        "Ingestion complete"
    );

    Ok(IngestReport {
        completed,
        unpack,
        legacy,
        consolidated,
        entries,
        files: store.len(),
        duration,
    })
}

fn begin(stage: Stage) {
    tracing::debug!(stage = %stage, "Stage started");
}

fn finish(stage: Stage, completed: &mut Vec<Stage>) {
    tracing::debug!(stage = %stage, "Stage finished");
    completed.push(stage);
}

fn fail(stage: Stage, completed: &[Stage], source: IngestError) -> IngestError {
    tracing::error!(stage = %stage, error = %source, "Stage failed; store left as-is");
    IngestError::Stage {
        stage,
        completed: completed.to_vec(),
        source: Box::new(source),
    }
}
