// SupportSleuth - app/worker.rs
//
// Background ingestion. The pipeline is CPU-bound and runs to completion, so
// it is moved off the caller's thread and reports back exactly once.
//
// Architecture:
//   - `IngestWorker` lives on the caller's thread; `run_ingest` runs on a
//     background thread against a fresh `SupportPackage`.
//   - The result comes back as a single `IngestDone` message over an mpsc
//     channel; there is no incremental progress.
//   - Starting a new ingestion supersedes the previous one: its generation
//     is bumped and its channel dropped, so a late result is discarded.
//   - There is no cancellation. The caller may stop waiting (`wait_timeout`),
//     but the thread still runs to completion.

use crate::app::ingest::IngestOptions;
use crate::app::state::SupportPackage;
use crate::core::upload::Upload;
use crate::util::error::IngestError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

/// The one message a background ingestion sends.
#[derive(Debug)]
pub struct IngestDone {
    /// Generation the run was started with.
    pub generation: u64,

    /// The freshly ingested package, or why ingestion failed.
    pub result: Result<Box<SupportPackage>, IngestError>,
}

/// Runs ingestions on a background thread.
pub struct IngestWorker {
    done_rx: Option<mpsc::Receiver<IngestDone>>,

    /// Latest generation handed out; shared so a superseded run can tell.
    generation: Arc<AtomicU64>,

    started_at: Option<Instant>,
}

impl IngestWorker {
    pub fn new() -> Self {
        Self {
            done_rx: None,
            generation: Arc::new(AtomicU64::new(0)),
            started_at: None,
        }
    }

    /// Start ingesting `upload`. Any run still in flight is superseded.
    ///
    /// Returns the generation of the new run.
    pub fn start(&mut self, upload: Upload, options: IngestOptions) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.done_rx.take().is_some() {
            tracing::info!(generation, "Previous ingestion superseded");
        }

        let (tx, rx) = mpsc::channel();
        self.done_rx = Some(rx);
        self.started_at = Some(Instant::now());

        let latest = Arc::clone(&self.generation);
        std::thread::spawn(move || {
            run_ingest(generation, upload, options, tx, latest);
        });

        tracing::info!(generation, "Ingestion started in background");
        generation
    }

    /// True while a started run has not reported back.
    pub fn is_running(&self) -> bool {
        self.done_rx.is_some()
    }

    /// Non-blocking check for the result of the current run.
    pub fn poll(&mut self) -> Option<IngestDone> {
        let rx = self.done_rx.as_ref()?;
        match rx.try_recv() {
            Ok(done) => {
                self.finish(&done);
                Some(done)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                let done = IngestDone {
                    generation: self.generation.load(Ordering::SeqCst),
                    result: Err(IngestError::WorkerLost),
                };
                self.finish(&done);
                Some(done)
            }
        }
    }

    /// Block until the current run reports or `timeout` elapses.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Box<SupportPackage>, IngestError> {
        let Some(rx) = self.done_rx.as_ref() else {
            return Err(IngestError::WorkerLost);
        };
        match rx.recv_timeout(timeout) {
            Ok(done) => {
                self.finish(&done);
                done.result
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::warn!(seconds = timeout.as_secs(), "Ingestion timed out");
                Err(IngestError::TimedOut {
                    seconds: timeout.as_secs(),
                })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                self.done_rx = None;
                Err(IngestError::WorkerLost)
            }
        }
    }

    fn finish(&mut self, done: &IngestDone) {
        self.done_rx = None;
        let elapsed_ms = self
            .started_at
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or_default();
        tracing::debug!(
            generation = done.generation,
            ok = done.result.is_ok(),
            elapsed_ms,
            "Background ingestion reported"
        );
    }
}

impl Default for IngestWorker {
    fn default() -> Self {
        Self::new()
    }
}

/// Background body: ingest into a fresh package and report once.
fn run_ingest(
    generation: u64,
    upload: Upload,
    options: IngestOptions,
    tx: mpsc::Sender<IngestDone>,
    latest: Arc<AtomicU64>,
) {
    let mut package = SupportPackage::new();
    let entries = package.upload(&upload, &options).map(|report| report.entries);
    let result = entries.map(|entries| {
        tracing::debug!(generation, entries, "Background ingestion finished");
        Box::new(package)
    });

    if latest.load(Ordering::SeqCst) != generation {
        tracing::debug!(generation, "Discarding superseded ingestion result");
        return;
    }

    // Receiver dropped (caller gave up); exit quietly.
    let _ = tx.send(IngestDone { generation, result });
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &[u8] = b"Journal Log\nJul 16 20:44:38 gw app: up\n";

    #[test]
    fn test_background_ingest_reports_once() {
        let mut worker = IngestWorker::new();
        let generation = worker.start(
            Upload::new("old.tgz", LEGACY.to_vec()),
            IngestOptions::default(),
        );
        assert_eq!(generation, 1);
        assert!(worker.is_running());

        let package = worker.wait_timeout(Duration::from_secs(30)).unwrap();
        assert_eq!(package.db().len(), 1);
        assert!(!worker.is_running());
        assert!(worker.poll().is_none());
    }

    #[test]
    fn test_failure_is_reported() {
        let mut worker = IngestWorker::new();
        worker.start(
            Upload::new("old.txt", LEGACY.to_vec()),
            IngestOptions::default(),
        );
        let err = worker.wait_timeout(Duration::from_secs(30)).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedUpload { .. }));
    }

    #[test]
    fn test_newer_upload_supersedes_older() {
        let mut worker = IngestWorker::new();
        worker.start(
            Upload::new("first.tgz", LEGACY.to_vec()),
            IngestOptions::default(),
        );
        let second = worker.start(
            Upload::new("second.tgz", b"Reset Reasons\nbrownout".to_vec()),
            IngestOptions::default(),
        );
        assert_eq!(second, 2);

        let package = worker.wait_timeout(Duration::from_secs(30)).unwrap();
        assert!(package.store().contains("ResetReasons.txt"));
        assert!(package.db().is_empty());
    }

    #[test]
    fn test_wait_without_start_is_worker_lost() {
        let mut worker = IngestWorker::new();
        assert!(matches!(
            worker.wait_timeout(Duration::from_millis(1)),
            Err(IngestError::WorkerLost)
        ));
    }
}
