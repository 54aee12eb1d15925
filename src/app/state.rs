// SupportSleuth - app/state.rs
//
// The support-package context: one explicit object holding everything the
// collaborator reads (file store, database, rendered view) and the little it
// writes (filter, chosen view). Passed by reference; there is no global.

use crate::app::ingest::{self, IngestOptions, IngestReport};
use crate::core::database::LogDatabase;
use crate::core::filter::Filter;
use crate::core::model::View;
use crate::core::store::FileStore;
use crate::core::upload::Upload;
use crate::util::error::IngestError;

/// Current support package and its derived views.
#[derive(Debug, Default)]
pub struct SupportPackage {
    store: FileStore,
    db: LogDatabase,

    /// Filter applied by [`SupportPackage::process_filtered_log`].
    pub filter: Filter,

    /// What the collaborator is looking at.
    pub view: View,

    filtered_log: String,
    update_count: u64,
    last_report: Option<IngestReport>,
}

impl SupportPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current bundle with `upload`.
    ///
    /// The previous bundle is discarded first. On success the update counter
    /// is bumped and the view re-rendered; on failure the store holds
    /// whatever the completed stages produced and the counter is unchanged.
    pub fn upload(
        &mut self,
        upload: &Upload,
        options: &IngestOptions,
    ) -> Result<&IngestReport, IngestError> {
        upload.validate(options.max_input_bytes)?;
        tracing::info!(name = %upload.name, bytes = upload.bytes.len(), "Upload accepted");

        self.store.clear();
        self.db.clear();
        self.filtered_log.clear();
        self.last_report = None;

        let report = ingest::run_pipeline(&mut self.store, &mut self.db, &upload.bytes, options)?;
        self.update_count += 1;
        self.process_filtered_log();
        Ok(self.last_report.insert(report))
    }

    /// Take over the bundle ingested by another context (the background
    /// worker's), keeping this context's filter and view.
    pub fn adopt(&mut self, ingested: SupportPackage) {
        self.store = ingested.store;
        self.db = ingested.db;
        self.last_report = ingested.last_report;
        self.update_count += 1;
        self.process_filtered_log();
    }

    /// Re-render the current view with the current filter.
    pub fn process_filtered_log(&mut self) -> &str {
        self.filtered_log = self.db.render(&self.store, &self.view, &self.filter);
        tracing::debug!(
            view = ?self.view,
            bytes = self.filtered_log.len(),
            "Filtered log processed"
        );
        &self.filtered_log
    }

    pub fn set_filter(&mut self, filter: Filter) -> &str {
        self.filter = filter;
        self.process_filtered_log()
    }

    pub fn set_view(&mut self, view: View) -> &str {
        self.view = view;
        self.process_filtered_log()
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn db(&self) -> &LogDatabase {
        &self.db
    }

    /// The last rendered view.
    pub fn filtered_log(&self) -> &str {
        &self.filtered_log
    }

    /// Incremented once per successful ingestion.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn last_report(&self) -> Option<&IngestReport> {
        self.last_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants::NO_ENTRIES_MATCHED;

    const LEGACY: &[u8] =
        b"Journal Log\nJul 16 20:44:38 gw app[1]: up\nJul 16 20:44:39 gw db: ok\n";

    #[test]
    fn test_upload_bumps_counter_and_renders() {
        let mut sp = SupportPackage::new();
        sp.view = View::AllLogs;
        let report = sp
            .upload(&Upload::new("old.tgz", LEGACY.to_vec()), &IngestOptions::default())
            .unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(sp.update_count(), 1);
        assert!(sp.filtered_log().contains("app[1]: up"));
        assert!(sp.last_report().is_some());
    }

    #[test]
    fn test_rejected_upload_leaves_state_alone() {
        let mut sp = SupportPackage::new();
        sp.upload(&Upload::new("old.tgz", LEGACY.to_vec()), &IngestOptions::default())
            .unwrap();
        let err = sp
            .upload(&Upload::new("old.zip", LEGACY.to_vec()), &IngestOptions::default())
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedUpload { .. }));
        assert_eq!(sp.update_count(), 1);
        assert_eq!(sp.db().len(), 2);
    }

    #[test]
    fn test_failed_ingest_clears_bundle_without_bumping_counter() {
        let mut sp = SupportPackage::new();
        sp.view = View::AllLogs;
        sp.upload(&Upload::new("old.tgz", LEGACY.to_vec()), &IngestOptions::default())
            .unwrap();
        assert_eq!(sp.db().len(), 2);
        assert!(!sp.filtered_log().is_empty());

        let options = IngestOptions {
            strict_legacy_json: true,
            ..Default::default()
        };
        assert!(sp
            .upload(&Upload::new("bad.tgz", b"DB contents: {".to_vec()), &options)
            .is_err());
        assert_eq!(sp.update_count(), 1);
        assert!(sp.last_report().is_none());

        // Nothing from the previous bundle survives a failed upload.
        assert!(sp.db().is_empty());
        assert!(sp.filtered_log().is_empty());
    }

    #[test]
    fn test_set_view_and_filter_rerender() {
        let mut sp = SupportPackage::new();
        sp.upload(&Upload::new("old.tgz", LEGACY.to_vec()), &IngestOptions::default())
            .unwrap();

        let text = sp.set_view(View::File("logs/journal.log".to_string())).to_string();
        assert!(text.starts_with("Jul 16 20:44:38"));

        sp.set_view(View::AllLogs);
        let rendered = sp
            .set_filter(Filter {
                timestamp_end: Some(0),
                ..Default::default()
            })
            .to_string();
        assert_eq!(rendered, NO_ENTRIES_MATCHED);
    }

    #[test]
    fn test_adopt_keeps_filter() {
        let mut worker_side = SupportPackage::new();
        worker_side
            .upload(&Upload::new("old.tgz", LEGACY.to_vec()), &IngestOptions::default())
            .unwrap();

        let mut ui_side = SupportPackage::new();
        ui_side.view = View::AllLogs;
        ui_side.filter.include_timestamp = true;
        ui_side.adopt(worker_side);
        assert_eq!(ui_side.update_count(), 1);
        assert_eq!(ui_side.db().len(), 2);
        assert!(ui_side
            .filtered_log()
            .starts_with(|c: char| c.is_ascii_digit()));
    }
}
