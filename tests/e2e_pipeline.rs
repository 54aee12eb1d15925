// SupportSleuth - tests/e2e_pipeline.rs
//
// End-to-end tests for the ingestion pipeline.
//
// Bundles are built in memory with real gzip and tar encoders and real
// protobuf container-log frames, then pushed through the same entry points
// the CLI uses: upload validation, background ingestion, rendering, export.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::time::Duration;
use supportsleuth::app::ingest::IngestOptions;
use supportsleuth::app::state::SupportPackage;
use supportsleuth::app::worker::IngestWorker;
use supportsleuth::core::archive::UnpackOutcome;
use supportsleuth::core::export;
use supportsleuth::core::filter::{FileSelection, Filter};
use supportsleuth::core::frame::{encode_frame, ContainerRecord};
use supportsleuth::core::model::{Severity, View};
use supportsleuth::core::upload::Upload;
use supportsleuth::platform::fs;
use supportsleuth::util::constants::{LEGACY_PACKAGE_FILE, NO_ENTRIES_MATCHED};
use supportsleuth::util::error::Stage;

// =============================================================================
// Helpers
// =============================================================================

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A gzip-wrapped tar with one regular file per entry.
fn tgz(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data.as_slice()).unwrap();
    }
    gzip(&builder.into_inner().unwrap())
}

/// Container-log frames for `lines`, without timestamps.
fn container_log(lines: &[&str]) -> Vec<u8> {
    lines
        .iter()
        .flat_map(|line| encode_frame(&ContainerRecord::new("stdout", 0, line)))
        .collect()
}

fn ingest(upload: Upload) -> SupportPackage {
    let mut package = SupportPackage::new();
    package.view = View::AllLogs;
    package.upload(&upload, &IngestOptions::default()).unwrap();
    package
}

// =============================================================================
// Archive bundles
// =============================================================================

/// Rotated container shards are merged oldest first: .2, .1, then current.
#[test]
fn e2e_container_shards_merge_in_rotation_order() {
    let bundle = tgz(&[
        ("logs/core/container.log.1", container_log(&["a"])),
        ("logs/core/container.log.2", container_log(&["b"])),
        ("logs/core/container.log", container_log(&["c"])),
    ]);
    let mut package = ingest(Upload::new("bundle.tgz", bundle));

    assert_eq!(
        package.store().paths().collect::<Vec<_>>(),
        vec!["logs/core.log"]
    );
    assert_eq!(package.store().get("logs/core.log"), Some("b\na\nc\n"));

    // Untimed lines keep file order in the merged view.
    assert_eq!(package.filtered_log(), "b\na\nc\n");

    let text = package.set_view(View::File("logs/core.log".to_string()));
    assert_eq!(text, "b\na\nc\n");
}

/// A full bundle: rolling text logs, a gzipped member, JSON and container logs.
#[test]
fn e2e_full_bundle_builds_sorted_database() {
    let bundle = tgz(&[
        (
            "log/wiser-home.1.txt",
            b"[2024-03-01T10:00:01Z][hub][INFO] older\n".to_vec(),
        ),
        (
            "log/wiser-home.txt",
            b"[2024-03-01T10:00:03Z][hub][ERROR] newer\n".to_vec(),
        ),
        (
            "logs/kernel.log.gz",
            gzip(b"1709287202.00000 kernel: booted\n"),
        ),
        ("datamodel.json", br#"{"a":1}"#.to_vec()),
        (
            "logs/radio/container.log",
            encode_frame(&ContainerRecord::new(
                "stdout",
                1_709_287_200_000_000_000,
                "radio up",
            )),
        ),
    ]);
    let mut package = ingest(Upload::new("bundle.tgz", bundle));

    let report = package.last_report().unwrap();
    assert_eq!(report.completed, Stage::all());
    assert!(matches!(report.unpack, UnpackOutcome::Archive { members: 5 }));
    assert!(report.legacy.is_empty());

    let store = package.store();
    assert!(store.contains("logs/wiser-home.log"));
    assert!(store.contains("logs/kernel.log"));
    assert!(store.contains("logs/radio.log"));
    assert!(!store.contains("log/wiser-home.txt"));
    assert_eq!(store.get("datamodel.json"), Some("{\n   \"a\": 1\n}"));

    let db = package.db();
    assert_eq!(db.len(), 4);
    let stamps: Vec<i64> = db.entries().iter().map(|e| e.timestamp_ms).collect();
    let mut sorted = stamps.clone();
    sorted.sort();
    assert_eq!(stamps, sorted);
    assert_eq!(db.entries()[0].source_file, "radio");

    // Severity floor and file selection narrow the view.
    let errors = package
        .set_filter(Filter {
            severity_floor: Some(Severity::Error),
            ..Default::default()
        })
        .to_string();
    assert_eq!(errors, "[2024-03-01T10:00:03Z][hub][ERROR] newer\n");

    let kernel = package
        .set_filter(Filter {
            files: FileSelection::only(["kernel"]),
            ..Default::default()
        })
        .to_string();
    assert_eq!(kernel.lines().count(), 1);
    assert!(kernel.contains("kernel: booted"));
}

// =============================================================================
// Legacy packages
// =============================================================================

/// Input that is not gzip lands in the store as the legacy single file.
#[test]
fn e2e_non_gzip_input_is_a_legacy_package() {
    let mut package = SupportPackage::new();
    let options = IngestOptions::default();

    // An unrecognised section is left alone; the marker is always consumed.
    let report = package
        .upload(&Upload::new("old.tgz", b"Something else\n42".to_vec()), &options)
        .unwrap();
    assert!(matches!(report.unpack, UnpackOutcome::Legacy { .. }));
    assert!(package.store().is_empty());
    assert!(!package.store().contains(LEGACY_PACKAGE_FILE));
    assert_eq!(package.filtered_log(), NO_ENTRIES_MATCHED);
}

/// Sections are routed to their files and subsystem sections merged.
#[test]
fn e2e_legacy_package_is_split() {
    let legacy = "DB contents: {\"devices\": []}\n\
                  ----\n\
                  Contents of /status/ {\"online\": true}\n\
                  ----\n\
                  Reset Reasons\nwatchdog\n\
                  ----\n\
                  Journal Log\nJul 16 20:44:38 gw zigbee[12]: joined\n";
    let package = ingest(Upload::new("old.tgz", legacy.as_bytes().to_vec()));

    let store = package.store();
    assert_eq!(store.get("ResetReasons.txt"), Some("watchdog"));
    let datamodel: serde_json::Value =
        serde_json::from_str(store.get("datamodel.json").unwrap()).unwrap();
    assert_eq!(datamodel["status"]["online"], serde_json::json!(true));

    assert_eq!(package.db().len(), 1);
    let entry = &package.db().entries()[0];
    assert_eq!(entry.source_file, "journal");
    assert_eq!(entry.component, "zigbee");
}

// =============================================================================
// Upload boundary, worker, export
// =============================================================================

#[test]
fn e2e_data_url_upload_through_worker() {
    use base64::Engine;
    let bundle = tgz(&[("logs/core/container.log", container_log(&["hello"]))]);
    let url = format!(
        "data:application/gzip;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bundle)
    );

    let dir = tempfile::tempdir().unwrap();
    let saved = dir.path().join("bundle.url");
    fs::write_text_atomic(&saved, &url).unwrap();

    let upload = Upload::from_data_url("bundle.tgz", &fs::read_text(&saved).unwrap()).unwrap();
    let mut worker = IngestWorker::new();
    worker.start(upload, IngestOptions::default());
    let ingested = worker.wait_timeout(Duration::from_secs(30)).unwrap();

    let mut package = SupportPackage::new();
    package.view = View::AllLogs;
    package.adopt(*ingested);
    assert_eq!(package.update_count(), 1);
    assert_eq!(package.filtered_log(), "hello\n");
}

#[test]
fn e2e_export_and_extract() {
    let bundle = tgz(&[
        ("logs/core/container.log", container_log(&["one", "two"])),
        ("FileSystemContents.txt", b"/data\n".to_vec()),
    ]);
    let package = ingest(Upload::new("bundle.tgz", bundle));
    let dir = tempfile::tempdir().unwrap();

    let entries = package.db().filtered_entries(&package.filter);
    let csv_path = dir.path().join("out.csv");
    let count = export::export_csv(
        &entries,
        std::fs::File::create(&csv_path).unwrap(),
        &csv_path,
    )
    .unwrap();
    assert_eq!(count, 2);
    let csv_text = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv_text.starts_with("timestamp_ms,timestamp,source_file"));
    assert!(csv_text.contains(",core,"));

    let extracted = dir.path().join("bundle");
    let written = fs::write_tree(&extracted, package.store().iter()).unwrap();
    assert_eq!(written, 2);
    assert_eq!(
        std::fs::read_to_string(extracted.join("logs/core.log")).unwrap(),
        "one\ntwo\n"
    );
}

#[test]
fn e2e_rejected_upload_never_reaches_pipeline() {
    let mut package = SupportPackage::new();
    let options = IngestOptions {
        max_input_bytes: 4,
        ..Default::default()
    };
    assert!(package
        .upload(&Upload::new("bundle.tgz", vec![0; 5]), &options)
        .is_err());
    assert!(package
        .upload(&Upload::new("bundle.tar.gz", vec![0; 1]), &options)
        .is_err());
    assert_eq!(package.update_count(), 0);
    assert!(package.last_report().is_none());
}
