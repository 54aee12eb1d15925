// SupportSleuth - core/consolidate.rs
//
// Concatenates rotated log shards into one file per source, oldest first.
//
// Two shard layouts exist in real bundles:
//   - the old rolling text log: log/wiser-home.8.txt .. log/wiser-home.1.txt,
//     then log/wiser-home.txt (newest);
//   - per-container rotated logs: logs/<name>/container.log.<n> (higher n is
//     older), then logs/<name>/container.log (newest).
//
// Ordering comes from the shard numbering alone; timestamps are not consulted.

use crate::core::store::FileStore;
use crate::util::constants::{
    COMPRESSED_SUFFIX, CONTAINER_LOG_FILE, CONTAINER_LOG_ROOT, LOG_SUFFIX, ROLLING_LOG_DESTINATION, ROLLING_LOG_DIR,
    ROLLING_LOG_MAX_SHARD, ROLLING_LOG_NAME, ROLLING_LOG_SUFFIX,
};
use regex::Regex;
use std::sync::OnceLock;

/// Merge the old rolling text log into its consolidated destination.
///
/// Returns the destination path when anything was written. Missing shards are
/// skipped silently.
pub fn merge_rolling_logs(store: &mut FileStore) -> Option<String> {
    let shards = (1..=ROLLING_LOG_MAX_SHARD)
        .rev()
        .map(|n| format!("{ROLLING_LOG_DIR}{ROLLING_LOG_NAME}.{n}{ROLLING_LOG_SUFFIX}"))
        .chain(std::iter::once(format!(
            "{ROLLING_LOG_DIR}{ROLLING_LOG_NAME}{ROLLING_LOG_SUFFIX}"
        )));

    let mut merged = String::new();
    let mut consumed = 0usize;
    for shard in shards {
        if let Some(text) = store.delete(&shard) {
            merged.push_str(&text);
            consumed += 1;
        }
    }

    if merged.is_empty() {
        tracing::debug!(shards = consumed, "No rolling log content to merge");
        return None;
    }

    store.create(ROLLING_LOG_DESTINATION, merged);
    tracing::info!(
        to = %ROLLING_LOG_DESTINATION,
        shards = consumed,
        "Rolling logs merged"
    );
    Some(ROLLING_LOG_DESTINATION.to_string())
}

/// Merge every discovered container's rotated logs into `logs/<name>.log`.
///
/// Returns the consolidated paths in container-name order.
pub fn merge_container_logs(store: &mut FileStore) -> Vec<String> {
    drop_compressed_strays(store);
    let names = container_names(store);
    let mut written = Vec::new();

    for name in names {
        let folder = format!("{CONTAINER_LOG_ROOT}{name}/");
        let current = format!("{folder}{CONTAINER_LOG_FILE}");

        // Numbered shards, oldest (highest number) first.
        let mut shards: Vec<(u64, String)> = store
            .paths()
            .filter_map(|path| {
                let suffix = path.strip_prefix(current.as_str())?.strip_prefix('.')?;
                let n = suffix.parse::<u64>().ok()?;
                Some((n, path.to_string()))
            })
            .collect();
        shards.sort_by(|a, b| b.0.cmp(&a.0));

        let mut merged = String::new();
        for (n, shard) in &shards {
            if let Some(text) = store.delete(shard) {
                tracing::debug!(container = %name, shard = n, "Appending container shard");
                merged.push_str(&text);
            }
        }
        if let Some(text) = store.delete(&current) {
            merged.push_str(&text);
        }

        if merged.is_empty() {
            tracing::debug!(container = %name, "Container logs empty; nothing written");
            continue;
        }

        let destination = format!("{CONTAINER_LOG_ROOT}{name}{LOG_SUFFIX}");
        store.create(destination.clone(), merged);
        tracing::info!(
            container = %name,
            to = %destination,
            shards = shards.len() + 1,
            "Container logs merged"
        );
        written.push(destination);
    }

    written
}

/// Delete container shards still carrying a `.gz` suffix. These failed to
/// inflate during unpacking and hold raw gzip bytes.
fn drop_compressed_strays(store: &mut FileStore) {
    let strays: Vec<String> = store
        .paths_with_suffix(COMPRESSED_SUFFIX)
        .filter(|path| {
            path.strip_prefix(CONTAINER_LOG_ROOT)
                .and_then(|rest| rest.split_once('/'))
                .is_some_and(|(name, file)| {
                    !name.is_empty() && !file.contains('/') && file.starts_with(CONTAINER_LOG_FILE)
                })
        })
        .map(str::to_string)
        .collect();

    for stray in &strays {
        tracing::warn!(file = %stray, "Dropping container shard that could not be decompressed");
        store.delete(stray);
    }
}

/// Distinct container names that have a current `logs/<name>/container.log`.
fn container_names(store: &FileStore) -> Vec<String> {
    static CONTAINER_LOG: OnceLock<Regex> = OnceLock::new();
    let re = CONTAINER_LOG.get_or_init(|| {
        // Constant pattern, covered by the tests below.
        Regex::new(r"^logs/([^/]+)/container\.log$").expect("container log regex")
    });

    // The store iterates in sorted order, so names come out sorted and unique.
    store
        .paths()
        .filter_map(|path| re.captures(path))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}
