// SupportSleuth - core/store.rs
//
// Flat in-memory file store: relative forward-slash path -> decoded text.
// Pipeline stages create, overwrite and delete entries; by the end of an
// ingestion only final, consolidated files remain.

use std::collections::BTreeMap;

/// The normalised contents of one support package.
///
/// Keys are kept sorted so every iteration (and therefore every derived
/// artefact) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStore {
    files: BTreeMap<String, String>,
}

impl FileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite `path`.
    pub fn create(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        let path = path.into();
        let contents = contents.into();
        tracing::debug!(file = %path, bytes = contents.len(), "Creating file");
        if self.files.insert(path.clone(), contents).is_some() {
            tracing::debug!(file = %path, "Overwrote existing file");
        }
    }

    /// Remove `path`, returning its contents if it existed.
    pub fn delete(&mut self, path: &str) -> Option<String> {
        let removed = self.files.remove(path);
        if removed.is_some() {
            tracing::debug!(file = %path, "Removing file");
        }
        removed
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// All paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// All `(path, contents)` pairs in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Paths ending in `suffix`, sorted.
    pub fn paths_with_suffix<'a>(&'a self, suffix: &'a str) -> impl Iterator<Item = &'a str> {
        self.paths().filter(move |p| p.ends_with(suffix))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

/// Short logical name of a log: the file name without folders and without
/// anything from its first `.` onward (`logs/wiser-home.log` -> `wiser-home`).
pub fn logical_name(path: &str) -> &str {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name.split('.').next().unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_overwrite_delete() {
        let mut store = FileStore::new();
        store.create("logs/core.log", "a");
        store.create("logs/core.log", "b");
        assert_eq!(store.get("logs/core.log"), Some("b"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.delete("logs/core.log"), Some("b".to_string()));
        assert!(store.delete("logs/core.log").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_paths_with_suffix_sorted() {
        let mut store = FileStore::new();
        store.create("logs/zigbee.log", "");
        store.create("datamodel.json", "{}");
        store.create("logs/cloud.log", "");
        let logs: Vec<_> = store.paths_with_suffix(".log").collect();
        assert_eq!(logs, vec!["logs/cloud.log", "logs/zigbee.log"]);
    }

    #[test]
    fn test_logical_name_strips_folders_and_suffixes() {
        assert_eq!(logical_name("logs/core.log"), "core");
        assert_eq!(logical_name("logs/wiser-home.log"), "wiser-home");
        assert_eq!(logical_name("journal.log"), "journal");
        assert_eq!(logical_name("core"), "core");
    }
}
