// SupportSleuth - core/database.rs
//
// The global, time-ordered entry list and its three inverted indexes, plus
// rendering of the filtered view.
//
// The database is always rebuilt from scratch from the file store; indexes
// are never patched incrementally.

use crate::core::filter::{FileSelection, Filter};
use crate::core::model::{AnalysedFile, ColourTag, LogEntry, Severity, View};
use crate::core::parser::{parse_content, ParseConfig};
use crate::core::store::{logical_name, FileStore};
use crate::util::constants::{COLOUR_RESET, LOG_SUFFIX, NO_ENTRIES_MATCHED};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Index key -> ascending positions into the entry list.
pub type Index<K> = BTreeMap<K, Vec<usize>>;

/// Everything the collaborator needs to populate its pickers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Structure {
    /// Non-empty components, sorted.
    pub components: Vec<String>,

    /// Severities that occur, most severe first.
    pub severities: Vec<Severity>,

    /// Logical log names, sorted.
    pub logs: Vec<String>,

    /// Every path in the file store, sorted.
    pub files: Vec<String>,
}

#[derive(Debug, Default)]
pub struct LogDatabase {
    entries: Vec<LogEntry>,
    component_index: Index<String>,
    severity_index: Index<Severity>,
    file_index: Index<String>,
    analysed: Vec<AnalysedFile>,

    /// Store path -> palette slot. Survives rebuilds so a log keeps its colour.
    colours: BTreeMap<String, ColourTag>,
}

impl LogDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive everything from the `.log` files in `store`.
    ///
    /// Returns the number of entries.
    pub fn rebuild(&mut self, store: &FileStore, config: &ParseConfig) -> usize {
        let log_paths: Vec<String> = store
            .paths_with_suffix(LOG_SUFFIX)
            .map(str::to_string)
            .collect();
        self.assign_colours(&log_paths);

        self.entries.clear();
        self.analysed.clear();

        for path in &log_paths {
            let Some(content) = store.get(path) else {
                continue;
            };
            let name = logical_name(path);
            let colour = self.colours.get(path).copied().unwrap_or_default();

            let result = parse_content(content, name, config);
            tracing::debug!(
                file = %path,
                name = %name,
                entries = result.entries.len(),
                "Log ingested"
            );

            self.analysed.push(AnalysedFile {
                name: name.to_string(),
                path: path.clone(),
                entry_count: result.entries.len(),
                earliest_ms: result.earliest_ms,
                latest_ms: result.latest_ms,
                colour,
            });
            self.entries
                .extend(result.entries.into_iter().map(|e| LogEntry { colour, ..e }));
        }

        // Stable: equal timestamps keep their file order.
        self.entries.sort_by_key(|e| e.timestamp_ms);
        self.check_order();
        self.rebuild_indexes();

        tracing::info!(
            logs = log_paths.len(),
            entries = self.entries.len(),
            components = self.component_index.len(),
            "Log database rebuilt"
        );

        self.entries.len()
    }

    /// Drop all entries and indexes (colour assignments included).
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn component_index(&self) -> &Index<String> {
        &self.component_index
    }

    pub fn severity_index(&self) -> &Index<Severity> {
        &self.severity_index
    }

    pub fn file_index(&self) -> &Index<String> {
        &self.file_index
    }

    /// Per-log summaries in store-path order.
    pub fn analysed_files(&self) -> &[AnalysedFile] {
        &self.analysed
    }

    /// Palette slot of a store path, if it is a parsed log.
    pub fn colour_of(&self, path: &str) -> Option<ColourTag> {
        self.colours.get(path).copied()
    }

    pub fn structure(&self, store: &FileStore) -> Structure {
        Structure {
            components: self.component_index.keys().cloned().collect(),
            severities: Severity::levels()
                .iter()
                .filter(|s| self.severity_index.contains_key(*s))
                .copied()
                .collect(),
            logs: self.file_index.keys().cloned().collect(),
            files: store.paths().map(str::to_string).collect(),
        }
    }

    /// Ascending positions of the entries that pass `filter`.
    pub fn filtered_indices(&self, filter: &Filter) -> Vec<usize> {
        let mut candidates: Vec<usize> = match filter.files {
            FileSelection::All => (0..self.entries.len()).collect(),
            FileSelection::Only(ref names) => {
                let mut merged: Vec<usize> = names
                    .iter()
                    .filter_map(|n| self.file_index.get(logical_name(n)))
                    .flatten()
                    .copied()
                    .collect();
                merged.sort_unstable();
                merged.dedup();
                merged
            }
        };

        // Narrow through the component and severity indexes before the
        // per-entry checks.
        if let Some(ref components) = filter.components {
            let allowed: BTreeSet<usize> = components
                .iter()
                .filter_map(|c| self.component_index.get(c))
                .flatten()
                .copied()
                .collect();
            candidates.retain(|i| allowed.contains(i));
        }
        if let Some(floor) = filter.severity_floor {
            let allowed: BTreeSet<usize> = self
                .severity_index
                .iter()
                .filter(|(severity, _)| severity.at_least(floor))
                .flat_map(|(_, positions)| positions.iter().copied())
                .collect();
            candidates.retain(|i| allowed.contains(i));
        }

        candidates.retain(|&i| filter.passes(&self.entries[i]));
        candidates
    }

    /// The entries that pass `filter`, in timestamp order.
    pub fn filtered_entries(&self, filter: &Filter) -> Vec<&LogEntry> {
        self.filtered_indices(filter)
            .into_iter()
            .map(|i| &self.entries[i])
            .collect()
    }

    /// Render the current view.
    ///
    /// A [`View::File`] naming a file in the store renders that file
    /// verbatim. Anything else renders the filtered, merged log; an empty
    /// result renders [`NO_ENTRIES_MATCHED`].
    pub fn render(&self, store: &FileStore, view: &View, filter: &Filter) -> String {
        if let View::File(path) = view {
            if let Some(content) = store.get(path) {
                return content.to_string();
            }
            tracing::debug!(file = %path, "Chosen view is not a stored file; rendering log");
        }

        let indices = self.filtered_indices(filter);
        if indices.is_empty() {
            return NO_ENTRIES_MATCHED.to_string();
        }

        let mut out = String::new();
        for i in indices {
            let entry = &self.entries[i];
            if filter.include_timestamp {
                out.push_str(&entry.timestamp_ms.to_string());
                out.push(' ');
            }
            if filter.colorize {
                out.push_str(entry.colour.code());
                out.push_str(&entry.message);
                out.push_str(COLOUR_RESET);
            } else {
                out.push_str(&entry.message);
            }
            out.push('\n');
        }
        out
    }

    /// Keep existing slots, free the slots of vanished logs, and give each
    /// new log the lowest free slot.
    fn assign_colours(&mut self, log_paths: &[String]) {
        let present: BTreeSet<&str> = log_paths.iter().map(String::as_str).collect();
        self.colours.retain(|path, _| present.contains(path.as_str()));

        for path in log_paths {
            if self.colours.contains_key(path) {
                continue;
            }
            let used: BTreeSet<usize> = self.colours.values().map(|c| c.0).collect();
            let slot = (0..).find(|i| !used.contains(i)).unwrap_or(used.len());
            tracing::debug!(file = %path, slot, "Assigned colour");
            self.colours.insert(path.clone(), ColourTag(slot));
        }
    }

    fn rebuild_indexes(&mut self) {
        self.component_index.clear();
        self.severity_index.clear();
        self.file_index.clear();

        for (i, entry) in self.entries.iter().enumerate() {
            if !entry.component.is_empty() {
                self.component_index
                    .entry(entry.component.clone())
                    .or_default()
                    .push(i);
            }
            self.severity_index.entry(entry.severity).or_default().push(i);
            self.file_index
                .entry(entry.source_file.clone())
                .or_default()
                .push(i);
        }
    }

    /// Sort self-check; never fatal.
    fn check_order(&self) {
        let out_of_order = self
            .entries
            .windows(2)
            .filter(|pair| pair[0].timestamp_ms > pair[1].timestamp_ms)
            .count();
        if out_of_order > 0 {
            tracing::warn!(pairs = out_of_order, "Log entries out of order after sort");
        }
    }
}
