//! Search history persisted to a local JSON file.
//!
//! Every change rewrites the whole file synchronously. The list holds at most
//! ten short strings, so the write is cheap enough to run inline from async
//! callers. It happens outside the entries lock, so readers never wait on disk.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Number of queries kept.
pub const MAX_HISTORY: usize = 10;

/// File stem used when the history lives in a data directory.
pub const STORAGE_KEY: &str = "ara_search_history";

/// Most-recent-first list of distinct search queries.
#[derive(Debug)]
pub struct SearchHistory {
    path: Option<PathBuf>,
    entries: Mutex<Vec<String>>,
    /// Serializes file writes. Each write stores the latest entries.
    writer: Mutex<()>,
}

impl SearchHistory {
    /// Open the history stored at `path`.
    ///
    /// A missing file starts an empty history. Unreadable or corrupt contents
    /// are logged and also start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = normalize(hydrate(&path));

        tracing::debug!("Loaded {} history entries from {:?}", entries.len(), path);

        Self {
            path: Some(path),
            entries: Mutex::new(entries),
            writer: Mutex::new(()),
        }
    }

    /// History stored under [`STORAGE_KEY`] inside `dir`.
    pub fn open_in_dir(dir: impl AsRef<Path>) -> Self {
        Self::open(dir.as_ref().join(format!("{}.json", STORAGE_KEY)))
    }

    /// A history that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    /// Record a query at the front, moving it there if already present.
    pub fn add(&self, query: &str) {
        if query.trim().is_empty() {
            return;
        }

        {
            let mut entries = self.lock();
            entries.retain(|q| q != query);
            entries.insert(0, query.to_string());
            entries.truncate(MAX_HISTORY);
        }
        self.persist();
    }

    pub fn remove(&self, query: &str) {
        let changed = {
            let mut entries = self.lock();
            let before = entries.len();
            entries.retain(|q| q != query);
            entries.len() != before
        };
        if changed {
            self.persist();
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
        self.persist();
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current list. Failures are logged, never returned.
    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = self.entries();
        if let Err(e) = write_entries(path, &entries) {
            tracing::warn!("Failed to persist search history to {:?}: {}", path, e);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn hydrate(path: &Path) -> Vec<String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!("Error reading search history {:?}: {}", path, e);
            return Vec::new();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!("Error loading search history {:?}: {}", path, e);
        Vec::new()
    })
}

/// Re-establish the list invariants on data read from disk.
fn normalize(stored: Vec<String>) -> Vec<String> {
    let mut entries: Vec<String> = Vec::with_capacity(MAX_HISTORY);
    for query in stored {
        if query.trim().is_empty() || entries.contains(&query) {
            continue;
        }
        entries.push(query);
        if entries.len() == MAX_HISTORY {
            break;
        }
    }
    entries
}

fn write_entries(path: &Path, entries: &[String]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec(entries)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_duplicate_query_moves_to_front() {
        let history = SearchHistory::in_memory();
        history.add("graph neural networks");
        history.add("transformers");
        history.add("graph neural networks");

        assert_eq!(
            history.entries(),
            vec!["graph neural networks", "transformers"]
        );
    }

    #[test]
    fn test_dedup_is_case_sensitive() {
        let history = SearchHistory::in_memory();
        history.add("BERT");
        history.add("bert");
        assert_eq!(history.entries(), vec!["bert", "BERT"]);
    }

    #[test]
    fn test_eleventh_query_evicts_oldest() {
        let history = SearchHistory::in_memory();
        for i in 0..11 {
            history.add(&format!("query {}", i));
        }

        let entries = history.entries();
        assert_eq!(entries.len(), MAX_HISTORY);
        assert_eq!(entries[0], "query 10");
        assert!(!entries.contains(&"query 0".to_string()));
    }

    #[test]
    fn test_blank_query_is_ignored() {
        let history = SearchHistory::in_memory();
        history.add("   ");
        history.add("");
        history.add("\t\n");
        assert!(history.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let history = SearchHistory::in_memory();
        history.add("a");
        history.add("b");
        history.remove("a");
        assert_eq!(history.entries(), vec!["b"]);

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let history = SearchHistory::open(&path);
        history.add("first");
        history.add("second");
        drop(history);

        let reopened = SearchHistory::open(&path);
        assert_eq!(reopened.entries(), vec!["second", "first"]);

        let raw = fs::read_to_string(&path).unwrap();
        let stored: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, vec!["second", "first"]);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{not json").unwrap();

        let history = SearchHistory::open(&path);
        assert!(history.is_empty());

        // The next change overwrites the corrupt data
        history.add("recovered");
        let reopened = SearchHistory::open(&path);
        assert_eq!(reopened.entries(), vec!["recovered"]);
    }

    #[test]
    fn test_stored_data_is_normalized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let stored: Vec<String> = ["a", "a", " ", "b"]
            .iter()
            .map(|s| s.to_string())
            .chain((0..20).map(|i| format!("q{}", i)))
            .collect();
        fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let history = SearchHistory::open(&path);
        let entries = history.entries();
        assert_eq!(entries.len(), MAX_HISTORY);
        assert_eq!(&entries[..2], &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_open_in_dir_uses_storage_key() {
        let dir = TempDir::new().unwrap();
        let history = SearchHistory::open_in_dir(dir.path());
        history.add("x");
        assert!(dir.path().join("ara_search_history.json").exists());
    }

    #[test]
    fn test_entries_readable_while_file_write_is_pending() {
        let dir = TempDir::new().unwrap();
        let history = SearchHistory::open(dir.path().join("history.json"));

        std::thread::scope(|scope| {
            let writer = history.writer.lock().unwrap();
            let adder = scope.spawn(|| history.add("graph neural networks"));

            // The in-memory list updates even though the file write is blocked
            let mut visible = false;
            for _ in 0..200 {
                if history.entries() == vec!["graph neural networks"] {
                    visible = true;
                    break;
                }
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
            assert!(visible);

            drop(writer);
            adder.join().unwrap();
        });

        let reopened = SearchHistory::open(dir.path().join("history.json"));
        assert_eq!(reopened.entries(), vec!["graph neural networks"]);
    }

    #[test]
    fn test_concurrent_adds_leave_file_in_sync() {
        let dir = TempDir::new().unwrap();
        let history = SearchHistory::open(dir.path().join("history.json"));

        std::thread::scope(|scope| {
            for i in 0..8 {
                let history = &history;
                scope.spawn(move || history.add(&format!("query {}", i)));
            }
        });

        assert_eq!(history.len(), 8);
        let reopened = SearchHistory::open(dir.path().join("history.json"));
        assert_eq!(reopened.entries(), history.entries());
    }
}
