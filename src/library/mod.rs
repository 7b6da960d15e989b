//! Library store
//!
//! Every known song keyed by its file path, with scan, load, save and
//! prune. The store is plain owned state: the binary creates one at startup
//! and saves it before exiting.

mod scan;
mod snapshot;

pub use scan::{AbortHandle, Scan, ScanProgress};
pub use snapshot::{SnapshotLock, SNAPSHOT_VERSION};

use crate::config::expand;
use crate::error::LibraryError;
use crate::formats::FormatRegistry;
use crate::model::{keys, TagRecord};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outcome of [`LibraryStore::load`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Entries indexed, changed ones included
    pub loaded: usize,
    /// Entries whose file changed on disk and was re-read
    pub changed: usize,
    /// Entries dropped because their file is gone or unreadable
    pub removed: usize,
}

#[derive(Debug, Default)]
pub struct LibraryStore {
    records: BTreeMap<PathBuf, TagRecord>,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&TagRecord> {
        self.records.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut TagRecord> {
        self.records.get_mut(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// Index a record under its path, returning the record it replaced
    pub fn insert(&mut self, record: TagRecord) -> Option<TagRecord> {
        self.records.insert(record.path().to_path_buf(), record)
    }

    /// Drop the entry sharing the record's path
    pub fn remove(&mut self, record: &TagRecord) -> Option<TagRecord> {
        self.remove_path(record.path())
    }

    pub fn remove_path(&mut self, path: &Path) -> Option<TagRecord> {
        self.records.remove(path)
    }

    /// Records in path order
    pub fn records(&self) -> impl Iterator<Item = &TagRecord> {
        self.records.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut TagRecord> {
        self.records.values_mut()
    }

    /// Records in album, disc, track, artist, title order
    pub fn sorted(&self) -> Vec<&TagRecord> {
        let mut records: Vec<&TagRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.sort_cmp(b));
        records
    }

    /// Start a scan of the given roots
    ///
    /// Roots may use `~` for the home directory. Nothing happens until the
    /// returned iterator is driven.
    pub fn scan<'a, I, P>(&'a mut self, registry: &'a FormatRegistry, roots: I) -> Scan<'a>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let roots = roots.into_iter().map(|root| expand(root.as_ref())).collect();
        Scan::new(self, registry, roots)
    }

    /// Merge a snapshot into the store
    ///
    /// Never fails: a missing or corrupt snapshot loads nothing. Entries of
    /// formats without an adapter are dropped, vanished files are pruned and
    /// changed files are re-read.
    pub fn load(&mut self, path: &Path, registry: &FormatRegistry) -> LoadStats {
        let mut stats = LoadStats::default();
        let stored = match snapshot::read(path) {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Unable to load library {}: {}", path.display(), e);
                return stats;
            }
        };

        for mut record in stored {
            if !registry.is_supported(record.kind()) {
                log::debug!(
                    "Dropping {} entry; no {} support",
                    record.path().display(),
                    record.kind()
                );
                continue;
            }

            if record.valid() {
                match record.sanitize(None) {
                    Ok(()) => {
                        self.insert(record);
                        stats.loaded += 1;
                    }
                    Err(e) => log::debug!("Dropping snapshot entry: {}", e),
                }
                continue;
            }

            let file = stored_path(&record);
            match file.filter(|p| p.exists()).and_then(|p| registry.open(&p)) {
                Some(mut fresh) => {
                    fresh.inherit_history(&record);
                    self.insert(fresh);
                    stats.loaded += 1;
                    stats.changed += 1;
                }
                None => stats.removed += 1,
            }
        }

        log::info!(
            "Loaded {} songs from {} ({} changed, {} removed)",
            stats.loaded,
            path.display(),
            stats.changed,
            stats.removed
        );
        stats
    }

    /// Write every record whose file still exists
    ///
    /// Returns the number of records written. Write failures are returned
    /// so unsaved edits are not lost silently.
    pub fn save(&self, path: &Path) -> Result<usize, LibraryError> {
        let count = snapshot::write(path, self.records.values().filter(|r| r.exists()))?;
        log::info!("Saved {} songs to {}", count, path.display());
        Ok(count)
    }
}

/// Path of a stored entry, from the path key or the legacy `filename` key
fn stored_path(record: &TagRecord) -> Option<PathBuf> {
    [keys::PATH, keys::LEGACY_PATH]
        .into_iter()
        .map(|key| record.get_or(key, ""))
        .find(|p| !p.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FormatKind;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, [0u8; 256]).unwrap();
        path
    }

    #[test]
    fn test_insert_and_remove() {
        let mut library = LibraryStore::new();
        let record = TagRecord::new(FormatKind::Mp3, "/music/a.mp3");
        assert!(library.insert(record.clone()).is_none());
        assert!(library.contains(Path::new("/music/a.mp3")));
        assert_eq!(library.len(), 1);

        assert_eq!(library.remove(&record), Some(record));
        assert!(library.is_empty());
    }

    #[test]
    fn test_sorted_uses_record_order() {
        let mut library = LibraryStore::new();
        for (path, album) in [("/a.mp3", "Zed"), ("/b.mp3", "Alpha")] {
            let mut record = TagRecord::new(FormatKind::Mp3, path);
            record.add("album", album);
            library.insert(record);
        }
        let albums: Vec<&str> = library
            .sorted()
            .into_iter()
            .map(|r| r.get_or("album", ""))
            .collect();
        assert_eq!(albums, ["Alpha", "Zed"]);
    }

    #[test]
    fn test_save_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        let mut library = LibraryStore::new();
        library.insert(TagRecord::new(FormatKind::Mp3, touch(&dir, "here.mp3")));
        library.insert(TagRecord::new(FormatKind::Mp3, dir.path().join("gone.mp3")));

        let snapshot = dir.path().join("library.json");
        assert_eq!(library.save(&snapshot).unwrap(), 1);
    }

    #[test]
    fn test_load_missing_snapshot_is_empty() {
        let dir = TempDir::new().unwrap();
        let mut library = LibraryStore::new();
        let stats = library.load(&dir.path().join("absent.json"), &FormatRegistry::new());
        assert_eq!(stats, LoadStats::default());
        assert!(library.is_empty());
    }

    #[test]
    fn test_load_drops_kinds_without_adapter() {
        let dir = TempDir::new().unwrap();
        let mut library = LibraryStore::new();
        library.insert(TagRecord::new(FormatKind::Mp3, touch(&dir, "a.mp3")));
        let snapshot = dir.path().join("library.json");
        library.save(&snapshot).unwrap();

        let mut reloaded = LibraryStore::new();
        let stats = reloaded.load(&snapshot, &FormatRegistry::new());
        assert_eq!(stats.loaded, 0);
        assert!(reloaded.is_empty());
    }

    #[cfg(feature = "mp3")]
    #[test]
    fn test_scan_adds_then_skips() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "a.mp3");
        touch(&dir, "sub/b.mp3");
        touch(&dir, "notes.txt");
        let registry = FormatRegistry::with_available();
        let mut library = LibraryStore::new();

        let root = dir.path().to_string_lossy().into_owned();
        let steps: Vec<ScanProgress> = library.scan(&registry, [&root]).collect();
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps.last().copied(),
            Some(ScanProgress { added: 2, changed: 0 })
        );
        assert_eq!(library.len(), 2);

        let last = library.scan(&registry, [&root]).last();
        assert_eq!(last, Some(ScanProgress::default()));
    }

    #[cfg(feature = "mp3")]
    #[test]
    fn test_scan_rereads_stale_records() {
        let dir = TempDir::new().unwrap();
        let path = touch(&dir, "a.mp3");
        let registry = FormatRegistry::with_available();
        let mut library = LibraryStore::new();

        let mut indexed = TagRecord::new(FormatKind::Mp3, &path);
        indexed.mark_played(1_000);
        // indexed at a different modification time than the file has now
        let mut fields: BTreeMap<String, crate::model::Value> = indexed
            .fields()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        fields.insert(keys::MTIME.to_string(), crate::model::Value::from(1i64));
        let stale = TagRecord::restore(FormatKind::Mp3, fields);
        assert!(!stale.valid());
        library.insert(stale);

        let root = dir.path().to_string_lossy().into_owned();
        let last = library.scan(&registry, [&root]).last();
        assert_eq!(last, Some(ScanProgress { added: 0, changed: 1 }));
        let record = library.get(&path).unwrap();
        assert!(record.valid());
        assert_eq!(record.get_int(keys::PLAY_COUNT), Some(1));
    }

    #[cfg(feature = "mp3")]
    #[test]
    fn test_scan_abort() {
        let dir = TempDir::new().unwrap();
        for name in ["a.mp3", "b.mp3", "c.mp3"] {
            touch(&dir, name);
        }
        let registry = FormatRegistry::with_available();
        let mut library = LibraryStore::new();
        let root = dir.path().to_string_lossy().into_owned();

        let mut scan = library.scan(&registry, [&root]);
        let handle = scan.abort_handle();
        assert_eq!(scan.next(), Some(ScanProgress { added: 1, changed: 0 }));
        handle.abort();
        assert_eq!(scan.next(), None);
        drop(scan);
        assert_eq!(library.len(), 1);
    }
}
