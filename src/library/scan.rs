//! Incremental directory scan
//!
//! [`Scan`] is an iterator: each call to `next` visits one file and yields
//! the running counts, so a caller can refresh progress between steps or
//! stop early. Records added before the scan stops stay in the library.

use super::LibraryStore;
use crate::formats::FormatRegistry;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use walkdir::WalkDir;

/// Running totals of a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub added: usize,
    pub changed: usize,
}

/// Stops a scan before its next step
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Lazy scan of a set of directory roots
pub struct Scan<'a> {
    library: &'a mut LibraryStore,
    registry: &'a FormatRegistry,
    roots: std::vec::IntoIter<PathBuf>,
    walker: Option<walkdir::IntoIter>,
    progress: ScanProgress,
    abort: AbortHandle,
}

impl<'a> Scan<'a> {
    pub(super) fn new(
        library: &'a mut LibraryStore,
        registry: &'a FormatRegistry,
        roots: Vec<PathBuf>,
    ) -> Self {
        Self {
            library,
            registry,
            roots: roots.into_iter(),
            walker: None,
            progress: ScanProgress::default(),
            abort: AbortHandle::default(),
        }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn progress(&self) -> ScanProgress {
        self.progress
    }

    /// Next regular file across all roots
    fn next_file(&mut self) -> Option<PathBuf> {
        loop {
            if self.walker.is_none() {
                let root = self.roots.next()?;
                log::info!("Checking {}", root.display());
                self.walker = Some(WalkDir::new(root).follow_links(true).into_iter());
            }
            let walker = self.walker.as_mut()?;
            match walker.next() {
                Some(Ok(entry)) if entry.file_type().is_file() => {
                    return Some(entry.into_path());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => log::warn!("Skipping unreadable entry: {}", e),
                None => self.walker = None,
            }
        }
    }

    fn visit(&mut self, path: PathBuf) {
        match self.library.get(&path) {
            Some(existing) if existing.valid() => {}
            Some(existing) => {
                let older = existing.clone();
                match self.registry.open(&path) {
                    Some(mut record) => {
                        record.inherit_history(&older);
                        self.library.insert(record);
                        self.progress.changed += 1;
                    }
                    None => {
                        self.library.remove_path(&path);
                    }
                }
            }
            None => {
                if let Some(record) = self.registry.open(&path) {
                    self.library.insert(record);
                    self.progress.added += 1;
                }
            }
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = ScanProgress;

    fn next(&mut self) -> Option<ScanProgress> {
        if self.abort.is_aborted() {
            return None;
        }
        let path = self.next_file()?;
        self.visit(path);
        Some(self.progress)
    }
}
