//! Per-format tag adapters
//!
//! Each container format gets one [`FormatAdapter`] that turns the file's
//! native tags into a [`TagRecord`] and back. Which adapters exist depends on
//! the codec features the crate was built with; the [`FormatRegistry`] maps
//! file extensions to whatever is available.

#[cfg(feature = "mp3")]
mod mp3;
pub mod text;
#[cfg(feature = "vorbis")]
mod vorbis;

#[cfg(feature = "mp3")]
pub use mp3::Mp3Adapter;
#[cfg(feature = "vorbis")]
pub use vorbis::VorbisAdapter;

use crate::error::FormatError;
use crate::model::{keys, FormatKind, TagRecord};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Set of keys a format lets the user edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Editable {
    /// Any key that is not computed or reserved
    Any,
    /// Only the listed keys
    Keys(BTreeSet<String>),
}

impl Editable {
    /// Keys editable under both `self` and `other`
    pub fn intersect(self, other: Editable) -> Editable {
        match (self, other) {
            (Editable::Any, other) | (other, Editable::Any) => other,
            (Editable::Keys(a), Editable::Keys(b)) => {
                Editable::Keys(a.intersection(&b).cloned().collect())
            }
        }
    }

    pub fn allows(&self, key: &str) -> bool {
        match self {
            Editable::Any => !is_reserved(key),
            Editable::Keys(keys) => keys.contains(key),
        }
    }
}

/// Computed keys and format bookkeeping keys are never editable
pub fn is_reserved(key: &str) -> bool {
    key.is_empty() || keys::is_computed(key) || key == keys::VENDOR
}

/// Reads and writes the tags of one container format
pub trait FormatAdapter {
    fn kind(&self) -> FormatKind;

    /// Read a file's tags into a sanitized record
    fn read(&self, path: &Path) -> Result<TagRecord, FormatError>;

    /// Replace the file's tags with the record's real keys
    ///
    /// Leaves the record's stored modification time matching the file.
    fn write(&self, record: &mut TagRecord) -> Result<(), FormatError>;

    /// Keys this format can store
    fn can_change(&self) -> Editable;

    fn can_change_key(&self, key: &str) -> bool {
        self.can_change().allows(key)
    }
}

/// A file that could not be written during a batch edit
#[derive(Debug)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub error: FormatError,
}

/// Adapters available in this build, looked up by kind or file extension
#[derive(Default)]
pub struct FormatRegistry {
    adapters: BTreeMap<FormatKind, Box<dyn FormatAdapter>>,
}

impl FormatRegistry {
    /// Create a registry with no adapters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every adapter compiled into this build
    pub fn with_available() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "vorbis")]
        {
            log::info!("Enabling Ogg Vorbis support.");
            registry.register(Box::new(VorbisAdapter::new(FormatKind::OggVorbis)));
            log::info!("Enabling FLAC support.");
            registry.register(Box::new(VorbisAdapter::new(FormatKind::Flac)));
        }
        #[cfg(not(feature = "vorbis"))]
        log::warn!("Ogg Vorbis and FLAC support is disabled! Those files cannot be loaded.");

        #[cfg(feature = "mp3")]
        {
            log::info!("Enabling MP3 support.");
            registry.register(Box::new(Mp3Adapter::new()));
        }
        #[cfg(not(feature = "mp3"))]
        log::warn!("MP3 support is disabled! MP3 files cannot be loaded.");

        registry
    }

    pub fn register(&mut self, adapter: Box<dyn FormatAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn adapter(&self, kind: FormatKind) -> Option<&dyn FormatAdapter> {
        self.adapters.get(&kind).map(|a| a.as_ref())
    }

    pub fn is_supported(&self, kind: FormatKind) -> bool {
        self.adapters.contains_key(&kind)
    }

    /// Adapter registered for the file's extension
    pub fn adapter_for_path(&self, path: &Path) -> Option<&dyn FormatAdapter> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        self.adapters
            .values()
            .find(|a| a.kind().extensions().iter().any(|ext| name.ends_with(ext)))
            .map(|a| a.as_ref())
    }

    pub fn supports_path(&self, path: &Path) -> bool {
        self.adapter_for_path(path).is_some()
    }

    /// Read a file if some adapter handles it
    ///
    /// Unsupported extensions and unreadable files both yield `None`;
    /// read failures are logged.
    pub fn open(&self, path: &Path) -> Option<TagRecord> {
        let adapter = self.adapter_for_path(path)?;
        match adapter.read(path) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Error loading {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write a record's tags back to its file
    pub fn write(&self, record: &mut TagRecord) -> Result<(), FormatError> {
        let adapter = self
            .adapter(record.kind())
            .ok_or(FormatError::Unsupported(record.kind()))?;
        adapter.write(record)
    }

    /// Write every record, collecting one failure per file that failed
    pub fn write_all<'a>(
        &self,
        records: impl IntoIterator<Item = &'a mut TagRecord>,
    ) -> Vec<WriteFailure> {
        let mut failures = Vec::new();
        for record in records {
            if let Err(error) = self.write(record) {
                log::warn!("Unable to write {}: {}", record.path().display(), error);
                failures.push(WriteFailure {
                    path: record.path().to_path_buf(),
                    error,
                });
            }
        }
        failures
    }

    /// Editable keys for a format; nothing if the format is unavailable
    pub fn editable(&self, kind: FormatKind) -> Editable {
        match self.adapter(kind) {
            Some(adapter) => adapter.can_change(),
            None => Editable::Keys(BTreeSet::new()),
        }
    }

    pub fn can_change_key(&self, kind: FormatKind, key: &str) -> bool {
        self.adapter(kind)
            .is_some_and(|adapter| adapter.can_change_key(key))
    }
}

/// Fail with [`FormatError::MissingFile`] unless the path exists
pub(crate) fn ensure_exists(path: &Path) -> Result<(), FormatError> {
    if path.exists() {
        Ok(())
    } else {
        Err(FormatError::MissingFile(path.to_path_buf()))
    }
}
