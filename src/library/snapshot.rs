//! On-disk library snapshot
//!
//! JSON document holding one entry per record. Entries are decoded one by
//! one so a malformed entry, or one for a format this build does not know,
//! only loses that entry. Placeholder values are not stored; sanitizing
//! re-creates them.

use crate::error::LibraryError;
use crate::model::{FormatKind, TagRecord, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct SnapshotOut {
    version: u32,
    records: Vec<StoredRecord>,
}

#[derive(Debug, Deserialize)]
struct SnapshotIn {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    records: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    kind: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

impl From<&TagRecord> for StoredRecord {
    fn from(record: &TagRecord) -> Self {
        let fields = record
            .fields()
            .filter_map(|(k, v)| match v {
                Value::Known(s) => Some((k.to_string(), s.clone())),
                Value::Unknown => None,
            })
            .collect();
        Self {
            kind: record.kind().name().to_string(),
            fields,
        }
    }
}

impl StoredRecord {
    fn into_record(self) -> Option<TagRecord> {
        let kind = FormatKind::from_name(&self.kind)?;
        let fields = self
            .fields
            .into_iter()
            .map(|(k, v)| (k, Value::Known(v)))
            .collect();
        Some(TagRecord::restore(kind, fields))
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive advisory lock guarding a snapshot; released on drop
pub struct SnapshotLock {
    _file: File,
}

impl SnapshotLock {
    /// Block until the snapshot's lock file can be locked exclusively
    pub fn acquire(path: &Path) -> Result<Self, LibraryError> {
        let lock = lock_path(path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock)
            .map_err(|e| LibraryError::io(&lock, e))?;
        file.lock().map_err(|e| LibraryError::io(&lock, e))?;
        Ok(Self { _file: file })
    }
}

/// Write records to `path`, replacing any previous snapshot atomically
pub fn write<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a TagRecord>,
) -> Result<usize, LibraryError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| LibraryError::io(&dir, e))?;

    let _lock = SnapshotLock::acquire(path)?;

    let snapshot = SnapshotOut {
        version: SNAPSHOT_VERSION,
        records: records.into_iter().map(StoredRecord::from).collect(),
    };
    let count = snapshot.records.len();

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| LibraryError::io(&dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush().map_err(|e| LibraryError::io(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| LibraryError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| LibraryError::io(path, e.error))?;

    Ok(count)
}

/// Read every decodable record from `path`
///
/// Records come back exactly as stored; callers decide whether they are
/// still valid.
pub fn read(path: &Path) -> Result<Vec<TagRecord>, LibraryError> {
    // opened first so a missing snapshot leaves no lock file behind
    let file = File::open(path).map_err(|e| LibraryError::io(path, e))?;
    let _lock = SnapshotLock::acquire(path)?;
    let snapshot: SnapshotIn = serde_json::from_reader(BufReader::new(file))?;

    if snapshot.version > SNAPSHOT_VERSION {
        log::warn!(
            "{} was written by a newer version ({}); reading what is understood",
            path.display(),
            snapshot.version
        );
    }

    let mut records = Vec::with_capacity(snapshot.records.len());
    for entry in snapshot.records {
        match serde_json::from_value::<StoredRecord>(entry) {
            Ok(stored) => {
                let kind = stored.kind.clone();
                match stored.into_record() {
                    Some(record) => records.push(record),
                    None => log::debug!("Dropping entry of unknown kind {:?}", kind),
                }
            }
            Err(e) => log::debug!("Dropping malformed entry: {}", e),
        }
    }
    Ok(records)
}
