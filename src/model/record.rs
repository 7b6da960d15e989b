use super::keys;
use super::{FormatKind, Value};
use crate::error::RecordError;
use chrono::{Local, TimeZone};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Image extensions considered when looking for cover art
const COVER_EXTENSIONS: [&str; 4] = ["jpeg", ".jpg", ".png", ".gif"];

/// Words that mark an image as album art
const COVER_KEYWORDS: [&str; 3] = ["front", "cover", "jacket"];

/// Metadata for one song file
///
/// Real keys hold tag values, multi-valued fields joined by `\n`.
/// Computed keys (see [`keys`]) are derived from the file and library state
/// and are rebuilt by [`TagRecord::sanitize`] after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct TagRecord {
    kind: FormatKind,
    fields: BTreeMap<String, Value>,
}

impl TagRecord {
    /// Create an empty record for a file and derive its computed fields
    pub fn new(kind: FormatKind, path: impl AsRef<Path>) -> Self {
        let mut record = Self {
            kind,
            fields: BTreeMap::new(),
        };
        record.set_path(path.as_ref());
        record.rederive();
        record
    }

    /// Build a record from raw fields, e.g. from a tag reader or a snapshot
    ///
    /// Fails only when no path is given and the fields carry none either.
    pub fn from_fields(
        kind: FormatKind,
        fields: BTreeMap<String, Value>,
        path: Option<&Path>,
    ) -> Result<Self, RecordError> {
        let mut record = Self { kind, fields };
        record.sanitize(path)?;
        Ok(record)
    }

    /// Rebuild a persisted record exactly as stored, without re-deriving
    ///
    /// The stored modification time is kept so staleness can be checked.
    pub(crate) fn restore(kind: FormatKind, fields: BTreeMap<String, Value>) -> Self {
        Self { kind, fields }
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        Path::new(self.fields.get(keys::PATH).map(Value::as_str).unwrap_or_default())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Text of a field, or `default` if it is absent
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.fields.get(key).map(Value::as_str).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(Value::as_int)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// All keys, computed ones included
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys backed by an actual tag: not computed and not a placeholder
    pub fn real_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(k, v)| !k.is_empty() && !keys::is_computed(k) && !v.is_unknown())
            .map(|(k, _)| k.as_str())
    }

    /// True if the key holds the placeholder rather than a real value
    pub fn unknown(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(Value::is_unknown)
    }

    /// Field segments joined with ", "
    pub fn comma(&self, key: &str) -> String {
        self.get_or(key, "").replace('\n', ", ")
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// True if the file exists and has not changed since it was indexed
    pub fn valid(&self) -> bool {
        match file_mtime(self.path()) {
            Some(mtime) => self.get_int(keys::MTIME) == Some(mtime),
            None => false,
        }
    }

    /// Normalize the record and recompute derived fields
    ///
    /// Safe to call any number of times. When `path` is `None` the current
    /// path is kept, or migrated from the legacy `filename` key.
    pub fn sanitize(&mut self, path: Option<&Path>) -> Result<(), RecordError> {
        if let Some(path) = path {
            self.set_path(path);
        } else if let Some(legacy) = self.fields.get(keys::LEGACY_PATH).cloned() {
            if !self.fields.contains_key(keys::PATH) {
                self.fields.insert(keys::PATH.to_string(), legacy);
            }
        }

        match self.fields.get(keys::PATH) {
            Some(Value::Known(p)) if !p.is_empty() => {}
            _ => return Err(RecordError::MissingPath),
        }

        self.rederive();
        Ok(())
    }

    /// Replace one segment of a field; overwrites the field if `old` is absent
    pub fn change(&mut self, key: &str, old: &str, new: &str) {
        let replaced = match self.fields.get(key) {
            Some(Value::Known(current)) => {
                let mut parts: Vec<&str> = current.split('\n').collect();
                parts.iter().position(|p| *p == old).map(|i| {
                    parts[i] = new;
                    parts.join("\n")
                })
            }
            _ => None,
        };
        self.fields.insert(
            key.to_string(),
            Value::Known(replaced.unwrap_or_else(|| new.to_string())),
        );
        self.rederive();
    }

    /// Append a segment, replacing a placeholder value
    pub fn add(&mut self, key: &str, value: &str) {
        let next = match self.fields.get(key) {
            Some(Value::Known(current)) => format!("{}\n{}", current, value),
            _ => value.to_string(),
        };
        self.fields.insert(key.to_string(), Value::Known(next));
        self.rederive();
    }

    /// Delete one matching segment; drops the key once it is empty
    pub fn remove(&mut self, key: &str, value: &str) {
        let remaining = match self.fields.get(key) {
            Some(Value::Known(current)) => {
                let mut parts: Vec<&str> = current.split('\n').collect();
                parts.iter().position(|p| *p == value).map(|i| {
                    parts.remove(i);
                    parts.join("\n")
                })
            }
            _ => None,
        };
        match remaining {
            Some(rest) if rest.is_empty() => {
                self.fields.remove(key);
            }
            Some(rest) => {
                self.fields.insert(key.to_string(), Value::Known(rest));
            }
            None => {}
        }
        self.rederive();
    }

    /// Record one play at the given unix timestamp
    pub fn mark_played(&mut self, at: i64) {
        let count = self.get_int(keys::PLAY_COUNT).unwrap_or(0) + 1;
        self.fields.insert(keys::PLAY_COUNT.to_string(), count.into());
        self.fields.insert(keys::LAST_PLAYED.to_string(), at.into());
    }

    pub fn set_rating(&mut self, rating: f64) {
        self.fields
            .insert(keys::RATING.to_string(), Value::Known(rating.to_string()));
    }

    /// Copy play history and rating from an older record of the same file
    pub fn inherit_history(&mut self, older: &TagRecord) {
        for key in [keys::PLAY_COUNT, keys::LAST_PLAYED, keys::RATING] {
            if let Some(value) = older.fields.get(key) {
                self.fields.insert(key.to_string(), value.clone());
            }
        }
    }

    /// Refresh the stored modification time after the file was rewritten
    pub fn refresh_mtime(&mut self) {
        let mtime = file_mtime(self.path()).unwrap_or(0);
        self.fields.insert(keys::MTIME.to_string(), mtime.into());
    }

    /// Best-scoring cover image in the song's directory
    pub fn find_cover_art(&self) -> Option<PathBuf> {
        let dir = self.path().parent()?;
        let mut names: Vec<String> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();

        names
            .into_iter()
            .filter_map(|name| {
                let lower = name.to_lowercase();
                if !COVER_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                    return None;
                }
                let score = COVER_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
                (score > 0).then_some((score, name))
            })
            .max()
            .map(|(_, name)| dir.join(name))
    }

    /// Multi-line description for "now playing" style displays
    pub fn describe(&self) -> String {
        let mut text = self.comma(keys::TITLE);
        if self.contains(keys::VERSION) {
            text.push('\n');
            text.push_str(&self.comma(keys::VERSION));
        }
        text.push_str("\nby ");
        text.push_str(&self.comma(keys::ARTIST));

        if self.contains(keys::PERFORMER) {
            text.push_str("\nPerformed by ");
            text.push_str(&self.comma(keys::PERFORMER));
        }

        let credits: Vec<String> = [
            ("arranger", "arranged by"),
            ("lyricist", "lyrics by"),
            ("conductor", "conducted by"),
            ("author", "written by"),
        ]
        .iter()
        .filter(|(key, _)| self.contains(key))
        .map(|(key, label)| format!("{} {}", label, self.comma(key)))
        .collect();
        if !credits.is_empty() {
            let joined = credits.join("; ");
            let mut chars = joined.chars();
            if let Some(first) = chars.next() {
                text.push('\n');
                text.extend(first.to_uppercase());
                text.push_str(chars.as_str());
            }
        }

        if !self.unknown(keys::ALBUM) {
            text.push('\n');
            text.push_str(&self.comma(keys::ALBUM));
            if self.contains(keys::DISC_NUMBER) {
                text.push_str(" - Disc ");
                text.push_str(&self.comma(keys::DISC_NUMBER));
            }
            if self.contains(keys::PART) {
                text.push_str(" - ");
                text.push_str(&self.comma(keys::PART));
            }
            if self.contains(keys::TRACK_NUMBER) {
                text.push_str(" - Track ");
                text.push_str(&self.comma(keys::TRACK_NUMBER));
            }
        }
        text
    }

    /// "Never", or the play count with the last played time
    pub fn play_summary(&self) -> String {
        let count = self.get_int(keys::PLAY_COUNT).unwrap_or(0);
        if count == 0 {
            return "Never".to_string();
        }
        let last = self.get_int(keys::LAST_PLAYED).unwrap_or(0);
        let when = match Local.timestamp_opt(last, 0).single() {
            Some(t) => t.format("%F, %X").to_string(),
            None => last.to_string(),
        };
        format!("{} times, recently on {}", count, when)
    }

    /// `key=value` lines for every real tag segment
    pub fn to_dump(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.fields {
            if keys::is_computed(key) {
                continue;
            }
            for segment in value.segments() {
                out.push_str(key);
                out.push('=');
                out.push_str(segment);
                out.push('\n');
            }
        }
        out
    }

    /// Library order: album, disc, track, artist, title
    ///
    /// Records without a disc or track number sort before numbered ones.
    pub fn sort_cmp(&self, other: &TagRecord) -> Ordering {
        self.get_or(keys::ALBUM, "")
            .cmp(other.get_or(keys::ALBUM, ""))
            .then_with(|| self.get_int(keys::DISC).cmp(&other.get_int(keys::DISC)))
            .then_with(|| self.get_int(keys::TRACK).cmp(&other.get_int(keys::TRACK)))
            .then_with(|| self.get_or(keys::ARTIST, "").cmp(other.get_or(keys::ARTIST, "")))
            .then_with(|| self.get_or(keys::TITLE, "").cmp(other.get_or(keys::TITLE, "")))
    }

    fn set_path(&mut self, path: &Path) {
        self.fields.insert(
            keys::PATH.to_string(),
            Value::Known(path.to_string_lossy().into_owned()),
        );
    }

    /// Everything `sanitize` does once the path is settled
    fn rederive(&mut self) {
        self.fields
            .entry(keys::LAST_PLAYED.to_string())
            .or_insert_with(|| Value::from(0i64));
        self.fields
            .entry(keys::PLAY_COUNT.to_string())
            .or_insert_with(|| Value::from(0i64));
        for key in keys::REQUIRED {
            self.fields.entry(key.to_string()).or_insert(Value::Unknown);
        }

        for (source, target) in [
            (keys::TRACK_NUMBER, keys::TRACK),
            (keys::DISC_NUMBER, keys::DISC),
        ] {
            match self.fields.get(source).and_then(leading_number) {
                Some(n) => {
                    self.fields.insert(target.to_string(), n.into());
                }
                None => {
                    self.fields.remove(target);
                }
            }
        }

        self.fields.remove(keys::VENDOR);
        // a legacy key that disagrees with the path is an ordinary tag
        if self.fields.get(keys::LEGACY_PATH) == self.fields.get(keys::PATH) {
            self.fields.remove(keys::LEGACY_PATH);
        }

        let path = self.path().to_path_buf();
        let mtime = file_mtime(&path).unwrap_or(0);
        self.fields.insert(keys::MTIME.to_string(), mtime.into());
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dirname = path
            .parent()
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.fields
            .insert(keys::BASENAME.to_string(), Value::Known(basename));
        self.fields
            .insert(keys::DIRNAME.to_string(), Value::Known(dirname));
    }
}

/// Number before the first `/` of the first segment, e.g. "3/12" -> 3
fn leading_number(value: &Value) -> Option<i64> {
    match value {
        Value::Known(s) => s.split('\n').next()?.split('/').next()?.trim().parse().ok(),
        Value::Unknown => None,
    }
}

/// Modification time of a file in whole seconds since the epoch
pub(crate) fn file_mtime(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let secs = match modified.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    };
    Some(secs)
}
