//! ID3v2 tags on MP3 files

use super::text::{merge_value, repair_latin1};
use super::{ensure_exists, Editable, FormatAdapter};
use crate::error::FormatError;
use crate::model::{FormatKind, TagRecord, Value};
use id3::frame::Content;
use id3::{Encoding, ErrorKind, Frame, Tag, TagLike, Version};
use std::collections::BTreeMap;
use std::path::Path;

/// Frame identifiers and the field names they map to
///
/// Several date frames feed the same field.
const FRAMES: [(&str, &str); 22] = [
    ("TIT1", "genre"),
    ("TIT2", "title"),
    ("TIT3", "version"),
    ("TPE1", "artist"),
    ("TPE2", "performer"),
    ("TPE3", "conductor"),
    ("TPE4", "arranger"),
    ("TEXT", "lyricist"),
    ("TLAN", "language"),
    ("TALB", "album"),
    ("TRCK", "tracknumber"),
    ("TPOS", "discnumber"),
    ("TSST", "part"),
    ("TSRC", "isrc"),
    ("TDRC", "date"),
    ("TDRA", "date"),
    ("TDOR", "date"),
    ("TORY", "date"),
    ("TYER", "date"),
    ("TCOP", "copyright"),
    ("TPUB", "organization"),
    ("TCOM", "composer"),
];

/// Frames that are not written back: date aliases
const READ_ONLY_FRAMES: [&str; 4] = ["TDRA", "TDOR", "TORY", "TYER"];

/// Field name for a frame identifier
fn field_for(frame_id: &str) -> Option<&'static str> {
    FRAMES
        .iter()
        .find(|(id, _)| *id == frame_id)
        .map(|(_, name)| *name)
}

/// Writable (field, frame) pairs
fn writable_frames() -> impl Iterator<Item = (&'static str, &'static str)> {
    FRAMES
        .iter()
        .filter(|(id, _)| !READ_ONLY_FRAMES.contains(id))
        .map(|(id, name)| (*name, *id))
}

/// Adapter for ID3v2 tagged MP3 files
#[derive(Debug, Default)]
pub struct Mp3Adapter;

impl Mp3Adapter {
    pub fn new() -> Self {
        Self
    }

    fn read_tag(path: &Path) -> Result<Option<Tag>, FormatError> {
        match Tag::read_from_path(path) {
            Ok(tag) => Ok(Some(tag)),
            Err(e) if matches!(e.kind, ErrorKind::NoTag) => Ok(None),
            Err(e) => Err(FormatError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }
}

impl FormatAdapter for Mp3Adapter {
    fn kind(&self) -> FormatKind {
        FormatKind::Mp3
    }

    fn read(&self, path: &Path) -> Result<TagRecord, FormatError> {
        ensure_exists(path)?;
        let mut fields: BTreeMap<String, Value> = BTreeMap::new();

        if let Some(tag) = Self::read_tag(path)? {
            for frame in tag.frames() {
                let Some(name) = field_for(frame.id()) else {
                    continue;
                };
                let Content::Text(text) = frame.content() else {
                    continue;
                };
                let latin1 = frame.encoding() == Some(Encoding::Latin1);
                // ID3v2.4 separates multiple values with NUL
                for segment in text.split('\0') {
                    let decoded = if latin1 {
                        repair_latin1(segment)
                    } else {
                        Some(segment.to_string())
                    };
                    match decoded {
                        Some(decoded) => merge_value(&mut fields, name, &decoded),
                        None => log::debug!(
                            "Dropping undecodable {} frame in {}",
                            frame.id(),
                            path.display()
                        ),
                    }
                }
            }
        }

        Ok(TagRecord::from_fields(FormatKind::Mp3, fields, Some(path))?)
    }

    fn write(&self, record: &mut TagRecord) -> Result<(), FormatError> {
        let path = record.path().to_path_buf();
        ensure_exists(&path)?;
        let mut tag = Self::read_tag(&path)?.unwrap_or_else(Tag::new);

        for (id, _) in FRAMES {
            tag.remove(id);
        }
        for (field, id) in writable_frames() {
            if let Some(Value::Known(value)) = record.get(field) {
                let parts: Vec<&str> = value.split('\n').filter(|s| !s.is_empty()).collect();
                if !parts.is_empty() {
                    tag.add_frame(Frame::text(id, parts.join("\0")));
                }
            }
        }

        tag.write_to_path(&path, Version::Id3v24).map_err(|e| {
            let reason = e.to_string();
            match e.kind {
                ErrorKind::Io(source) => FormatError::Io {
                    path: path.clone(),
                    source,
                },
                _ => FormatError::Write {
                    path: path.clone(),
                    reason,
                },
            }
        })?;

        record.refresh_mtime();
        Ok(())
    }

    fn can_change(&self) -> Editable {
        Editable::Keys(writable_frames().map(|(field, _)| field.to_string()).collect())
    }
}
