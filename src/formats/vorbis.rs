//! Vorbis comments in Ogg Vorbis and FLAC files

use super::text::merge_value;
use super::{ensure_exists, is_reserved, Editable, FormatAdapter};
use crate::error::FormatError;
use crate::model::{FormatKind, TagRecord, Value};
use lofty::config::{ParseOptions, WriteOptions};
use lofty::error::LoftyError;
use lofty::file::AudioFile;
use lofty::flac::FlacFile;
use lofty::ogg::{VorbisComments, VorbisFile};
use lofty::tag::TagExt;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::path::Path;

const FLAC_MARKER: &[u8] = b"fLaC";
const FLAC_LAST_BLOCK: u8 = 0x80;
const FLAC_PADDING: u8 = 1;
/// Size of the PADDING block added to files that have none
const FLAC_PADDING_SIZE: usize = 1024;

/// Adapter for formats that store tags as Vorbis comments
///
/// Comment names are free-form; they are lower-cased on read and written
/// back upper-cased.
#[derive(Debug)]
pub struct VorbisAdapter {
    kind: FormatKind,
}

impl VorbisAdapter {
    /// Adapter for `FormatKind::OggVorbis` or `FormatKind::Flac`
    pub fn new(kind: FormatKind) -> Self {
        Self { kind }
    }

    fn read_comments(&self, path: &Path) -> Result<VorbisComments, FormatError> {
        match self.kind {
            FormatKind::Flac => {
                let flac = read_flac(path)?;
                Ok(flac.vorbis_comments().cloned().unwrap_or_default())
            }
            FormatKind::OggVorbis => {
                let mut file = open(path)?;
                let ogg = VorbisFile::read_from(&mut file, parse_options())
                    .map_err(|e| decode_error(path, e))?;
                Ok(ogg.vorbis_comments().clone())
            }
            other => Err(FormatError::Unsupported(other)),
        }
    }
}

fn parse_options() -> ParseOptions {
    ParseOptions::new().read_properties(false)
}

fn open(path: &Path) -> Result<File, FormatError> {
    File::open(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_error(path: &Path, e: LoftyError) -> FormatError {
    FormatError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn write_error(path: &Path, reason: impl ToString) -> FormatError {
    FormatError::Write {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read a FLAC file's metadata, pictures included
fn read_flac(path: &Path) -> Result<FlacFile, FormatError> {
    let mut file = open(path)?;
    FlacFile::read_from(&mut file, parse_options()).map_err(|e| decode_error(path, e))
}

/// Make the last FLAC metadata block a PADDING block
///
/// lofty can only rewrite the comment block of a stream whose metadata ends
/// in padding, so files without one get a padding block appended after
/// their last block first. Streams that do not start with the FLAC marker
/// are left for lofty to reject.
fn ensure_trailing_padding(path: &Path) -> Result<(), FormatError> {
    let mut data = fs::read(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if !data.starts_with(FLAC_MARKER) {
        return Ok(());
    }

    let mut offset = FLAC_MARKER.len();
    let (last, end) = loop {
        let Some(header) = data.get(offset..offset + 4) else {
            return Err(write_error(path, "truncated FLAC metadata"));
        };
        let size = usize::from(header[1]) << 16
            | usize::from(header[2]) << 8
            | usize::from(header[3]);
        let end = offset + 4 + size;
        if header[0] & FLAC_LAST_BLOCK != 0 {
            break (offset, end);
        }
        offset = end;
    };
    if data[last] & !FLAC_LAST_BLOCK == FLAC_PADDING {
        return Ok(());
    }
    if end > data.len() {
        return Err(write_error(path, "truncated FLAC metadata"));
    }

    data[last] &= !FLAC_LAST_BLOCK;
    let size = (FLAC_PADDING_SIZE as u32).to_be_bytes();
    let mut padding = vec![FLAC_LAST_BLOCK | FLAC_PADDING, size[1], size[2], size[3]];
    padding.resize(4 + FLAC_PADDING_SIZE, 0);
    data.splice(end..end, padding);

    log::debug!("Adding a PADDING block to {}", path.display());
    fs::write(path, data).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace every comment with `items`, keeping the vendor string
fn replace_items(comments: &mut VorbisComments, items: Vec<(String, String)>) {
    let existing: BTreeSet<String> = comments.items().map(|(k, _)| k.to_string()).collect();
    for key in &existing {
        comments.remove(key).for_each(drop);
    }
    for (key, value) in items {
        comments.push(key, value);
    }
}

/// Vorbis comment names are printable ASCII without `=`
fn valid_comment_name(key: &str) -> bool {
    key.bytes().all(|b| (0x20..=0x7D).contains(&b) && b != b'=')
}

impl FormatAdapter for VorbisAdapter {
    fn kind(&self) -> FormatKind {
        self.kind
    }

    fn read(&self, path: &Path) -> Result<TagRecord, FormatError> {
        ensure_exists(path)?;
        let comments = self.read_comments(path)?;

        // comment values are UTF-8 by definition and already decoded
        let mut fields: BTreeMap<String, Value> = BTreeMap::new();
        for (key, value) in comments.items() {
            merge_value(&mut fields, &key.to_lowercase(), value);
        }

        Ok(TagRecord::from_fields(self.kind, fields, Some(path))?)
    }

    fn write(&self, record: &mut TagRecord) -> Result<(), FormatError> {
        let path = record.path().to_path_buf();
        ensure_exists(&path)?;

        let mut items = Vec::new();
        for key in record.real_keys().filter(|k| self.can_change_key(k)) {
            if let Some(value) = record.get(key) {
                for segment in value.segments().filter(|s| !s.is_empty()) {
                    items.push((key.to_ascii_uppercase(), segment.to_string()));
                }
            }
        }

        match self.kind {
            FormatKind::Flac => {
                ensure_trailing_padding(&path)?;
                // Saved through the file so its pictures are written back too
                let mut flac = read_flac(&path)?;
                let mut comments = flac.vorbis_comments().cloned().unwrap_or_default();
                replace_items(&mut comments, items);
                flac.set_vorbis_comments(comments);
                flac.save_to_path(&path, WriteOptions::default())
                    .map_err(|e| write_error(&path, e))?;
            }
            FormatKind::OggVorbis => {
                let mut comments = self.read_comments(&path)?;
                replace_items(&mut comments, items);
                comments
                    .save_to_path(&path, WriteOptions::default())
                    .map_err(|e| write_error(&path, e))?;
            }
            other => return Err(FormatError::Unsupported(other)),
        }

        record.refresh_mtime();
        Ok(())
    }

    fn can_change(&self) -> Editable {
        Editable::Any
    }

    fn can_change_key(&self, key: &str) -> bool {
        !is_reserved(key) && valid_comment_name(key)
    }
}
