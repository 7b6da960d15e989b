//! Aggregated view over several records, for editing them together

use super::{FormatKind, TagRecord, Value};
use crate::formats::{Editable, FormatRegistry};
use std::collections::{BTreeMap, BTreeSet};

/// How one field looks across a group of records
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSummary {
    /// Every record has the field with the same value
    Shared { value: Value, total: usize },
    /// Records that have the field agree, but some lack it
    SharedPartial {
        value: Value,
        have: usize,
        missing: usize,
        total: usize,
    },
    /// Every record has the field, with differing values
    Unshared { value: Value, total: usize },
    /// Values differ and some records lack the field
    UnsharedPartial {
        value: Value,
        have: usize,
        missing: usize,
        total: usize,
    },
}

impl FieldSummary {
    fn classify(value: Value, have: usize, total: usize, shared: bool) -> Self {
        let missing = total - have;
        match (shared, missing == 0) {
            (true, true) => FieldSummary::Shared { value, total },
            (true, false) => FieldSummary::SharedPartial {
                value,
                have,
                missing,
                total,
            },
            (false, true) => FieldSummary::Unshared { value, total },
            (false, false) => FieldSummary::UnsharedPartial {
                value,
                have,
                missing,
                total,
            },
        }
    }

    /// First value seen for the field
    pub fn value(&self) -> &Value {
        match self {
            FieldSummary::Shared { value, .. }
            | FieldSummary::SharedPartial { value, .. }
            | FieldSummary::Unshared { value, .. }
            | FieldSummary::UnsharedPartial { value, .. } => value,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(
            self,
            FieldSummary::Shared { .. } | FieldSummary::SharedPartial { .. }
        )
    }

    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            FieldSummary::Shared { .. } | FieldSummary::Unshared { .. }
        )
    }

    pub fn total(&self) -> usize {
        match self {
            FieldSummary::Shared { total, .. }
            | FieldSummary::SharedPartial { total, .. }
            | FieldSummary::Unshared { total, .. }
            | FieldSummary::UnsharedPartial { total, .. } => *total,
        }
    }

    pub fn missing(&self) -> usize {
        match self {
            FieldSummary::SharedPartial { missing, .. }
            | FieldSummary::UnsharedPartial { missing, .. } => *missing,
            _ => 0,
        }
    }

    pub fn have(&self) -> usize {
        self.total() - self.missing()
    }

    /// Parenthetical note describing how the field is spread
    pub fn paren(&self) -> String {
        match self {
            FieldSummary::Shared { total, .. } => format!("(shared across all {} songs)", total),
            FieldSummary::SharedPartial { missing, .. } => {
                format!("(missing from {} songs)", missing)
            }
            FieldSummary::Unshared { total, .. } => {
                format!("(different across {} songs)", total)
            }
            FieldSummary::UnsharedPartial { have, missing, .. } => format!(
                "(different across {} songs, missing from {} songs)",
                have, missing
            ),
        }
    }

    /// Text for an edit field: the value, the value plus a note, or only the note
    pub fn display(&self) -> String {
        match self {
            FieldSummary::Shared { value, .. } => value.to_string(),
            FieldSummary::SharedPartial { value, .. } => format!("{} {}", value, self.paren()),
            _ => self.paren(),
        }
    }
}

/// Per-field summary of a selection of records
#[derive(Debug, Clone, Default)]
pub struct GroupSummary {
    fields: BTreeMap<String, FieldSummary>,
    kinds: BTreeSet<FormatKind>,
    count: usize,
}

impl GroupSummary {
    pub fn build<'a>(records: impl IntoIterator<Item = &'a TagRecord>) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut first: BTreeMap<&str, &Value> = BTreeMap::new();
        let mut same: BTreeMap<&str, bool> = BTreeMap::new();
        let mut kinds = BTreeSet::new();
        let mut total = 0;

        for record in records {
            total += 1;
            kinds.insert(record.kind());
            for (key, value) in record.fields() {
                *counts.entry(key).or_insert(0) += 1;
                let seen = *first.entry(key).or_insert(value);
                let all = same.entry(key).or_insert(true);
                *all = *all && seen == value;
            }
        }

        let fields = counts
            .into_iter()
            .map(|(key, have)| {
                let summary = FieldSummary::classify(
                    first[key].clone(),
                    have,
                    total,
                    same.get(key).copied().unwrap_or(true),
                );
                (key.to_string(), summary)
            })
            .collect();

        Self {
            fields,
            kinds,
            count: total,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldSummary> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSummary)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of records summarized
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Distinct formats present in the group
    pub fn kinds(&self) -> &BTreeSet<FormatKind> {
        &self.kinds
    }

    /// Keys every record in the group can have edited
    pub fn can_change(&self, registry: &FormatRegistry) -> Editable {
        self.kinds
            .iter()
            .map(|kind| registry.editable(*kind))
            .fold(Editable::Any, Editable::intersect)
    }

    /// Whether `key` is editable for every record in the group
    pub fn can_change_key(&self, registry: &FormatRegistry, key: &str) -> bool {
        self.kinds
            .iter()
            .all(|kind| registry.can_change_key(*kind, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn record(kind: FormatKind, path: &str, tags: &[(&str, &str)]) -> TagRecord {
        let fields = tags
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect();
        TagRecord::from_fields(kind, fields, Some(Path::new(path))).unwrap()
    }

    fn sample() -> Vec<TagRecord> {
        vec![
            record(
                FormatKind::Mp3,
                "/nonexistent/a/1.mp3",
                &[("album", "X"), ("artist", "A"), ("genre", "Rock")],
            ),
            record(
                FormatKind::Mp3,
                "/nonexistent/a/2.mp3",
                &[("album", "X"), ("artist", "B"), ("genre", "Rock")],
            ),
            record(
                FormatKind::OggVorbis,
                "/nonexistent/a/3.ogg",
                &[("album", "X"), ("artist", "A"), ("mood", "calm")],
            ),
        ]
    }

    #[test]
    fn test_classification() {
        let records = sample();
        let group = GroupSummary::build(&records);
        assert_eq!(group.len(), 3);

        let album = group.get("album").unwrap();
        assert!(album.is_shared() && album.is_complete());
        assert_eq!(album.display(), "X");

        let artist = group.get("artist").unwrap();
        assert!(!artist.is_shared() && artist.is_complete());
        assert_eq!(artist.paren(), "(different across 3 songs)");

        let genre = group.get("genre").unwrap();
        assert!(genre.is_shared() && !genre.is_complete());
        assert_eq!((genre.have(), genre.missing(), genre.total()), (2, 1, 3));
        assert_eq!(genre.display(), "Rock (missing from 1 songs)");

        let mood = group.get("mood").unwrap();
        assert_eq!(mood.have(), 1);
        assert!(mood.is_shared());
    }

    #[test]
    fn test_unshared_partial() {
        let records = vec![
            record(FormatKind::Mp3, "/nonexistent/1.mp3", &[("genre", "Rock")]),
            record(FormatKind::Mp3, "/nonexistent/2.mp3", &[("genre", "Jazz")]),
            record(FormatKind::Mp3, "/nonexistent/3.mp3", &[]),
        ];
        let group = GroupSummary::build(&records);
        let genre = group.get("genre").unwrap();
        assert!(matches!(
            genre,
            FieldSummary::UnsharedPartial {
                have: 2,
                missing: 1,
                total: 3,
                ..
            }
        ));
        assert_eq!(
            genre.display(),
            "(different across 2 songs, missing from 1 songs)"
        );
    }

    #[test]
    fn test_placeholder_is_shared() {
        let records = vec![
            record(FormatKind::Mp3, "/nonexistent/1.mp3", &[]),
            record(FormatKind::Mp3, "/nonexistent/2.mp3", &[]),
        ];
        let group = GroupSummary::build(&records);
        let title = group.get("title").unwrap();
        assert!(title.is_shared());
        assert!(title.value().is_unknown());
    }

    #[test]
    fn test_kinds() {
        let records = sample();
        let group = GroupSummary::build(&records);
        assert_eq!(group.kinds().len(), 2);
        assert!(GroupSummary::build(&[]).is_empty());
    }

    #[cfg(all(feature = "mp3", feature = "vorbis"))]
    #[test]
    fn test_can_change_intersects_formats() {
        let registry = FormatRegistry::with_available();
        let records = sample();
        let group = GroupSummary::build(&records);

        assert!(group.can_change_key(&registry, "title"));
        assert!(!group.can_change_key(&registry, "mood"));
        assert!(!group.can_change_key(&registry, "~#playcount"));

        match group.can_change(&registry) {
            Editable::Keys(keys) => {
                assert!(keys.contains("title"));
                assert!(!keys.contains("mood"));
            }
            Editable::Any => panic!("mp3 limits the editable keys"),
        }

        let vorbis_only = vec![record(FormatKind::Flac, "/nonexistent/1.flac", &[])];
        let group = GroupSummary::build(&vorbis_only);
        assert_eq!(group.can_change(&registry), Editable::Any);
        assert!(group.can_change_key(&registry, "mood"));
        assert!(!group.can_change_key(&registry, "vendor"));
    }
}
