//! Well-known field names
//!
//! Computed keys start with `~` and never round-trip through a file's tags.
//! Numeric computed keys use the `~#` prefix.

/// Marks a key as derived from file or library state
pub const COMPUTED_PREFIX: char = '~';

pub const PATH: &str = "~filename";
pub const BASENAME: &str = "~basename";
pub const DIRNAME: &str = "~dirname";
pub const MTIME: &str = "~#mtime";
pub const LAST_PLAYED: &str = "~#lastplayed";
pub const PLAY_COUNT: &str = "~#playcount";
pub const DISC: &str = "~#disc";
pub const TRACK: &str = "~#track";
pub const RATING: &str = "~#rating";

pub const TITLE: &str = "title";
pub const ARTIST: &str = "artist";
pub const ALBUM: &str = "album";
pub const VERSION: &str = "version";
pub const TRACK_NUMBER: &str = "tracknumber";
pub const DISC_NUMBER: &str = "discnumber";
pub const PART: &str = "part";
pub const PERFORMER: &str = "performer";

/// Vorbis encoder string, stripped from records
pub const VENDOR: &str = "vendor";

/// Path key used by old snapshots
pub const LEGACY_PATH: &str = "filename";

/// Fields that always carry a value, real or placeholder
pub const REQUIRED: [&str; 3] = [TITLE, ARTIST, ALBUM];

pub fn is_computed(key: &str) -> bool {
    key.starts_with(COMPUTED_PREFIX)
}
