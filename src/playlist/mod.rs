//! Playback ordering
//!
//! [`PlaylistSequencer`] walks one list of items in order, shuffled or
//! rating-weighted. [`PlaylistMux`] merges a play queue and a playlist into
//! a single stream. Neither plays audio; they only decide what comes next.

mod mux;
mod sequencer;

pub use mux::{PlaylistMux, SongObserver};
pub use sequencer::PlaylistSequencer;

use crate::model::{keys, TagRecord};
use std::fmt;
use std::str::FromStr;

/// How `next` picks the following item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShuffleMode {
    /// Sequence order
    #[default]
    Off,
    /// Every item once per cycle, in random order
    Uniform,
    /// Independent draws favouring higher ratings
    Weighted,
}

impl ShuffleMode {
    pub fn name(&self) -> &'static str {
        match self {
            ShuffleMode::Off => "off",
            ShuffleMode::Uniform => "uniform",
            ShuffleMode::Weighted => "weighted",
        }
    }
}

impl fmt::Display for ShuffleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShuffleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(ShuffleMode::Off),
            "uniform" | "on" => Ok(ShuffleMode::Uniform),
            "weighted" => Ok(ShuffleMode::Weighted),
            other => Err(format!("unknown shuffle mode: {}", other)),
        }
    }
}

/// Anything a sequencer can order
///
/// Items are matched by equality. The rating only matters for weighted
/// shuffle; unrated items use 0.
pub trait PlaylistItem: Clone + PartialEq {
    fn rating(&self) -> f64 {
        0.0
    }
}

macro_rules! unrated_item {
    ($($t:ty),*) => {
        $(impl PlaylistItem for $t {})*
    };
}

unrated_item!(i32, i64, u32, u64, usize, String);

impl PlaylistItem for TagRecord {
    fn rating(&self) -> f64 {
        self.get_or(keys::RATING, "0").trim().parse().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FormatKind;

    #[test]
    fn test_shuffle_mode_parse() {
        assert_eq!("off".parse::<ShuffleMode>(), Ok(ShuffleMode::Off));
        assert_eq!("Uniform".parse::<ShuffleMode>(), Ok(ShuffleMode::Uniform));
        assert_eq!("weighted".parse::<ShuffleMode>(), Ok(ShuffleMode::Weighted));
        assert!("sideways".parse::<ShuffleMode>().is_err());
        assert_eq!(ShuffleMode::Weighted.to_string(), "weighted");
    }

    #[test]
    fn test_record_rating() {
        let mut record = TagRecord::new(FormatKind::Mp3, "/nonexistent/a.mp3");
        assert_eq!(record.rating(), 0.0);
        record.set_rating(0.75);
        assert_eq!(record.rating(), 0.75);
        assert_eq!(7u32.rating(), 0.0);
    }
}
