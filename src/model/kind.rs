use std::fmt;

/// Container format a record was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormatKind {
    Mp3,
    OggVorbis,
    Flac,
}

impl FormatKind {
    pub const ALL: [FormatKind; 3] = [FormatKind::Mp3, FormatKind::OggVorbis, FormatKind::Flac];

    /// Stable name used in the library snapshot
    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Mp3 => "mp3",
            FormatKind::OggVorbis => "ogg",
            FormatKind::Flac => "flac",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// File extensions (lower-case, with dot) handled by this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FormatKind::Mp3 => &[".mp3"],
            FormatKind::OggVorbis => &[".ogg"],
            FormatKind::Flac => &[".flac"],
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
