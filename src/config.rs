//! Library and playback configuration

use crate::playlist::ShuffleMode;
use std::path::PathBuf;

/// Default location of the library snapshot, before `~` expansion
pub const DEFAULT_LIBRARY_PATH: &str = "~/.local/share/songshelf/library.json";

/// Where the library lives and how it is played back
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Snapshot file loaded at startup and saved on exit
    pub library_path: PathBuf,

    /// Directories searched by a scan
    pub scan_roots: Vec<PathBuf>,

    pub shuffle: ShuffleMode,

    pub repeat: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self::new(expand(DEFAULT_LIBRARY_PATH))
    }
}

impl LibraryConfig {
    pub fn new(library_path: PathBuf) -> Self {
        Self {
            library_path,
            scan_roots: Vec::new(),
            shuffle: ShuffleMode::Off,
            repeat: false,
        }
    }

    /// Add directories to scan; `~` is expanded
    pub fn with_scan_roots<I, S>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scan_roots
            .extend(roots.into_iter().map(|root| expand(root.as_ref())));
        self
    }

    pub fn with_shuffle(mut self, shuffle: ShuffleMode) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }
}

/// Expand a leading `~` to the home directory
pub fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LibraryConfig::default();
        assert!(config.library_path.ends_with(".local/share/songshelf/library.json"));
        assert!(config.scan_roots.is_empty());
        assert_eq!(config.shuffle, ShuffleMode::Off);
        assert!(!config.repeat);
    }

    #[test]
    fn test_builder() {
        let config = LibraryConfig::new(PathBuf::from("/tmp/lib.json"))
            .with_scan_roots(["/music", "/more"])
            .with_shuffle(ShuffleMode::Weighted)
            .with_repeat(true);
        assert_eq!(
            config.scan_roots,
            vec![PathBuf::from("/music"), PathBuf::from("/more")]
        );
        assert_eq!(config.shuffle, ShuffleMode::Weighted);
        assert!(config.repeat);
    }
}
