//! Songshelf - music metadata library and playback sequencer
//!
//! Reads tags from MP3, Ogg Vorbis and FLAC files into a uniform record
//! model, keeps them in a persisted library, and orders playback with
//! shuffle, repeat and a priority queue.

pub mod config;
pub mod error;
pub mod formats;
pub mod library;
pub mod model;
pub mod playlist;

pub use config::LibraryConfig;
pub use error::{FormatError, LibraryError, RecordError};
pub use formats::{FormatAdapter, FormatRegistry};
pub use library::LibraryStore;
pub use model::{FormatKind, GroupSummary, TagRecord, Value};
pub use playlist::{PlaylistMux, PlaylistSequencer, ShuffleMode};
