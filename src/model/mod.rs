//! Song metadata model
//!
//! One [`TagRecord`] per audio file, independent of the tag format it came
//! from, plus the [`GroupSummary`] used when editing several at once.

mod group;
pub mod keys;
mod kind;
mod record;
mod value;

pub use group::{FieldSummary, GroupSummary};
pub use kind::FormatKind;
pub use record::TagRecord;
pub use value::{Value, UNKNOWN_TEXT};
