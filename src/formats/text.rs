//! Tag text cleanup shared by the adapters

use crate::model::Value;
use encoding_rs::{Encoding, BIG5, SHIFT_JIS, UTF_8};
use std::collections::BTreeMap;

/// Encodings tried, in order, on the raw bytes of a Latin-1 frame
fn fallback_encodings() -> [&'static Encoding; 3] {
    [UTF_8, SHIFT_JIS, BIG5]
}

/// Decode bytes with the first encoding that accepts them without errors
pub fn decode_bytes(bytes: &[u8]) -> Option<String> {
    fallback_encodings().iter().find_map(|encoding| {
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
    })
}

/// Bytes of text decoded as Latin-1, if every char fits in one byte
fn latin1_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

/// C1 control characters never occur in real Latin-1 text
fn has_c1_controls(text: &str) -> bool {
    text.chars().any(|c| ('\u{80}'..='\u{9f}').contains(&c))
}

/// Recover the text of a frame declared as Latin-1
///
/// Tag writers often store UTF-8 or Shift-JIS bytes under a Latin-1 label.
/// Valid UTF-8 bytes are always re-read as UTF-8. Text holding C1 control
/// characters is run through [`decode_bytes`] and dropped (`None`) when no
/// encoding accepts it. Anything else is genuine Latin-1 and kept as is.
pub fn repair_latin1(text: &str) -> Option<String> {
    if text.is_ascii() {
        return Some(text.to_string());
    }
    let Some(bytes) = latin1_bytes(text) else {
        return Some(text.to_string());
    };
    if let Ok(utf8) = std::str::from_utf8(&bytes) {
        return Some(utf8.to_string());
    }
    if has_c1_controls(text) {
        decode_bytes(&bytes)
    } else {
        Some(text.to_string())
    }
}

/// Merge another value for `key` into a field map
///
/// A value already contained in the current one is dropped, a value that
/// contains the current one replaces it, anything else becomes a new segment.
pub fn merge_value(fields: &mut BTreeMap<String, Value>, key: &str, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let merged = match fields.get(key) {
        Some(Value::Known(current)) if current.contains(text) => return,
        Some(Value::Known(current)) if text.contains(current.as_str()) => text.to_string(),
        Some(Value::Known(current)) => format!("{}\n{}", current, text),
        _ => text.to_string(),
    };
    fields.insert(key.to_string(), Value::Known(merged));
}
