//! Validation of library export files.
//!
//! An export is a JSON array of objects. Every object must carry the four
//! fields the recommender displays as strings; anything else is kept as-is.
//! Nothing here touches session state or storage: a payload is either fully
//! accepted or rejected with a message that points at the bad element.

use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::song::Song;

pub const REQUIRED_FIELDS: [&str; 4] = ["trackName", "artistName", "trackDuration", "trackUri"];

/// Parse and validate an export held in memory.
pub fn parse_songs(text: &str) -> Result<Vec<Song>> {
    let data: Value = serde_json::from_str(text)
        .map_err(|e| Error::Validation(format!("not valid JSON: {e}")))?;

    let items = match data {
        Value::Array(items) => items,
        _ => {
            return Err(Error::Validation(
                "the export must be a JSON array of songs".to_string(),
            ))
        }
    };

    let mut songs = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let Some(object) = item.as_object() else {
            return Err(Error::Validation(format!("element {index} is not an object")));
        };

        for field in REQUIRED_FIELDS {
            match object.get(field) {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(Error::Validation(format!(
                        "element {index}: field `{field}` must be a string"
                    )))
                }
                None => {
                    return Err(Error::Validation(format!(
                        "element {index}: missing required field `{field}` (required: {})",
                        REQUIRED_FIELDS.join(", ")
                    )))
                }
            }
        }

        let song: Song = serde_json::from_value(item)
            .map_err(|e| Error::Validation(format!("element {index}: {e}")))?;
        songs.push(song);
    }

    Ok(songs)
}

/// Read an export file from disk and validate it.
pub fn read_songs(path: &Path) -> anyhow::Result<Vec<Song>> {
    use anyhow::Context;

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_songs(&text)?)
}

/// Serialize songs back into the export format.
pub fn to_export_json(songs: &[Song]) -> Result<String> {
    serde_json::to_string_pretty(songs).map_err(|e| Error::Validation(e.to_string()))
}
