use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A song from an imported library export.
///
/// Only the fields the recommender reads are typed; everything else the
/// provider exported (popularity, audio features, URLs...) rides along in
/// `extra` and is written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Unique identifier. Every set operation keys off this.
    pub track_uri: String,
    pub track_name: String,
    pub artist_name: String,
    /// Local files export `null` here; read as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub album_name: String,
    /// Pre-formatted duration, e.g. "3:45"
    pub track_duration: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Song {
    pub fn id(&self) -> &str {
        &self.track_uri
    }
}

/// The slice of a [`Song`] shown in recommendations and stored in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySong {
    /// Same value as the source song's `track_uri`
    pub id: String,
    pub track_name: String,
    pub artist_name: String,
    pub track_duration: String,
    pub album_name: String,
}

impl From<&Song> for DisplaySong {
    fn from(song: &Song) -> Self {
        DisplaySong {
            id: song.track_uri.clone(),
            track_name: song.track_name.clone(),
            artist_name: song.artist_name.clone(),
            track_duration: song.track_duration.clone(),
            album_name: song.album_name.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_song(uri: &str, name: &str, artist: &str) -> Song {
    Song {
        track_uri: uri.to_string(),
        track_name: name.to_string(),
        artist_name: artist.to_string(),
        album_name: "Test Album".to_string(),
        track_duration: "3:30".to_string(),
        extra: Map::new(),
    }
}
