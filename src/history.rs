use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::song::DisplaySong;

/// One proposed song. Written once when the song is picked, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub song: DisplaySong,
    pub recommended_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Ids are random so entries created in the same clock tick never share
    /// a storage key.
    pub fn new(song: DisplaySong) -> Self {
        Self::at(song, Utc::now())
    }

    pub fn at(song: DisplaySong, recommended_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            song,
            recommended_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistorySort {
    #[default]
    Newest,
    Oldest,
    TrackName,
    ArtistName,
}

impl std::str::FromStr for HistorySort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(&['-', '_'][..], "").as_str() {
            "newest" => Ok(HistorySort::Newest),
            "oldest" => Ok(HistorySort::Oldest),
            "trackname" | "name" | "track" => Ok(HistorySort::TrackName),
            "artistname" | "artist" => Ok(HistorySort::ArtistName),
            _ => Err(anyhow::anyhow!("Unknown history sort: {}", s)),
        }
    }
}

/// A sorted copy of `entries`. Ties keep their stored order.
pub fn sorted(entries: &[HistoryEntry], sort: HistorySort) -> Vec<HistoryEntry> {
    let mut out = entries.to_vec();
    match sort {
        HistorySort::Newest => out.sort_by(|a, b| b.recommended_at.cmp(&a.recommended_at)),
        HistorySort::Oldest => out.sort_by(|a, b| a.recommended_at.cmp(&b.recommended_at)),
        HistorySort::TrackName => out.sort_by(|a, b| {
            a.song.track_name.to_lowercase().cmp(&b.song.track_name.to_lowercase())
        }),
        HistorySort::ArtistName => out.sort_by(|a, b| {
            a.song.artist_name.to_lowercase().cmp(&b.song.artist_name.to_lowercase())
        }),
    }
    out
}
