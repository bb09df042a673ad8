//! Search/sort views over the catalog and summary statistics.

use std::collections::HashSet;

use nucleo::{Config as NucleoConfig, Matcher, Utf32Str};
use serde::Serialize;

use crate::history::HistoryEntry;
use crate::settings::Settings;
use crate::song::Song;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    TrackName,
    ArtistName,
    AlbumName,
}

impl SortKey {
    fn field(self, song: &Song) -> &str {
        match self {
            SortKey::TrackName => &song.track_name,
            SortKey::ArtistName => &song.artist_name,
            SortKey::AlbumName => &song.album_name,
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(&['-', '_'][..], "").as_str() {
            "name" | "track" | "trackname" => Ok(SortKey::TrackName),
            "artist" | "artistname" => Ok(SortKey::ArtistName),
            "album" | "albumname" => Ok(SortKey::AlbumName),
            _ => Err(anyhow::anyhow!("Unknown sort key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// What the song list currently shows: a search term plus an ordering.
#[derive(Debug, Clone, Default)]
pub struct LibraryView {
    pub query: String,
    pub sort_by: SortKey,
    pub order: SortOrder,
}

impl LibraryView {
    pub fn new(query: impl Into<String>, sort_by: SortKey, order: SortOrder) -> Self {
        Self {
            query: query.into(),
            sort_by,
            order,
        }
    }

    /// Songs whose name, artist or album contains the query (ignoring
    /// case), sorted by the view's key. An empty query keeps every song.
    pub fn apply(&self, songs: &[Song]) -> Vec<Song> {
        let needle = self.query.trim().to_lowercase();

        let mut out: Vec<Song> = if needle.is_empty() {
            songs.to_vec()
        } else {
            let mut filter = SubstringFilter::new(&needle);
            songs
                .iter()
                .filter(|song| filter.matches_song(song))
                .cloned()
                .collect()
        };

        let key = self.sort_by;
        out.sort_by(|a, b| {
            let ordering = key
                .field(a)
                .to_lowercase()
                .cmp(&key.field(b).to_lowercase());
            match self.order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        out
    }
}

struct SubstringFilter {
    matcher: Matcher,
    needle: String,
}

impl SubstringFilter {
    fn new(lowercase_needle: &str) -> Self {
        let mut config = NucleoConfig::DEFAULT;
        config.ignore_case = true;
        // Folding accents only in the haystack would make "café" miss "Café"
        config.normalize = false;
        Self {
            matcher: Matcher::new(config),
            needle: lowercase_needle.to_string(),
        }
    }

    fn matches(&mut self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        let mut haystack_buf = Vec::new();
        let mut needle_buf = Vec::new();
        let haystack = Utf32Str::new(&lowered, &mut haystack_buf);
        let needle = Utf32Str::new(&self.needle, &mut needle_buf);
        self.matcher.substring_match(haystack, needle).is_some()
    }

    fn matches_song(&mut self, song: &Song) -> bool {
        self.matches(&song.track_name)
            || self.matches(&song.artist_name)
            || self.matches(&song.album_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub song_count: usize,
    pub candidate_count: usize,
    pub history_count: usize,
    /// Distinct artists among proposed songs
    pub proposed_artists: usize,
    /// History size relative to the catalog, rounded
    pub coverage_percent: u32,
    /// Candidates a recommendation could still propose
    pub remaining: usize,
}

pub fn stats(
    songs: &[Song],
    candidates: &[Song],
    history: &[HistoryEntry],
    settings: &Settings,
) -> LibraryStats {
    let proposed: HashSet<&str> = history.iter().map(|h| h.song.id.as_str()).collect();
    let proposed_artists = history
        .iter()
        .map(|h| h.song.artist_name.as_str())
        .collect::<HashSet<_>>()
        .len();

    let coverage_percent = if songs.is_empty() {
        0
    } else {
        ((history.len() as f64 / songs.len() as f64) * 100.0).round() as u32
    };

    let distinct_candidates: HashSet<&str> = candidates.iter().map(Song::id).collect();
    let remaining = if settings.prevent_duplicates {
        distinct_candidates
            .iter()
            .filter(|id| !proposed.contains(*id))
            .count()
    } else {
        distinct_candidates.len()
    };

    LibraryStats {
        song_count: songs.len(),
        candidate_count: candidates.len(),
        history_count: history.len(),
        proposed_artists,
        coverage_percent,
        remaining,
    }
}
