use std::collections::HashSet;

use serde::Serialize;

use crate::history::HistoryEntry;
use crate::settings::{Settings, SettingsPatch};
use crate::song::{DisplaySong, Song};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unloaded,
    Loaded,
}

/// Everything the UI reads. Only [`SessionState::apply`] produces new states.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// The full catalog as last loaded or saved
    pub songs: Vec<Song>,
    /// Recommendation pool; always a subset of `songs`
    pub filtered_songs: Vec<Song>,
    pub current_recommendation: Vec<DisplaySong>,
    /// Oldest first
    pub history: Vec<HistoryEntry>,
    pub settings: Settings,
    pub is_data_loaded: bool,
}

#[derive(Debug, Clone)]
pub enum Action {
    /// Replace the catalog and reset the pool to all of it.
    LoadSongs(Vec<Song>),
    /// Drop every song; history stays.
    ClearSongs,
    /// Narrow the pool. Songs not in the catalog are ignored.
    SetFilteredSongs(Vec<Song>),
    SetRecommendation(Vec<DisplaySong>),
    AddToHistory(HistoryEntry),
    LoadHistory(Vec<HistoryEntry>),
    RemoveFromHistory(String),
    ClearHistory,
    LoadSettings(Settings),
    UpdateSettings(SettingsPatch),
}

impl SessionState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_data_loaded {
            SessionPhase::Loaded
        } else {
            SessionPhase::Unloaded
        }
    }

    pub fn apply(self, action: Action) -> Self {
        match action {
            Action::LoadSongs(songs) => Self {
                filtered_songs: songs.clone(),
                songs,
                is_data_loaded: true,
                ..self
            },
            Action::ClearSongs => Self {
                songs: Vec::new(),
                filtered_songs: Vec::new(),
                current_recommendation: Vec::new(),
                ..self
            },
            Action::SetFilteredSongs(selection) => {
                let filtered_songs = {
                    let known: HashSet<&str> = self.songs.iter().map(Song::id).collect();
                    selection
                        .into_iter()
                        .filter(|song| known.contains(song.id()))
                        .collect()
                };
                Self {
                    filtered_songs,
                    ..self
                }
            }
            Action::SetRecommendation(current_recommendation) => Self {
                current_recommendation,
                ..self
            },
            Action::AddToHistory(entry) => {
                let mut history = self.history;
                history.push(entry);
                Self { history, ..self }
            }
            Action::LoadHistory(mut history) => {
                history.sort_by(|a, b| a.recommended_at.cmp(&b.recommended_at));
                Self { history, ..self }
            }
            Action::RemoveFromHistory(id) => {
                let mut history = self.history;
                history.retain(|entry| entry.id != id);
                Self { history, ..self }
            }
            Action::ClearHistory => Self {
                history: Vec::new(),
                ..self
            },
            Action::LoadSettings(settings) => Self { settings, ..self },
            Action::UpdateSettings(patch) => Self {
                settings: self.settings.merged(patch),
                ..self
            },
        }
    }
}
