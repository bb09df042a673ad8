pub mod policy;
pub mod state;

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::history::{self, HistoryEntry, HistorySort};
use crate::import;
use crate::library::{self, LibraryStats, LibraryView};
use crate::recommend::Batch;
use crate::reconcile::{reconcile, MergeMode};
use crate::settings::{Settings, SettingsPatch};
use crate::song::{DisplaySong, Song};
use crate::storage::{Collection, LocalStore, Store};

use policy::{settle, Mutation};
pub use state::{Action, SessionPhase, SessionState};

/// Result of [`Controller::import_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Store was empty; the import became the catalog.
    Imported { count: usize },
    Merged { mode: MergeMode, count: usize },
    /// A catalog already exists and no merge mode was chosen. Nothing changed.
    NeedsDecision { existing: u64, incoming: usize },
}

/// Result of [`Controller::request_recommendation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "songs", rename_all = "snake_case")]
pub enum Recommendation {
    Proposed(Vec<DisplaySong>),
    /// Every candidate has already been proposed.
    Exhausted,
}

/// Owns the session state and mirrors each change to the store.
///
/// State changes go through [`SessionState::apply`] first. The store write
/// follows, and its failure is handled per [`policy::policy`].
pub struct Controller {
    store: Store,
    state: SessionState,
    rng: StdRng,
}

impl Controller {
    pub fn new(store: Store, defaults: Settings) -> Self {
        Self {
            store,
            state: SessionState::new(defaults),
            rng: StdRng::from_entropy(),
        }
    }

    /// Open the configured store and load whatever it holds. Falls back to a
    /// memory-only session when the store can't be opened.
    pub async fn open(config: &Config) -> Self {
        let store = open_store(config);
        tracing::debug!("using {} store", store.backend_name());

        let mut controller = Self::new(store, Settings::from(&config.defaults));
        controller.load_from_store().await;
        controller
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn dispatch(&mut self, action: Action) {
        self.state = std::mem::take(&mut self.state).apply(action);
    }

    pub fn load_from_import(&mut self, songs: Vec<Song>) {
        self.dispatch(Action::LoadSongs(songs));
    }

    /// Settings, then songs, then history. Empty results leave the session
    /// as it is.
    pub async fn load_from_store(&mut self) {
        match self.store.load_settings().await {
            Some(settings) => self.dispatch(Action::LoadSettings(settings)),
            None => {
                let result = self.store.save_settings(&self.state.settings).await;
                let _ = settle(Mutation::SaveSettings, result);
            }
        }

        let songs: Vec<Song> = self.store.get_all().await;
        if !songs.is_empty() {
            tracing::info!("loaded {} songs", songs.len());
            self.dispatch(Action::LoadSongs(songs));
        }

        let history: Vec<HistoryEntry> = self.store.get_all().await;
        if !history.is_empty() {
            self.dispatch(Action::LoadHistory(history));
        }
    }

    /// Persist `songs` as the whole catalog. Session state follows even when
    /// the write fails; the error is returned.
    pub async fn save_catalog(&mut self, songs: Vec<Song>) -> Result<()> {
        let result = self.store.put_all(&songs).await;
        self.dispatch(Action::LoadSongs(songs));
        settle(Mutation::SaveCatalog, result)
    }

    pub async fn merge_catalog(&mut self, incoming: Vec<Song>, mode: MergeMode) -> Result<()> {
        if mode == MergeMode::Replace {
            return self.save_catalog(incoming).await;
        }

        // Merging against an unreadable catalog would drop every stored song
        let existing: Vec<Song> = self.store.try_get_all().await.map_err(|e| {
            tracing::error!("{} aborted, stored catalog unreadable: {}", mode, e);
            e
        })?;
        let merged = reconcile(&existing, &incoming, mode);
        tracing::info!("{}: {} incoming -> {} songs", mode, incoming.len(), merged.len());

        if let Err(e) = self.store.put_all(&merged).await {
            self.dispatch(Action::LoadSongs(merged));
            return settle(Mutation::MergeCatalog, Err(e));
        }

        match self.store.try_get_all::<Song>().await {
            Ok(reloaded) => self.dispatch(Action::LoadSongs(reloaded)),
            Err(e) => {
                tracing::warn!("reload after {} failed, using merged catalog: {}", mode, e);
                self.dispatch(Action::LoadSongs(merged));
            }
        }
        Ok(())
    }

    /// Validate and load an import payload. See [`Controller::import_songs`].
    pub async fn import_json(
        &mut self,
        text: &str,
        mode: Option<MergeMode>,
    ) -> Result<ImportOutcome> {
        let incoming = import::parse_songs(text)?;
        self.import_songs(incoming, mode).await
    }

    /// Save `incoming` as the catalog when the store has none. Otherwise
    /// merge with `mode`, or without one touch nothing and ask the caller
    /// to choose.
    pub async fn import_songs(
        &mut self,
        incoming: Vec<Song>,
        mode: Option<MergeMode>,
    ) -> Result<ImportOutcome> {
        let existing = self.store.try_count(Collection::Songs).await?;

        if existing == 0 {
            self.save_catalog(incoming).await?;
            return Ok(ImportOutcome::Imported {
                count: self.state.songs.len(),
            });
        }

        match mode {
            None => Ok(ImportOutcome::NeedsDecision {
                existing,
                incoming: incoming.len(),
            }),
            Some(mode) => {
                self.merge_catalog(incoming, mode).await?;
                Ok(ImportOutcome::Merged {
                    mode,
                    count: self.state.songs.len(),
                })
            }
        }
    }

    /// Restrict the recommendation pool to the songs whose ids are in
    /// `selection`, or to `view` over the catalog when `selection` is empty.
    pub fn narrow_candidates(&mut self, selection: &[String], view: &LibraryView) {
        let pool = if selection.is_empty() {
            view.apply(&self.state.songs)
        } else {
            self.state
                .songs
                .iter()
                .filter(|song| selection.iter().any(|id| id == song.id()))
                .cloned()
                .collect()
        };
        self.dispatch(Action::SetFilteredSongs(pool));
    }

    /// Draw a batch from the current pool. Each pick is written to history
    /// before the next one is drawn.
    pub async fn request_recommendation(&mut self) -> Recommendation {
        let pool = self.state.filtered_songs.clone();
        let mut batch = Batch::new(&pool, &self.state.history, &self.state.settings);

        if batch.is_exhausted() {
            tracing::info!("no candidates left to recommend");
            self.dispatch(Action::SetRecommendation(Vec::new()));
            return Recommendation::Exhausted;
        }

        let mut picks = Vec::with_capacity(batch.target());
        while let Some(song) = batch.draw(&mut self.rng) {
            self.add_history(song.clone()).await;
            picks.push(song);
        }

        self.dispatch(Action::SetRecommendation(picks.clone()));
        Recommendation::Proposed(picks)
    }

    pub async fn add_history(&mut self, song: DisplaySong) -> HistoryEntry {
        let entry = HistoryEntry::new(song);
        self.dispatch(Action::AddToHistory(entry.clone()));
        let result = self.store.put_one(&entry).await;
        let _ = settle(Mutation::AddHistory, result);
        entry
    }

    pub async fn remove_history(&mut self, id: &str) {
        self.dispatch(Action::RemoveFromHistory(id.to_string()));
        let result = self.store.delete_one(Collection::History, id).await;
        let _ = settle(Mutation::RemoveHistory, result);
    }

    pub async fn clear_history(&mut self) {
        self.dispatch(Action::ClearHistory);
        let result = self.store.clear(Collection::History).await;
        let _ = settle(Mutation::ClearHistory, result);
    }

    pub async fn update_settings(&mut self, patch: SettingsPatch) -> Settings {
        self.dispatch(Action::UpdateSettings(patch));
        let result = self.store.save_settings(&self.state.settings).await;
        let _ = settle(Mutation::SaveSettings, result);
        self.state.settings
    }

    /// Drop every song from the store and the session. History is kept.
    pub async fn clear_catalog(&mut self) -> Result<()> {
        let result = self.store.clear(Collection::Songs).await;
        self.dispatch(Action::ClearSongs);
        settle(Mutation::ClearCatalog, result)
    }

    /// The catalog in import format.
    pub fn export_catalog(&self) -> Result<String> {
        import::to_export_json(&self.state.songs)
    }

    pub fn history_sorted(&self, sort: HistorySort) -> Vec<HistoryEntry> {
        history::sorted(&self.state.history, sort)
    }

    pub fn stats(&self) -> LibraryStats {
        library::stats(
            &self.state.songs,
            &self.state.filtered_songs,
            &self.state.history,
            &self.state.settings,
        )
    }
}

fn open_store(config: &Config) -> Store {
    if config.storage.memory_only {
        return Store::memory();
    }

    let path = match &config.storage.db_path {
        Some(path) => PathBuf::from(path),
        None => match LocalStore::default_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("no data directory, running memory-only: {:#}", e);
                return Store::memory();
            }
        },
    };

    match LocalStore::open(&path) {
        Ok(local) => Store::new(Box::new(local)),
        Err(e) => {
            tracing::warn!("{}; running memory-only, nothing will be saved", e);
            Store::memory()
        }
    }
}
