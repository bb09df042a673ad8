//! encore: keep a karaoke catalog, propose random songs from it without
//! repeating yourself, and remember what was proposed.

pub mod config;
pub mod error;
pub mod history;
pub mod import;
pub mod library;
pub mod recommend;
pub mod reconcile;
pub mod session;
pub mod settings;
pub mod song;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use history::{HistoryEntry, HistorySort};
pub use library::{LibraryStats, LibraryView, SortKey, SortOrder};
pub use reconcile::MergeMode;
pub use session::{Controller, ImportOutcome, Recommendation, SessionPhase, SessionState};
pub use settings::{DisplayCount, InitialSource, Settings, SettingsPatch};
pub use song::{DisplaySong, Song};
pub use storage::{LocalStore, MemoryStore, Store};
