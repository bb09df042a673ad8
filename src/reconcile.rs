use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::song::Song;

/// How an incoming export is combined with the catalog already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Throw the old catalog away.
    Replace,
    /// Add new songs, never drop or overwrite old ones.
    MergeKeepExisting,
    /// Make the catalog's id set match the export, keeping old values.
    MergeSync,
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeMode::Replace => write!(f, "replace"),
            MergeMode::MergeKeepExisting => write!(f, "merge_keep_existing"),
            MergeMode::MergeSync => write!(f, "merge_sync"),
        }
    }
}

impl std::str::FromStr for MergeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "replace" => Ok(MergeMode::Replace),
            "keep" | "merge_keep_existing" | "merge1" => Ok(MergeMode::MergeKeepExisting),
            "sync" | "merge_sync" | "merge2" => Ok(MergeMode::MergeSync),
            _ => Err(anyhow::anyhow!("Unknown merge mode: {}", s)),
        }
    }
}

/// Combine `existing` and `incoming` under `mode`.
///
/// For both merge modes, songs already in `existing` come first in their
/// original order, followed by the genuinely new songs in `incoming` order.
/// A song present on both sides always keeps the `existing` value.
pub fn reconcile(existing: &[Song], incoming: &[Song], mode: MergeMode) -> Vec<Song> {
    if mode == MergeMode::Replace {
        return incoming.to_vec();
    }

    let existing_ids: HashSet<&str> = existing.iter().map(Song::id).collect();

    let mut result: Vec<Song> = match mode {
        MergeMode::MergeSync => {
            let incoming_ids: HashSet<&str> = incoming.iter().map(Song::id).collect();
            existing
                .iter()
                .filter(|song| incoming_ids.contains(song.id()))
                .cloned()
                .collect()
        }
        _ => existing.to_vec(),
    };

    // Also collapses ids repeated inside `incoming` to their first occurrence
    let mut seen: HashSet<&str> = existing_ids;
    for song in incoming {
        if seen.insert(song.id()) {
            result.push(song.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::test_song;

    fn ids(songs: &[Song]) -> Vec<&str> {
        songs.iter().map(Song::id).collect()
    }

    fn fixtures() -> (Vec<Song>, Vec<Song>) {
        let existing = vec![
            test_song("a", "Old A", "Artist"),
            test_song("b", "Old B", "Artist"),
        ];
        let incoming = vec![
            test_song("b", "New B", "Artist"),
            test_song("c", "New C", "Artist"),
        ];
        (existing, incoming)
    }

    #[test]
    fn test_replace_returns_incoming_verbatim() {
        let (existing, incoming) = fixtures();
        assert_eq!(reconcile(&existing, &incoming, MergeMode::Replace), incoming);
        assert_eq!(reconcile(&[], &incoming, MergeMode::Replace), incoming);
        assert!(reconcile(&existing, &[], MergeMode::Replace).is_empty());
    }

    #[test]
    fn test_keep_existing_unions_and_preserves_old_values() {
        let (existing, incoming) = fixtures();
        let result = reconcile(&existing, &incoming, MergeMode::MergeKeepExisting);

        assert_eq!(ids(&result), vec!["a", "b", "c"]);
        assert_eq!(result[1].track_name, "Old B");
        assert_eq!(result[2].track_name, "New C");
    }

    #[test]
    fn test_keep_existing_with_empty_incoming_keeps_everything() {
        let (existing, _) = fixtures();
        let result = reconcile(&existing, &[], MergeMode::MergeKeepExisting);
        assert_eq!(result, existing);
    }

    #[test]
    fn test_sync_drops_songs_missing_from_incoming() {
        let (existing, incoming) = fixtures();
        let result = reconcile(&existing, &incoming, MergeMode::MergeSync);

        assert_eq!(ids(&result), vec!["b", "c"]);
        assert_eq!(result[0].track_name, "Old B");
    }

    #[test]
    fn test_sync_with_empty_incoming_empties_catalog() {
        let (existing, _) = fixtures();
        assert!(reconcile(&existing, &[], MergeMode::MergeSync).is_empty());
    }

    #[test]
    fn test_sync_id_set_equals_incoming() {
        let existing = vec![
            test_song("x", "X", "A"),
            test_song("y", "Y", "A"),
            test_song("z", "Z", "A"),
        ];
        let incoming = vec![
            test_song("z", "Z2", "A"),
            test_song("w", "W", "A"),
            test_song("x", "X2", "A"),
        ];
        let result = reconcile(&existing, &incoming, MergeMode::MergeSync);

        let mut got = ids(&result);
        got.sort();
        assert_eq!(got, vec!["w", "x", "z"]);
        // Retained songs come first in existing order
        assert_eq!(ids(&result), vec!["x", "z", "w"]);
        assert_eq!(result[0].track_name, "X");
    }

    #[test]
    fn test_duplicate_incoming_ids_collapse_in_merge_modes() {
        let existing = vec![test_song("a", "A", "X")];
        let incoming = vec![
            test_song("b", "First B", "X"),
            test_song("b", "Second B", "X"),
        ];

        for mode in [MergeMode::MergeKeepExisting, MergeMode::MergeSync] {
            let result = reconcile(&existing, &incoming, mode);
            let b: Vec<_> = result.iter().filter(|s| s.id() == "b").collect();
            assert_eq!(b.len(), 1, "mode {mode}");
            assert_eq!(b[0].track_name, "First B");
        }
    }

    #[test]
    fn test_merge_mode_parsing() {
        assert_eq!("replace".parse::<MergeMode>().unwrap(), MergeMode::Replace);
        assert_eq!("keep".parse::<MergeMode>().unwrap(), MergeMode::MergeKeepExisting);
        assert_eq!("merge-sync".parse::<MergeMode>().unwrap(), MergeMode::MergeSync);
        assert_eq!("MERGE1".parse::<MergeMode>().unwrap(), MergeMode::MergeKeepExisting);
        assert!("overwrite".parse::<MergeMode>().is_err());
    }
}
