//! Random song picks without repeats.
//!
//! A [`Batch`] holds the songs still eligible for one recommendation request
//! and hands them out one draw at a time, so the caller can record each pick
//! (and persist it) before asking for the next one.

use std::collections::HashSet;

use rand::Rng;

use crate::history::HistoryEntry;
use crate::settings::Settings;
use crate::song::{DisplaySong, Song};

pub struct Batch<'a> {
    remaining: Vec<&'a Song>,
    target: usize,
    drawn: usize,
}

impl<'a> Batch<'a> {
    /// Build the eligible set for one request.
    ///
    /// With `prevent_duplicates` on, every song whose id shows up anywhere in
    /// `history` is left out. A song listed twice in `pool` counts once.
    pub fn new(pool: &'a [Song], history: &[HistoryEntry], settings: &Settings) -> Self {
        let proposed: HashSet<&str> = if settings.prevent_duplicates {
            history.iter().map(|entry| entry.song.id.as_str()).collect()
        } else {
            HashSet::new()
        };

        let mut seen = HashSet::new();
        let mut remaining = Vec::new();
        for song in pool {
            if !proposed.contains(song.id()) && seen.insert(song.id()) {
                remaining.push(song);
            }
        }

        let target = settings.display_count.get().min(remaining.len());
        Self {
            remaining,
            target,
            drawn: 0,
        }
    }

    /// Nothing can be proposed under the current settings.
    pub fn is_exhausted(&self) -> bool {
        self.target == 0
    }

    /// How many picks this batch will hand out in total.
    pub fn target(&self) -> usize {
        self.target
    }

    /// Uniform pick among the songs not yet drawn in this batch.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<DisplaySong> {
        if self.drawn >= self.target || self.remaining.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.remaining.len());
        let song = self.remaining.swap_remove(index);
        self.drawn += 1;
        Some(DisplaySong::from(song))
    }
}

/// Draw a whole batch at once. Empty means the pool is exhausted.
pub fn recommend<R: Rng + ?Sized>(
    pool: &[Song],
    history: &[HistoryEntry],
    settings: &Settings,
    rng: &mut R,
) -> Vec<DisplaySong> {
    let mut batch = Batch::new(pool, history, settings);
    let mut picks = Vec::with_capacity(batch.target());
    while let Some(song) = batch.draw(rng) {
        picks.push(song);
    }
    picks
}
