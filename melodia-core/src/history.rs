//! Play history persisted as a JSON array, newest first.

use crate::error::Result;
use crate::store::{StateStore, PLAY_HISTORY_KEY};
use crate::track::Track;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const LOG_TARGET: &str = "melodia::history";

/// Titles the UI shows before anything has played. Never recorded.
const PLACEHOLDER_TITLES: &[&str] = &["未播放", "夜空中最亮的星"];

/// A recorded play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub track: Track,
    /// Unix time in milliseconds
    pub played_at: i64,
}

/// Whether a track carries enough identity to be worth recording
#[must_use]
pub fn is_recordable(track: &Track) -> bool {
    track.id != 0
        && !track.title.trim().is_empty()
        && track.artists.iter().any(|a| !a.name.trim().is_empty())
        && !PLACEHOLDER_TITLES.contains(&track.title.as_str())
}

pub struct PlayHistory {
    store: Arc<dyn StateStore>,
    limit: usize,
}

impl PlayHistory {
    pub fn new(store: Arc<dyn StateStore>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }

    /// Record a play now. See [`Self::record_at`].
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be persisted.
    pub fn record(&self, track: &Track) -> Result<bool> {
        self.record_at(track, chrono::Utc::now().timestamp_millis())
    }

    /// Move `track` to the front of the history, dropping older entries past
    /// the limit. Returns `false` when the track is not recordable.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be persisted.
    pub fn record_at(&self, track: &Track, played_at: i64) -> Result<bool> {
        if !is_recordable(track) {
            debug!(target: LOG_TARGET, "Skipping history for placeholder or incomplete track {}", track.id);
            return Ok(false);
        }

        let mut entries = self.load();
        entries.retain(|entry| entry.track.id != track.id);
        entries.insert(
            0,
            HistoryEntry {
                track: track.clone(),
                played_at,
            },
        );
        entries.truncate(self.limit);

        self.save(&entries)?;
        Ok(true)
    }

    /// Stored entries, newest first. Invalid records are skipped.
    #[must_use]
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.load()
    }

    /// # Errors
    ///
    /// Returns an error if the history cannot be persisted.
    pub fn remove(&self, track_id: u64) -> Result<bool> {
        let mut entries = self.load();
        let before = entries.len();
        entries.retain(|entry| entry.track.id != track_id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns an error if the store rejects the removal.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(PLAY_HISTORY_KEY)
    }

    fn load(&self) -> Vec<HistoryEntry> {
        let Some(raw) = self.store.get(PLAY_HISTORY_KEY) else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<HistoryEntry>(item).ok())
                .filter(|entry| is_recordable(&entry.track))
                .collect(),
            Err(e) => {
                warn!(target: LOG_TARGET, "Discarding unreadable play history: {e}");
                Vec::new()
            }
        }
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set(PLAY_HISTORY_KEY, raw)
    }
}
