//! Bounded LRU + TTL cache for API responses.
//!
//! Recency is tracked over every stored entry, expired or not. Expiry is
//! checked lazily when an entry is read; there is no background sweep.

use crate::config::CacheConfig;
use lru::LruCache;
use serde_json::Value;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const LOG_TARGET: &str = "melodia::cache";

/// Category tag for cached data. Each category has its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Playlist,
    PlaylistTracks,
    Lyrics,
    LyricsNew,
    Comments,
    Artist,
    Album,
    SongDetail,
    HotArtists,
}

impl CacheKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Playlist => "playlist",
            Self::PlaylistTracks => "playlist_tracks",
            Self::Lyrics => "lyrics",
            Self::LyricsNew => "lyrics_new",
            Self::Comments => "comments",
            Self::Artist => "artist",
            Self::Album => "album",
            Self::SongDetail => "song_detail",
            Self::HotArtists => "hot_artists",
        }
    }

    /// Storage key for an id of this category
    pub fn key(self, id: impl fmt::Display) -> String {
        format!("{self}:{id}")
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored value with its insertion and expiry instants
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub data: V,
    pub inserted_at: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_valid_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Per-category TTLs
#[derive(Debug, Clone, Copy)]
struct KindTtls {
    default: Duration,
    playlist: Duration,
    lyrics: Duration,
    comments: Duration,
}

impl KindTtls {
    const fn for_kind(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Playlist | CacheKind::PlaylistTracks => self.playlist,
            CacheKind::Lyrics | CacheKind::LyricsNew => self.lyrics,
            CacheKind::Comments => self.comments,
            CacheKind::Artist | CacheKind::Album | CacheKind::SongDetail | CacheKind::HotArtists => {
                self.default
            }
        }
    }
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub valid: usize,
    pub expired: usize,
    pub max_size: usize,
}

/// LRU + TTL key/value store keyed by `(kind, id)`.
pub struct DataCache<V = Value> {
    entries: LruCache<String, CacheEntry<V>>,
    ttls: KindTtls,
}

/// Process-wide cache shared between async tasks
pub type SharedCache = Arc<Mutex<DataCache>>;

impl<V: Clone> DataCache<V> {
    /// Create a cache sized and timed from config
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            ttls: KindTtls {
                default: Duration::from_secs(config.default_ttl_secs),
                playlist: Duration::from_secs(config.playlist_ttl_secs),
                lyrics: Duration::from_secs(config.lyrics_ttl_secs),
                comments: Duration::from_secs(config.comments_ttl_secs),
            },
        }
    }

    /// Create a cache with one TTL for every category
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: LruCache::new(capacity),
            ttls: KindTtls {
                default: ttl,
                playlist: ttl,
                lyrics: ttl,
                comments: ttl,
            },
        }
    }

    /// Fetch a live entry, refreshing its recency. An expired entry is
    /// evicted and reported as absent.
    pub fn get(&mut self, kind: CacheKind, id: impl fmt::Display) -> Option<V> {
        let key = kind.key(id);
        let now = Instant::now();

        match self.entries.get(&key) {
            Some(entry) if entry.is_valid_at(now) => return Some(entry.data.clone()),
            Some(_) => {}
            None => return None,
        }

        debug!(target: LOG_TARGET, "Cache entry expired: {key}");
        self.entries.pop(&key);
        None
    }

    /// Store a value using the category's TTL
    pub fn set(&mut self, kind: CacheKind, id: impl fmt::Display, data: V) {
        let ttl = self.ttls.for_kind(kind);
        self.set_with_ttl(kind, id, data, ttl);
    }

    /// Store a value with an explicit TTL. Inserting a new key into a full
    /// cache evicts the least recently used entry.
    pub fn set_with_ttl(&mut self, kind: CacheKind, id: impl fmt::Display, data: V, ttl: Duration) {
        let key = kind.key(id);
        let now = Instant::now();
        let entry = CacheEntry {
            data,
            inserted_at: now,
            expires_at: now + ttl,
        };

        if let Some((evicted, _)) = self.entries.push(key.clone(), entry) {
            if evicted != key {
                debug!(target: LOG_TARGET, "Evicted least recently used entry: {evicted}");
            }
        }
    }

    /// Whether a live entry exists. Counts as an access.
    pub fn has(&mut self, kind: CacheKind, id: impl fmt::Display) -> bool {
        self.get(kind, id).is_some()
    }

    pub fn delete(&mut self, kind: CacheKind, id: impl fmt::Display) {
        self.entries.pop(&kind.key(id));
    }

    /// Remove every entry of one category
    pub fn clear_kind(&mut self, kind: CacheKind) {
        let prefix = format!("{kind}:");
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            self.entries.pop(key);
        }
        debug!(target: LOG_TARGET, "Cleared {} {kind} entries", keys.len());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet read
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let valid = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_valid_at(now))
            .count();
        CacheStats {
            total: self.entries.len(),
            valid,
            expired: self.entries.len() - valid,
            max_size: self.entries.cap().get(),
        }
    }
}

impl DataCache {
    /// Create a shared cache from config
    #[must_use]
    pub fn shared(config: &CacheConfig) -> SharedCache {
        Arc::new(Mutex::new(Self::new(config)))
    }
}
