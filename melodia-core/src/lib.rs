pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod loader;
pub mod lyrics;
pub mod media;
pub mod paths;
pub mod playlist;
pub mod quality;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod time;
pub mod track;

#[cfg(test)]
mod testing;

pub use api::{LyricResponse, MusicApi, SongUrlResponse};
pub use cache::{CacheKind, CacheStats, DataCache, SharedCache};
pub use catalog::Catalog;
pub use config::{
    ApiConfig, CacheConfig, LoggingConfig, LyricsConfig, MelodiaConfig, PlaybackConfig,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use engine::{
    NoticeKind, PlaybackState, PlayerEngine, PlayerEvent, PlayerServices, PlayerSettings,
    PlayerStatus, RepeatMode,
};
pub use error::CoreError;
pub use history::{HistoryEntry, PlayHistory};
pub use loader::LyricsLoader;
pub use lyrics::{LyricCue, Lyrics, TranslationCue, WordCue};
pub use media::MediaElement;
pub use paths::{config_dir, config_path, log_file_path, state_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use playlist::Playlist;
pub use quality::QualityTier;
pub use resolver::{ResolvedStream, StreamResolver};
pub use store::{JsonFileStore, MemoryStore, StateStore};
pub use sync::{CueState, LineChange, LyricSync, ScrollAnimator, SyncUpdate, WordState};
pub use time::DurationExt;
pub use track::{Artist, Track};
