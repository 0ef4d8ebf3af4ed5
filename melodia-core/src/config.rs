use crate::error::{CoreError, Result};
use crate::quality::QualityTier;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default address of a locally running music API server
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MelodiaConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the music API server
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for transient HTTP failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    2
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Tier tried first when resolving a stream
    #[serde(default)]
    pub preferred_quality: QualityTier,
    /// Initial volume in [0, 1]
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Delay before skipping past a track that failed mid-playback
    #[serde(default = "default_error_advance_delay_ms")]
    pub error_advance_delay_ms: u64,
    /// `prev()` restarts the current track once this much has played
    #[serde(default = "default_restart_threshold_secs")]
    pub restart_threshold_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

const fn default_volume() -> f32 {
    0.7
}

const fn default_error_advance_delay_ms() -> u64 {
    2000
}

const fn default_restart_threshold_secs() -> u64 {
    3
}

const fn default_history_limit() -> usize {
    200
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            preferred_quality: QualityTier::default(),
            volume: default_volume(),
            error_advance_delay_ms: default_error_advance_delay_ms(),
            restart_threshold_secs: default_restart_threshold_secs(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// TTL for categories without their own setting
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    #[serde(default = "default_lyrics_ttl_secs")]
    pub lyrics_ttl_secs: u64,
    #[serde(default = "default_ttl_secs")]
    pub playlist_ttl_secs: u64,
    #[serde(default = "default_comments_ttl_secs")]
    pub comments_ttl_secs: u64,
}

const fn default_max_entries() -> usize {
    100
}

const fn default_ttl_secs() -> u64 {
    600
}

const fn default_lyrics_ttl_secs() -> u64 {
    1800
}

const fn default_comments_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            default_ttl_secs: default_ttl_secs(),
            lyrics_ttl_secs: default_lyrics_ttl_secs(),
            playlist_ttl_secs: default_ttl_secs(),
            comments_ttl_secs: default_comments_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LyricsConfig {
    #[serde(default = "default_true")]
    pub show_translation: bool,
    /// Maximum distance between a lyric line and its translation
    #[serde(default = "default_translation_tolerance_ms")]
    pub translation_tolerance_ms: u64,
    #[serde(default = "default_scroll_duration_ms")]
    pub scroll_duration_ms: u64,
    #[serde(default = "default_scroll_frame_rate")]
    pub scroll_frame_rate: u32,
    /// Scroll distances below this jump instead of animating
    #[serde(default = "default_scroll_snap_distance")]
    pub scroll_snap_distance: f64,
}

const fn default_true() -> bool {
    true
}

const fn default_translation_tolerance_ms() -> u64 {
    1000
}

const fn default_scroll_duration_ms() -> u64 {
    500
}

const fn default_scroll_frame_rate() -> u32 {
    60
}

const fn default_scroll_snap_distance() -> f64 {
    5.0
}

impl LyricsConfig {
    #[must_use]
    pub const fn translation_tolerance(&self) -> Duration {
        Duration::from_millis(self.translation_tolerance_ms)
    }
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            show_translation: true,
            translation_tolerance_ms: default_translation_tolerance_ms(),
            scroll_duration_ms: default_scroll_duration_ms(),
            scroll_frame_rate: default_scroll_frame_rate(),
            scroll_snap_distance: default_scroll_snap_distance(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.config/melodia/melodia.log
    #[serde(default)]
    pub file_enabled: bool,
}

impl MelodiaConfig {
    /// Get the configuration directory path (~/.config/melodia/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/melodia/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after writing the template on first run, or an
    /// error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Same as [`Self::load_or_create`] for an explicit path.
    ///
    /// # Errors
    ///
    /// See [`Self::load_or_create`].
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate config content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot constrain.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "api.base_url".into(),
            });
        }
        if self.cache.max_entries == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "cache.max_entries must be at least 1".into(),
            });
        }
        if self.playback.history_limit == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "playback.history_limit must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.playback.volume) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "playback.volume must be between 0.0 and 1.0, got {}",
                    self.playback.volume
                ),
            });
        }
        Ok(())
    }

    /// Peek at `logging.file_enabled` without full validation, so logging can
    /// start before the config is loaded.
    #[must_use]
    pub fn file_logging_enabled(config_path: &Path) -> bool {
        fs::read_to_string(config_path)
            .ok()
            .and_then(|content| toml::from_str::<Self>(&content).ok())
            .is_some_and(|config| config.logging.file_enabled)
    }
}

/// Template written on first run
pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"# Melodia Configuration
# ~/.config/melodia/config.toml

[api]
# NeteaseCloudMusicApi-compatible server
base_url = ""#,
    DEFAULT_API_BASE_URL,
    r#""
timeout_secs = 10
max_retries = 2

[playback]
# Tier tried first; lower tiers are used when it is unavailable.
# jymaster, sky, jyeffect, hires, lossless, exhigh, higher, standard
preferred_quality = "exhigh"
volume = 0.7
# Skip a track that fails mid-playback after this delay
error_advance_delay_ms = 2000
# "Previous" restarts the current track after this many seconds
restart_threshold_secs = 3
history_limit = 200

[cache]
max_entries = 100
default_ttl_secs = 600
lyrics_ttl_secs = 1800
playlist_ttl_secs = 600
comments_ttl_secs = 300

[lyrics]
show_translation = true
translation_tolerance_ms = 1000
scroll_duration_ms = 500
scroll_frame_rate = 60
scroll_snap_distance = 5.0

[logging]
# Also write logs to ~/.config/melodia/melodia.log
file_enabled = false
"#
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = MelodiaConfig::from_toml(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.playback.preferred_quality, QualityTier::ExHigh);
        assert_eq!(config.playback.history_limit, 200);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.lyrics_ttl_secs, 1800);
        assert!(config.lyrics.show_translation);
        assert!(!config.logging.file_enabled);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = MelodiaConfig::from_toml("").unwrap();
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(
            config.lyrics.translation_tolerance(),
            Duration::from_secs(1)
        );
        assert!((config.playback.volume - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_section() {
        let config = MelodiaConfig::from_toml(
            "[playback]\npreferred_quality = \"lossless\"\n[cache]\nmax_entries = 5\n",
        )
        .unwrap();
        assert_eq!(config.playback.preferred_quality, QualityTier::Lossless);
        assert_eq!(config.playback.error_advance_delay_ms, 2000);
        assert_eq!(config.cache.max_entries, 5);
        assert_eq!(config.cache.comments_ttl_secs, 300);
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            MelodiaConfig::from_toml("[api]\nbase_url = \"  \"\n"),
            Err(CoreError::ConfigMissingField { .. })
        ));
        assert!(matches!(
            MelodiaConfig::from_toml("[cache]\nmax_entries = 0\n"),
            Err(CoreError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            MelodiaConfig::from_toml("[playback]\nvolume = 1.5\n"),
            Err(CoreError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            MelodiaConfig::from_toml("[playback]\nhistory_limit = 0\n"),
            Err(CoreError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_parse_error_and_unknown_quality() {
        assert!(matches!(
            MelodiaConfig::from_toml("[api"),
            Err(CoreError::ConfigParseError(_))
        ));
        assert!(MelodiaConfig::from_toml("[playback]\npreferred_quality = \"ultra\"\n").is_err());
    }

    #[test]
    fn test_first_run_writes_template() {
        let dir = std::env::temp_dir().join(format!("melodia-config-test-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs::remove_dir_all(&dir);

        let first = MelodiaConfig::load_or_create_at(&path);
        assert!(matches!(first, Err(CoreError::ConfigNotFound { .. })));
        assert!(path.exists());

        let second = MelodiaConfig::load_or_create_at(&path).unwrap();
        assert_eq!(second.cache.max_entries, 100);
        assert!(!MelodiaConfig::file_logging_enabled(&path));

        let _ = fs::remove_dir_all(&dir);
    }
}
