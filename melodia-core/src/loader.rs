use crate::api::{LyricResponse, MusicApi, LYRIC_ENDPOINT, LYRIC_NEW_ENDPOINT};
use crate::cache::{CacheKind, SharedCache};
use crate::error::Result;
use crate::lyrics::{parse_line_lyrics, parse_translation_lyrics, parse_word_lyrics, Lyrics};
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "melodia::lyrics";

/// Fetches and parses lyrics for a track, going through the response cache.
pub struct LyricsLoader {
    api: Arc<dyn MusicApi>,
    cache: SharedCache,
}

impl LyricsLoader {
    pub fn new(api: Arc<dyn MusicApi>, cache: SharedCache) -> Self {
        Self { api, cache }
    }

    /// Load lyrics for `track_id`. Failures of any kind produce empty lyrics.
    pub async fn load(&self, track_id: u64) -> Lyrics {
        let lyrics = self.load_parts(track_id).await;
        if lyrics.is_empty() {
            info!(target: LOG_TARGET, "No lyrics for track {track_id}");
        } else {
            debug!(
                target: LOG_TARGET,
                "Loaded {} lines ({} word-timed, {} translated) for track {track_id}",
                lyrics.lines.len(),
                lyrics.word_lines.len(),
                lyrics.translations.len()
            );
        }
        lyrics
    }

    /// Word timing and translation come from `/lyric/new` only; `/lyric` is
    /// consulted for the line lyrics when `/lyric/new` has none.
    async fn load_parts(&self, track_id: u64) -> Lyrics {
        let primary = match self
            .fetch(CacheKind::LyricsNew, LYRIC_NEW_ENDPOINT, track_id)
            .await
        {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(target: LOG_TARGET, "{LYRIC_NEW_ENDPOINT} failed for track {track_id}: {e}");
                None
            }
        };

        let legacy = if primary.as_ref().and_then(LyricResponse::lrc_text).is_some() {
            None
        } else {
            debug!(target: LOG_TARGET, "No lrc in {LYRIC_NEW_ENDPOINT}, falling back to {LYRIC_ENDPOINT}");
            match self.fetch(CacheKind::Lyrics, LYRIC_ENDPOINT, track_id).await {
                Ok(response) => Some(response),
                Err(e) => {
                    warn!(target: LOG_TARGET, "{LYRIC_ENDPOINT} failed for track {track_id}: {e}");
                    None
                }
            }
        };

        let lrc = primary
            .as_ref()
            .and_then(LyricResponse::lrc_text)
            .or_else(|| legacy.as_ref().and_then(LyricResponse::lrc_text));

        Lyrics {
            lines: lrc.map(parse_line_lyrics).unwrap_or_default(),
            word_lines: primary
                .as_ref()
                .and_then(LyricResponse::word_text)
                .map(parse_word_lyrics)
                .unwrap_or_default(),
            translations: primary
                .as_ref()
                .and_then(LyricResponse::translation_text)
                .map(parse_translation_lyrics)
                .unwrap_or_default(),
        }
    }

    /// Cached fetch of one lyric endpoint. The lock is not held across the
    /// request.
    async fn fetch(&self, kind: CacheKind, endpoint: &str, track_id: u64) -> Result<LyricResponse> {
        let cached = self.cache.lock().await.get(kind, track_id);
        if let Some(value) = cached {
            debug!(target: LOG_TARGET, "Cache hit: {}", kind.key(track_id));
            return Ok(serde_json::from_value(value)?);
        }

        let value = self
            .api
            .request(endpoint, &[("id", track_id.to_string())])
            .await?;
        let response: LyricResponse = serde_json::from_value(value.clone())?;
        self.cache.lock().await.set(kind, track_id, value);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DataCache;
    use crate::config::CacheConfig;
    use crate::testing::{server_error, StubApi};
    use serde_json::json;
    use std::time::Duration;

    fn loader(api: &Arc<StubApi>) -> (LyricsLoader, SharedCache) {
        let cache = DataCache::shared(&CacheConfig::default());
        (LyricsLoader::new(api.clone(), cache.clone()), cache)
    }

    #[tokio::test]
    async fn test_loads_all_three_formats() {
        let api = Arc::new(StubApi::new(|endpoint, _| {
            assert_eq!(endpoint, LYRIC_NEW_ENDPOINT);
            Ok(json!({
                "code": 200,
                "lrc": {"lyric": "[00:01.00]Hello\n[00:03.00]World"},
                "yrc": {"lyric": "[1000,2000](1000,1000,0)Hel(2000,1000,0)lo"},
                "tlyric": {"lyric": "[00:01.00]你好"}
            }))
        }));
        let (loader, _) = loader(&api);

        let lyrics = loader.load(1).await;
        assert_eq!(lyrics.lines.len(), 2);
        assert_eq!(lyrics.word_lines.len(), 1);
        assert_eq!(lyrics.translations[0].start_time, Duration::from_secs(1));
        assert_eq!(lyrics.display_cues()[0].text, "Hello");
    }

    #[tokio::test]
    async fn test_second_load_hits_cache() {
        let api = Arc::new(StubApi::new(|_, _| {
            Ok(json!({"lrc": {"lyric": "[00:01.00]Cached"}}))
        }));
        let (loader, cache) = loader(&api);

        loader.load(7).await;
        let lyrics = loader.load(7).await;
        assert_eq!(lyrics.lines[0].text, "Cached");
        assert_eq!(api.count(LYRIC_NEW_ENDPOINT), 1);
        assert!(cache.lock().await.has(CacheKind::LyricsNew, 7));
    }

    #[tokio::test]
    async fn test_falls_back_to_legacy_endpoint() {
        let api = Arc::new(StubApi::new(|endpoint, _| {
            if endpoint == LYRIC_NEW_ENDPOINT {
                Ok(json!({"code": 200, "lrc": {"lyric": ""}}))
            } else {
                Ok(json!({"code": 200, "lrc": {"lyric": "[00:02.00]Legacy"}}))
            }
        }));
        let (loader, cache) = loader(&api);

        let lyrics = loader.load(3).await;
        assert_eq!(lyrics.lines[0].text, "Legacy");
        assert_eq!(api.count(LYRIC_ENDPOINT), 1);
        assert!(cache.lock().await.has(CacheKind::Lyrics, 3));
    }

    #[tokio::test]
    async fn test_new_endpoint_error_falls_back() {
        let api = Arc::new(StubApi::new(|endpoint, _| {
            if endpoint == LYRIC_NEW_ENDPOINT {
                Err(server_error(endpoint))
            } else {
                Ok(json!({"lrc": {"lyric": "[00:02.00]Legacy"}}))
            }
        }));
        let (loader, _) = loader(&api);

        assert_eq!(loader.load(3).await.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_yield_empty_lyrics() {
        let api = Arc::new(StubApi::new(|endpoint, _| Err(server_error(endpoint))));
        let (failing, _) = loader(&api);
        assert!(failing.load(1).await.is_empty());

        let api = Arc::new(StubApi::new(|_, _| Ok(json!({"lrc": "not an object"}))));
        let (malformed, _) = loader(&api);
        assert!(malformed.load(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_fallback_keeps_word_timing_and_translation() {
        let api = Arc::new(StubApi::new(|endpoint, _| {
            if endpoint == LYRIC_NEW_ENDPOINT {
                Ok(json!({
                    "code": 200,
                    "yrc": {"lyric": "[1000,2000](1000,500,0)Hel(1500,500,0)lo"},
                    "tlyric": {"lyric": "[00:01.00]你好"}
                }))
            } else {
                Ok(json!({
                    "code": 200,
                    "lrc": {"lyric": "[00:01.00]Hello"},
                    "tlyric": {"lyric": "[00:01.00]ignored"}
                }))
            }
        }));
        let (loader, _) = loader(&api);

        let lyrics = loader.load(1).await;
        assert_eq!(lyrics.lines.len(), 1);
        assert_eq!(lyrics.lines[0].text, "Hello");
        assert_eq!(lyrics.word_lines.len(), 1);
        assert_eq!(lyrics.word_lines[0].text, "Hello");
        assert_eq!(lyrics.translations.len(), 1);
        assert_eq!(lyrics.translations[0].text, "你好");
        assert_eq!(api.count(LYRIC_ENDPOINT), 1);
    }

    #[tokio::test]
    async fn test_legacy_failure_keeps_word_timing() {
        let api = Arc::new(StubApi::new(|endpoint, _| {
            if endpoint == LYRIC_NEW_ENDPOINT {
                Ok(json!({
                    "code": 200,
                    "yrc": {"lyric": "[1000,2000](1000,500,0)Hel(1500,500,0)lo"}
                }))
            } else {
                Err(server_error(endpoint))
            }
        }));
        let (loader, _) = loader(&api);

        let lyrics = loader.load(1).await;
        assert!(lyrics.lines.is_empty());
        assert_eq!(lyrics.word_lines.len(), 1);
        assert!(!lyrics.is_empty());
    }
}
