use crate::error::{CoreError, Result};
use crate::quality::QualityTier;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub const SONG_URL_ENDPOINT: &str = "/song/url/v1";
pub const LYRIC_NEW_ENDPOINT: &str = "/lyric/new";
pub const LYRIC_ENDPOINT: &str = "/lyric";
pub const PLAYLIST_TRACKS_ENDPOINT: &str = "/playlist/track/all";
pub const SONG_DETAIL_ENDPOINT: &str = "/song/detail";

/// `code` value for a successful response
pub const CODE_OK: i64 = 200;

/// Network boundary to the music service.
///
/// Implementations return the decoded JSON body. Missing or empty fields in a
/// successful body mean "unavailable", not an error.
#[async_trait]
pub trait MusicApi: Send + Sync {
    /// Client name for logging
    fn name(&self) -> &'static str;

    /// Issue a GET request to `endpoint` with query parameters.
    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value>;

    /// Ask for a playable URL for one track at one tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body has an unexpected shape.
    async fn song_url(&self, track_id: u64, tier: QualityTier) -> Result<Option<String>> {
        let body = self
            .request(
                SONG_URL_ENDPOINT,
                &[("id", track_id.to_string()), ("level", tier.as_str().to_string())],
            )
            .await?;
        let response: SongUrlResponse = serde_json::from_value(body)?;
        Ok(response.playable_url())
    }

    /// Fetch a lyric payload from `/lyric/new` or `/lyric`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body has an unexpected shape.
    async fn lyric(&self, endpoint: &str, track_id: u64) -> Result<LyricResponse> {
        let body = self
            .request(endpoint, &[("id", track_id.to_string())])
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Body of `/song/url/v1`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongUrlResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub data: Option<Vec<SongUrlData>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongUrlData {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub br: Option<u64>,
}

impl SongUrlResponse {
    /// First non-empty URL in the body
    #[must_use]
    pub fn playable_url(&self) -> Option<String> {
        self.data
            .as_ref()?
            .first()?
            .url
            .as_ref()
            .filter(|url| !url.trim().is_empty())
            .cloned()
    }
}

/// Body of `/lyric/new` and `/lyric`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LyricResponse {
    #[serde(default)]
    pub code: Option<i64>,
    /// Line-level lyrics
    #[serde(default)]
    pub lrc: Option<LyricBody>,
    /// Translation
    #[serde(default)]
    pub tlyric: Option<LyricBody>,
    /// Word-level lyrics
    #[serde(default)]
    pub yrc: Option<LyricBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LyricBody {
    #[serde(default)]
    pub lyric: Option<String>,
}

fn body_text(body: Option<&LyricBody>) -> Option<&str> {
    body?
        .lyric
        .as_deref()
        .filter(|text| !text.trim().is_empty())
}

impl LyricResponse {
    #[must_use]
    pub fn lrc_text(&self) -> Option<&str> {
        body_text(self.lrc.as_ref())
    }

    #[must_use]
    pub fn translation_text(&self) -> Option<&str> {
        body_text(self.tlyric.as_ref())
    }

    #[must_use]
    pub fn word_text(&self) -> Option<&str> {
        body_text(self.yrc.as_ref())
    }
}

/// Reject a body whose `code` is present and not 200.
///
/// # Errors
///
/// Returns `ApiCode` when the service reports a failure code.
pub fn ensure_ok(endpoint: &str, body: &Value) -> Result<()> {
    match body.get("code").and_then(Value::as_i64) {
        Some(code) if code != CODE_OK => Err(CoreError::ApiCode {
            endpoint: endpoint.to_string(),
            code,
        }),
        _ => Ok(()),
    }
}
