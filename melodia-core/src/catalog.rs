use crate::api::{ensure_ok, MusicApi, PLAYLIST_TRACKS_ENDPOINT, SONG_DETAIL_ENDPOINT};
use crate::cache::{CacheKind, SharedCache};
use crate::error::Result;
use crate::track::{tracks_from_value, Track};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const LOG_TARGET: &str = "melodia::catalog";

/// Page size used when listing playlist tracks
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Cache-backed lookups for playlists and song details.
pub struct Catalog {
    api: Arc<dyn MusicApi>,
    cache: SharedCache,
}

impl Catalog {
    pub fn new(api: Arc<dyn MusicApi>, cache: SharedCache) -> Self {
        Self { api, cache }
    }

    /// Tracks of a playlist, first page of [`DEFAULT_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service reports a failure code.
    pub async fn playlist_tracks(&self, playlist_id: u64) -> Result<Vec<Track>> {
        self.playlist_page(playlist_id, DEFAULT_PAGE_SIZE, 0).await
    }

    /// One page of a playlist's tracks.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service reports a failure code.
    pub async fn playlist_page(
        &self,
        playlist_id: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Track>> {
        let body = self
            .cached(
                CacheKind::PlaylistTracks,
                &format!("{playlist_id}_{limit}_{offset}"),
                PLAYLIST_TRACKS_ENDPOINT,
                &[
                    ("id", playlist_id.to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                ],
            )
            .await?;
        Ok(body.get("songs").map(tracks_from_value).unwrap_or_default())
    }

    /// Details for a set of song ids, in the service's order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service reports a failure code.
    pub async fn song_details(&self, ids: &[u64]) -> Result<Vec<Track>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let body = self
            .cached(
                CacheKind::SongDetail,
                &joined,
                SONG_DETAIL_ENDPOINT,
                &[("ids", joined.clone())],
            )
            .await?;
        Ok(body.get("songs").map(tracks_from_value).unwrap_or_default())
    }

    async fn cached(
        &self,
        kind: CacheKind,
        id: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value> {
        let cached = self.cache.lock().await.get(kind, id);
        if let Some(body) = cached {
            debug!(target: LOG_TARGET, "Cache hit: {}", kind.key(id));
            return Ok(body);
        }

        let body = self.api.request(endpoint, params).await?;
        ensure_ok(endpoint, &body)?;
        self.cache.lock().await.set(kind, id, body.clone());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DataCache;
    use crate::config::CacheConfig;
    use crate::error::CoreError;
    use crate::testing::StubApi;
    use serde_json::json;

    fn catalog(api: &Arc<StubApi>) -> Catalog {
        Catalog::new(api.clone(), DataCache::shared(&CacheConfig::default()))
    }

    #[tokio::test]
    async fn test_playlist_tracks_cached_per_page() {
        let api = Arc::new(StubApi::new(|_, params| {
            assert_eq!(params.get("id").map(String::as_str), Some("77"));
            Ok(json!({
                "code": 200,
                "songs": [
                    {"id": 1, "name": "A", "ar": [{"id": 1, "name": "X"}], "dt": 1000},
                    {"id": 2, "name": "B", "ar": [{"id": 2, "name": "Y"}], "dt": 2000}
                ]
            }))
        }));
        let catalog = catalog(&api);

        let tracks = catalog.playlist_tracks(77).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].artist_display(), "Y");

        catalog.playlist_tracks(77).await.unwrap();
        assert_eq!(api.count(PLAYLIST_TRACKS_ENDPOINT), 1);

        catalog.playlist_page(77, 10, 10).await.unwrap();
        assert_eq!(api.count(PLAYLIST_TRACKS_ENDPOINT), 2);
    }

    #[tokio::test]
    async fn test_song_details() {
        let api = Arc::new(StubApi::new(|_, params| {
            assert_eq!(params.get("ids").map(String::as_str), Some("5,6"));
            Ok(json!({"code": 200, "songs": [{"id": 5, "name": "Five"}, {"id": 6, "name": "Six"}]}))
        }));
        let catalog = catalog(&api);

        let tracks = catalog.song_details(&[5, 6]).await.unwrap();
        assert_eq!(tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![5, 6]);
        assert!(catalog.song_details(&[]).await.unwrap().is_empty());
        assert_eq!(api.count(SONG_DETAIL_ENDPOINT), 1);
    }

    #[tokio::test]
    async fn test_failure_code_not_cached() {
        let api = Arc::new(StubApi::new(|_, _| Ok(json!({"code": 401}))));
        let catalog = catalog(&api);

        assert!(matches!(
            catalog.playlist_tracks(1).await,
            Err(CoreError::ApiCode { code: 401, .. })
        ));
        assert!(catalog.playlist_tracks(1).await.is_err());
        assert_eq!(api.count(PLAYLIST_TRACKS_ENDPOINT), 2);
    }
}
