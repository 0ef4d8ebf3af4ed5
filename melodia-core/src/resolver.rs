use crate::api::MusicApi;
use crate::quality::QualityTier;
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "melodia::resolver";

/// A playable stream and the tier it was found at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStream {
    pub url: String,
    pub tier: QualityTier,
}

/// Finds a playable stream URL, downgrading quality until one is available.
///
/// Results are never cached: stream URLs are signed and short-lived.
pub struct StreamResolver {
    api: Arc<dyn MusicApi>,
    tiers: Vec<QualityTier>,
}

impl StreamResolver {
    /// Resolver over the full tier table
    pub fn new(api: Arc<dyn MusicApi>) -> Self {
        Self::with_tiers(api, QualityTier::ALL.to_vec())
    }

    /// Resolver over a custom tier list. The list is sorted highest first.
    pub fn with_tiers(api: Arc<dyn MusicApi>, mut tiers: Vec<QualityTier>) -> Self {
        tiers.sort_unstable();
        tiers.dedup();
        Self { api, tiers }
    }

    /// Tiers tried for `preferred`: the preferred tier (or the next lower one
    /// in the list when it is absent) and everything below it.
    #[must_use]
    pub fn chain_from(&self, preferred: QualityTier) -> &[QualityTier] {
        let start = self.tiers.partition_point(|&tier| tier < preferred);
        &self.tiers[start..]
    }

    /// Walk down from `preferred` and return the first tier with a URL.
    ///
    /// A failed request is logged and the next tier is tried. `None` means no
    /// tier produced a URL.
    pub async fn resolve(&self, track_id: u64, preferred: QualityTier) -> Option<ResolvedStream> {
        for &tier in self.chain_from(preferred) {
            match self.api.song_url(track_id, tier).await {
                Ok(Some(url)) => {
                    if tier == preferred {
                        debug!(target: LOG_TARGET, "Track {track_id} resolved at {tier}");
                    } else {
                        info!(
                            target: LOG_TARGET,
                            "Track {track_id} downgraded from {preferred} to {tier}"
                        );
                    }
                    return Some(ResolvedStream { url, tier });
                }
                Ok(None) => {
                    debug!(target: LOG_TARGET, "Track {track_id} unavailable at {tier}");
                }
                Err(e) => {
                    warn!(
                        target: LOG_TARGET,
                        "Quality {tier} failed for track {track_id}, trying next: {e}"
                    );
                }
            }
        }

        warn!(target: LOG_TARGET, "No playable source for track {track_id}");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SONG_URL_ENDPOINT;
    use crate::testing::{server_error, song_url_body, StubApi};

    fn stub_ok_at(levels: &'static [&'static str]) -> Arc<StubApi> {
        Arc::new(StubApi::new(move |_, params| {
            let level = params.get("level").map(String::as_str).unwrap_or_default();
            if levels.contains(&level) {
                Ok(song_url_body(Some(format!("http://cdn/{level}.mp3").as_str())))
            } else {
                Ok(song_url_body(None))
            }
        }))
    }

    #[tokio::test]
    async fn test_falls_back_in_order() {
        let api = stub_ok_at(&["standard"]);
        let resolver = StreamResolver::with_tiers(
            api.clone(),
            vec![QualityTier::Lossless, QualityTier::Higher, QualityTier::Standard],
        );

        let stream = resolver.resolve(1, QualityTier::Lossless).await.unwrap();
        assert_eq!(stream.tier, QualityTier::Standard);
        assert_eq!(stream.url, "http://cdn/standard.mp3");
        assert_eq!(api.requested_levels(), vec!["lossless", "higher", "standard"]);
    }

    #[tokio::test]
    async fn test_never_walks_upward() {
        let api = stub_ok_at(&["lossless"]);
        let resolver = StreamResolver::new(api.clone());

        assert!(resolver.resolve(1, QualityTier::ExHigh).await.is_none());
        assert_eq!(api.requested_levels(), vec!["exhigh", "higher", "standard"]);
    }

    #[tokio::test]
    async fn test_preferred_success_stops_immediately() {
        let api = stub_ok_at(&["exhigh", "standard"]);
        let resolver = StreamResolver::new(api.clone());

        let stream = resolver.resolve(9, QualityTier::ExHigh).await.unwrap();
        assert_eq!(stream.tier, QualityTier::ExHigh);
        assert_eq!(api.count(SONG_URL_ENDPOINT), 1);
    }

    #[tokio::test]
    async fn test_request_errors_continue_to_next_tier() {
        let api = Arc::new(StubApi::new(|endpoint, params| {
            match params.get("level").map(String::as_str) {
                Some("higher") => Ok(song_url_body(Some("http://cdn/higher.mp3"))),
                _ => Err(server_error(endpoint)),
            }
        }));
        let resolver = StreamResolver::new(api.clone());

        let stream = resolver.resolve(1, QualityTier::Lossless).await.unwrap();
        assert_eq!(stream.tier, QualityTier::Higher);
        assert_eq!(api.requested_levels(), vec!["lossless", "exhigh", "higher"]);
    }

    #[tokio::test]
    async fn test_every_tier_failing_is_none() {
        let api = Arc::new(StubApi::new(|endpoint, _| Err(server_error(endpoint))));
        let resolver = StreamResolver::new(api.clone());

        assert!(resolver.resolve(1, QualityTier::JyMaster).await.is_none());
        assert_eq!(api.count(SONG_URL_ENDPOINT), QualityTier::ALL.len());
    }

    #[tokio::test]
    async fn test_preferred_missing_from_list_starts_lower() {
        let api = stub_ok_at(&["higher"]);
        let resolver = StreamResolver::with_tiers(
            api.clone(),
            vec![QualityTier::Standard, QualityTier::Lossless, QualityTier::Higher],
        );

        assert_eq!(
            resolver.chain_from(QualityTier::ExHigh),
            &[QualityTier::Higher, QualityTier::Standard]
        );
        let stream = resolver.resolve(1, QualityTier::ExHigh).await.unwrap();
        assert_eq!(stream.tier, QualityTier::Higher);
        assert_eq!(api.requested_levels(), vec!["higher"]);
    }
}
