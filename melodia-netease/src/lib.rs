//! HTTP client for a NeteaseCloudMusicApi-compatible server.

use async_trait::async_trait;
use chrono::Utc;
use melodia_core::store::{StateStore, AUTH_TOKEN_KEY};
use melodia_core::{ApiConfig, CoreError, MusicApi};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::Value;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const LOG_TARGET: &str = "melodia::netease";

const CONNECT_TIMEOUT_SECS: u64 = 5;
const USER_AGENT: &str = concat!("Melodia/", env!("CARGO_PKG_VERSION"));

/// Music API client over HTTP GET with query parameters
pub struct NeteaseClient {
    client: ClientWithMiddleware,
    base_url: String,
    store: Option<Arc<dyn StateStore>>,
}

impl NeteaseClient {
    /// Create a client from the `[api]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ApiConfig) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            store: None,
        })
    }

    /// Forward the stored auth token as `cookie` on every request
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_cookie(&self) -> Option<String> {
        self.store
            .as_ref()?
            .get(AUTH_TOKEN_KEY)
            .filter(|cookie| !cookie.is_empty())
    }

    /// Caller params plus `cookie` (unless the caller set one) and a
    /// cache-busting `timestamp`.
    fn query_params<'a>(&self, params: &[(&'a str, String)], timestamp: i64) -> Vec<(&'a str, String)> {
        let mut query = params.to_vec();
        if !query.iter().any(|(key, _)| *key == "cookie") {
            if let Some(cookie) = self.auth_cookie() {
                query.push(("cookie", cookie));
            }
        }
        query.push(("timestamp", timestamp.to_string()));
        query
    }
}

/// `{base}{endpoint}?k=v&...` with percent-encoded keys and values
fn build_url(base_url: &str, endpoint: &str, params: &[(&str, String)]) -> String {
    let mut url = format!("{base_url}{endpoint}");
    for (i, (key, value)) in params.iter().enumerate() {
        let separator = if i == 0 { '?' } else { '&' };
        let _ = write!(
            url,
            "{separator}{}={}",
            urlencoding::encode(key),
            urlencoding::encode(value)
        );
    }
    url
}

#[async_trait]
impl MusicApi for NeteaseClient {
    fn name(&self) -> &'static str {
        "netease"
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, CoreError> {
        let query = self.query_params(params, Utc::now().timestamp_millis());
        let url = build_url(&self.base_url, endpoint, &query);

        debug!(
            target: LOG_TARGET,
            "GET {endpoint} ({} params)",
            query.len()
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: LOG_TARGET, "{endpoint} returned status: {status}");
            return Err(CoreError::ApiStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}
