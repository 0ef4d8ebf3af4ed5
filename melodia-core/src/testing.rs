//! Test doubles shared by the unit tests.

use crate::api::MusicApi;
use crate::error::{CoreError, Result};
use crate::media::MediaElement;
use crate::track::{Artist, Track};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type Handler = dyn Fn(&str, &HashMap<String, String>) -> Result<Value> + Send + Sync;

/// Scripted API client. Records every call and can delay responses per id.
pub struct StubApi {
    handler: Box<Handler>,
    calls: Mutex<Vec<(String, HashMap<String, String>)>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl StubApi {
    pub fn new(
        handler: impl Fn(&str, &HashMap<String, String>) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
        }
    }

    /// Delay responses whose `id` parameter equals `id`
    pub fn delay_id(&self, id: impl ToString, delay: Duration) {
        self.delays.lock().unwrap().insert(id.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<(String, HashMap<String, String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Levels requested from the song URL endpoint, in order
    pub fn requested_levels(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(endpoint, _)| endpoint == crate::api::SONG_URL_ENDPOINT)
            .filter_map(|(_, params)| params.get("level").cloned())
            .collect()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.calls().iter().filter(|(e, _)| e == endpoint).count()
    }
}

#[async_trait]
impl MusicApi for StubApi {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let params: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.clone()));

        let delay = params
            .get("id")
            .and_then(|id| self.delays.lock().unwrap().get(id).copied());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        (self.handler)(endpoint, &params)
    }
}

pub fn song_url_body(url: Option<&str>) -> Value {
    json!({"code": 200, "data": [{"id": 1, "url": url}]})
}

pub fn server_error(endpoint: &str) -> CoreError {
    CoreError::ApiStatus {
        endpoint: endpoint.to_string(),
        status: 502,
    }
}

pub fn track(id: u64, title: &str, duration_ms: u64) -> Track {
    Track {
        id,
        title: title.to_string(),
        artists: vec![Artist {
            id: Some(id * 10),
            name: format!("Artist {id}"),
        }],
        album: "Album".to_string(),
        album_id: Some(1),
        cover_url: String::new(),
        duration_ms,
        mv_id: None,
    }
}

pub fn tracks(count: u64) -> Vec<Track> {
    (1..=count)
        .map(|id| track(id, &format!("Song {id}"), 180_000))
        .collect()
}

/// In-memory media element. Position only moves when a test sets it.
#[derive(Debug, Default)]
pub struct FakeMedia {
    pub source: Option<String>,
    pub paused: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
    pub fail_play: bool,
}

impl MediaElement for FakeMedia {
    fn set_source(&mut self, url: &str, duration_hint: Option<Duration>) {
        self.source = Some(url.to_string());
        self.position = Duration::ZERO;
        self.duration = duration_hint;
        self.paused = true;
    }

    fn clear_source(&mut self) {
        self.source = None;
        self.position = Duration::ZERO;
        self.duration = None;
        self.paused = true;
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn play(&mut self) -> Result<()> {
        if self.fail_play || self.source.is_none() {
            return Err(CoreError::MediaError {
                reason: "cannot play".to_string(),
            });
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn set_position(&mut self, position: Duration) {
        self.position = position;
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }
}
