//! Playback state machine.
//!
//! The engine owns the media element and the play queue. Every state change
//! is published as a [`PlayerEvent`] on a broadcast channel; presentation
//! layers subscribe and never reach into the engine's state directly.
//!
//! Track loads are tagged with a generation number. Starting a new load bumps
//! the generation, and any stream resolution, lyric fetch or delayed
//! error-advance that completes under an older generation is discarded.

use crate::api::MusicApi;
use crate::cache::SharedCache;
use crate::config::{LyricsConfig, MelodiaConfig};
use crate::history::PlayHistory;
use crate::loader::LyricsLoader;
use crate::lyrics::Lyrics;
use crate::media::MediaElement;
use crate::playlist::Playlist;
use crate::quality::QualityTier;
use crate::resolver::StreamResolver;
use crate::store::StateStore;
use crate::sync::{LyricSync, WordState};
use crate::track::Track;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "melodia::engine";

/// Queue repeat policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    /// `Off -> All -> One -> Off`
    #[must_use]
    pub const fn cycle(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::One,
            Self::One => Self::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerStatus {
    /// No track loaded
    #[default]
    Idle,
    /// Stream resolution in flight
    Loading,
    Playing,
    Paused,
    /// The queue ran out; nothing plays until a manual action
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Events emitted by the player engine
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// The queue was replaced or extended
    PlaylistChanged {
        len: usize,
        current: Option<usize>,
    },
    /// Stream resolution started
    TrackLoading {
        index: usize,
        track: Track,
    },
    /// A stream is playing
    TrackStarted {
        index: usize,
        track: Track,
        tier: QualityTier,
    },
    Paused {
        position: Duration,
    },
    Resumed {
        position: Duration,
    },
    /// The queue finished without repeat
    Ended,
    Seeked {
        position: Duration,
    },
    /// Media clock tick
    TimeUpdate {
        position: Duration,
        duration: Option<Duration>,
    },
    VolumeChanged {
        volume: f32,
        muted: bool,
    },
    ShuffleChanged(bool),
    RepeatChanged(RepeatMode),
    QualityChanged(QualityTier),
    LyricsLoaded {
        track_id: u64,
        lines: usize,
        word_timed: bool,
        translated: bool,
    },
    LyricsNotFound {
        track_id: u64,
    },
    /// The active lyric line changed
    LineChanged {
        index: Option<usize>,
        text: Option<String>,
        translation: Option<String>,
    },
    /// Word highlight inside the active line changed
    WordsChanged {
        index: usize,
        states: Vec<WordState>,
    },
    TranslationToggled(bool),
    /// User-facing message
    Notification {
        kind: NoticeKind,
        message: String,
    },
}

/// Snapshot of the player for display
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub status: PlayerStatus,
    pub current_index: Option<usize>,
    pub track: Option<Track>,
    pub is_playing: bool,
    pub is_shuffled: bool,
    pub repeat: RepeatMode,
    /// Stored volume in [0, 1], kept while muted
    pub volume: f32,
    pub muted: bool,
    pub preferred_quality: QualityTier,
    /// Tier of the playing stream
    pub current_tier: Option<QualityTier>,
    pub position: Duration,
    pub duration: Option<Duration>,
}

/// Tunables taken from config
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub preferred_quality: QualityTier,
    pub volume: f32,
    pub restart_threshold: Duration,
    pub error_advance_delay: Duration,
    pub lyrics: LyricsConfig,
}

impl PlayerSettings {
    #[must_use]
    pub fn from_config(config: &MelodiaConfig) -> Self {
        Self {
            preferred_quality: config.playback.preferred_quality,
            volume: config.playback.volume.clamp(0.0, 1.0),
            restart_threshold: Duration::from_secs(config.playback.restart_threshold_secs),
            error_advance_delay: Duration::from_millis(config.playback.error_advance_delay_ms),
            lyrics: config.lyrics.clone(),
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self::from_config(&MelodiaConfig::default())
    }
}

/// Collaborators the engine calls out to
pub struct PlayerServices {
    pub resolver: StreamResolver,
    pub lyrics: LyricsLoader,
    pub history: PlayHistory,
}

impl PlayerServices {
    /// Wire the default services around one API client, cache and store
    pub fn new(
        api: Arc<dyn MusicApi>,
        cache: SharedCache,
        store: Arc<dyn StateStore>,
        history_limit: usize,
    ) -> Self {
        Self {
            resolver: StreamResolver::new(Arc::clone(&api)),
            lyrics: LyricsLoader::new(api, cache),
            history: PlayHistory::new(store, history_limit),
        }
    }
}

struct EngineInner<M> {
    media: M,
    playlist: Playlist,
    status: PlayerStatus,
    current_track: Option<Track>,
    current_tier: Option<QualityTier>,
    is_shuffled: bool,
    repeat: RepeatMode,
    volume: f32,
    muted: bool,
    preferred_quality: QualityTier,
    generation: u64,
    sync: LyricSync,
}

impl<M: MediaElement> EngineInner<M> {
    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    fn next_target(&self) -> Option<usize> {
        if self.is_shuffled {
            random_index(self.playlist.len())
        } else {
            self.playlist.next_index()
        }
    }

    fn prev_target(&self) -> Option<usize> {
        if self.is_shuffled {
            random_index(self.playlist.len())
        } else {
            self.playlist.prev_index()
        }
    }
}

fn random_index(len: usize) -> Option<usize> {
    (len > 0).then(|| rand::rng().random_range(0..len))
}

/// Engine driving one media element
pub struct PlayerEngine<M: MediaElement> {
    inner: Mutex<EngineInner<M>>,
    services: PlayerServices,
    settings: PlayerSettings,
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl<M: MediaElement + 'static> PlayerEngine<M> {
    /// Create a new engine around `media`
    pub fn new(mut media: M, services: PlayerServices, settings: PlayerSettings) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(256);
        media.set_volume(settings.volume);

        Arc::new(Self {
            inner: Mutex::new(EngineInner {
                media,
                playlist: Playlist::default(),
                status: PlayerStatus::Idle,
                current_track: None,
                current_tier: None,
                is_shuffled: false,
                repeat: RepeatMode::Off,
                volume: settings.volume,
                muted: false,
                preferred_quality: settings.preferred_quality,
                generation: 0,
                sync: LyricSync::new(&settings.lyrics),
            }),
            services,
            settings,
            event_tx,
        })
    }

    /// Subscribe to player events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.event_tx.send(event);
    }

    fn notify(&self, kind: NoticeKind, message: String) {
        match kind {
            NoticeKind::Info => info!(target: LOG_TARGET, "{message}"),
            NoticeKind::Error => warn!(target: LOG_TARGET, "{message}"),
        }
        self.emit(PlayerEvent::Notification { kind, message });
    }

    #[must_use]
    pub const fn history(&self) -> &PlayHistory {
        &self.services.history
    }

    /// Current snapshot
    pub async fn state(&self) -> PlaybackState {
        let inner = self.inner.lock().await;
        PlaybackState {
            status: inner.status,
            current_index: inner.playlist.current_index(),
            track: inner.current_track.clone(),
            is_playing: inner.status == PlayerStatus::Playing,
            is_shuffled: inner.is_shuffled,
            repeat: inner.repeat,
            volume: inner.volume,
            muted: inner.muted,
            preferred_quality: inner.preferred_quality,
            current_tier: inner.current_tier,
            position: inner.media.position(),
            duration: inner.media.duration(),
        }
    }

    /// Playback progress in percent, when the duration is known
    pub async fn progress(&self) -> Option<f64> {
        let inner = self.inner.lock().await;
        let duration = inner.media.duration().filter(|d| !d.is_zero())?;
        Some((inner.media.position().as_secs_f64() / duration.as_secs_f64() * 100.0).min(100.0))
    }

    /// Lyrics of the current track
    pub async fn lyrics(&self) -> Lyrics {
        self.inner.lock().await.sync.lyrics().clone()
    }

    pub async fn playlist(&self) -> Vec<Track> {
        self.inner.lock().await.playlist.tracks().to_vec()
    }

    /// Run `f` against the media element. Hosts use this to feed the media
    /// clock; events are not emitted for changes made here.
    pub async fn with_media<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.inner.lock().await.media)
    }

    /// Replace the queue. In-flight loads for the old queue are discarded.
    pub async fn set_playlist(&self, tracks: Vec<Track>, start: Option<usize>) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.playlist.replace(tracks, start);
        self.emit(PlayerEvent::PlaylistChanged {
            len: inner.playlist.len(),
            current: inner.playlist.current_index(),
        });
    }

    pub async fn append(&self, tracks: Vec<Track>) {
        let mut inner = self.inner.lock().await;
        inner.playlist.append(tracks);
        self.emit(PlayerEvent::PlaylistChanged {
            len: inner.playlist.len(),
            current: inner.playlist.current_index(),
        });
    }

    /// Load and play the track at `index`.
    ///
    /// Out-of-range indices are ignored. Returns whether playback started;
    /// `false` also covers loads superseded by a later call.
    pub async fn play_track(self: &Arc<Self>, index: usize) -> bool {
        let (generation, track, preferred) = {
            let mut inner = self.inner.lock().await;
            let Some(track) = inner.playlist.get(index).cloned() else {
                debug!(target: LOG_TARGET, "Ignoring play request for index {index} outside the playlist");
                return false;
            };

            inner.generation += 1;
            inner.playlist.set_current(index);
            inner.status = PlayerStatus::Loading;
            inner.media.pause();
            inner.sync.clear();
            (inner.generation, track, inner.preferred_quality)
        };

        info!(target: LOG_TARGET, "Loading \"{}\" by {}", track.title, track.artist_display());
        self.emit(PlayerEvent::TrackLoading {
            index,
            track: track.clone(),
        });

        let resolved = self.services.resolver.resolve(track.id, preferred).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(target: LOG_TARGET, "Discarding stale stream for track {}", track.id);
            return false;
        }

        let Some(stream) = resolved else {
            inner.media.clear_source();
            inner.status = PlayerStatus::Idle;
            inner.current_track = None;
            inner.current_tier = None;
            drop(inner);
            self.notify(
                NoticeKind::Error,
                format!("No playable source for \"{}\"", track.title),
            );
            return false;
        };

        let duration_hint = Some(track.duration()).filter(|d| !d.is_zero());
        inner.media.set_source(&stream.url, duration_hint);
        let volume = inner.effective_volume();
        inner.media.set_volume(volume);

        if let Err(e) = inner.media.play() {
            inner.media.clear_source();
            inner.status = PlayerStatus::Idle;
            inner.current_track = None;
            inner.current_tier = None;
            drop(inner);
            self.notify(
                NoticeKind::Error,
                format!("Failed to start \"{}\": {e}", track.title),
            );
            return false;
        }

        inner.status = PlayerStatus::Playing;
        inner.current_track = Some(track.clone());
        inner.current_tier = Some(stream.tier);
        drop(inner);

        if let Err(e) = self.services.history.record(&track) {
            warn!(target: LOG_TARGET, "Failed to record play history: {e}");
        }

        info!(target: LOG_TARGET, "Playing \"{}\" at {}", track.title, stream.tier.label());
        self.emit(PlayerEvent::TrackStarted {
            index,
            track: track.clone(),
            tier: stream.tier,
        });

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.load_lyrics(generation, track.id).await;
        });

        true
    }

    async fn load_lyrics(&self, generation: u64, track_id: u64) {
        let lyrics = self.services.lyrics.load(track_id).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(target: LOG_TARGET, "Discarding stale lyrics for track {track_id}");
            return;
        }

        let event = if lyrics.is_empty() {
            PlayerEvent::LyricsNotFound { track_id }
        } else {
            PlayerEvent::LyricsLoaded {
                track_id,
                lines: lyrics.display_cues().len(),
                word_timed: lyrics.has_word_timing(),
                translated: lyrics.has_translation(),
            }
        };
        inner.sync.set_lyrics(lyrics);
        self.emit(event);
    }

    /// Resume the loaded stream, or load the current queue entry when there
    /// is none.
    pub async fn play(self: &Arc<Self>) -> bool {
        let mut inner = self.inner.lock().await;

        if !inner.media.has_source() {
            if inner.playlist.is_empty() {
                return false;
            }
            let index = inner.playlist.current_index().unwrap_or(0);
            drop(inner);
            return self.play_track(index).await;
        }

        if inner.status == PlayerStatus::Ended {
            inner.media.set_position(Duration::ZERO);
            inner.sync.reset();
        }

        match inner.media.play() {
            Ok(()) => {
                inner.status = PlayerStatus::Playing;
                let position = inner.media.position();
                self.emit(PlayerEvent::Resumed { position });
                true
            }
            Err(e) => {
                inner.status = PlayerStatus::Paused;
                drop(inner);
                self.notify(NoticeKind::Error, format!("Playback failed: {e}"));
                false
            }
        }
    }

    pub async fn pause(&self) {
        let mut inner = self.inner.lock().await;
        if inner.status != PlayerStatus::Playing {
            return;
        }
        inner.media.pause();
        inner.status = PlayerStatus::Paused;
        let position = inner.media.position();
        self.emit(PlayerEvent::Paused { position });
    }

    pub async fn toggle(self: &Arc<Self>) {
        let playing = self.inner.lock().await.status == PlayerStatus::Playing;
        if playing {
            self.pause().await;
        } else {
            self.play().await;
        }
    }

    /// Advance the queue: random in shuffle mode, otherwise one forward with
    /// wraparound.
    pub async fn next(self: &Arc<Self>) -> bool {
        let target = self.inner.lock().await.next_target();
        match target {
            Some(index) => self.play_track(index).await,
            None => false,
        }
    }

    /// Go back one track, or restart the current one once it has played past
    /// the restart threshold.
    pub async fn prev(self: &Arc<Self>) -> bool {
        let target = {
            let mut inner = self.inner.lock().await;
            if inner.media.has_source() && inner.media.position() > self.settings.restart_threshold {
                inner.media.set_position(Duration::ZERO);
                inner.sync.reset();
                self.emit(PlayerEvent::Seeked {
                    position: Duration::ZERO,
                });
                return true;
            }
            inner.prev_target()
        };

        match target {
            Some(index) => self.play_track(index).await,
            None => false,
        }
    }

    /// Media reported the end of the stream
    pub async fn on_track_ended(self: &Arc<Self>) {
        let advance = {
            let mut inner = self.inner.lock().await;
            match inner.repeat {
                RepeatMode::One => {
                    inner.media.set_position(Duration::ZERO);
                    inner.sync.reset();
                    if let Err(e) = inner.media.play() {
                        warn!(target: LOG_TARGET, "Failed to repeat track: {e}");
                    }
                    self.emit(PlayerEvent::Seeked {
                        position: Duration::ZERO,
                    });
                    false
                }
                RepeatMode::All => true,
                RepeatMode::Off if inner.playlist.has_next() => true,
                RepeatMode::Off => {
                    inner.media.pause();
                    inner.status = PlayerStatus::Ended;
                    info!(target: LOG_TARGET, "Reached the end of the playlist");
                    self.emit(PlayerEvent::Ended);
                    false
                }
            }
        };

        if advance {
            self.next().await;
        }
    }

    /// Media reported a playback error. Skips to the next track after the
    /// configured delay unless another load starts first.
    pub async fn on_audio_error(self: &Arc<Self>, reason: &str) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.media.pause();
            if inner.status == PlayerStatus::Playing {
                inner.status = PlayerStatus::Paused;
                let position = inner.media.position();
                self.emit(PlayerEvent::Paused { position });
            }
            inner.generation
        };

        self.notify(
            NoticeKind::Error,
            format!("Playback error, trying the next track: {reason}"),
        );

        let engine = Arc::clone(self);
        let delay = self.settings.error_advance_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = engine.inner.lock().await.generation;
            if current != generation {
                debug!(target: LOG_TARGET, "Skipping error advance, another track was loaded");
                return;
            }
            engine.next().await;
        });
    }

    /// Seek to a percentage of the track. No-op while the duration is unknown.
    pub async fn seek(&self, percent: f64) {
        if !percent.is_finite() {
            return;
        }
        let mut inner = self.inner.lock().await;
        let Some(duration) = inner.media.duration() else {
            return;
        };
        let position = duration.mul_f64(percent.clamp(0.0, 100.0) / 100.0);
        self.seek_locked(&mut inner, position);
    }

    /// Jump to the start of lyric cue `index`
    pub async fn seek_to_cue(&self, index: usize) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.media.has_source() {
            return false;
        }
        let Some(position) = inner.sync.cues().get(index).map(|cue| cue.start_time) else {
            return false;
        };
        self.seek_locked(&mut inner, position);
        true
    }

    fn seek_locked(&self, inner: &mut EngineInner<M>, position: Duration) {
        inner.media.set_position(position);
        inner.sync.reset();
        self.emit(PlayerEvent::Seeked { position });
        self.sync_lyrics(inner);
    }

    /// Media clock tick: report the time and move the lyric cursor
    pub async fn on_time_update(&self) {
        let mut inner = self.inner.lock().await;
        self.emit(PlayerEvent::TimeUpdate {
            position: inner.media.position(),
            duration: inner.media.duration(),
        });
        self.sync_lyrics(&mut inner);
    }

    fn sync_lyrics(&self, inner: &mut EngineInner<M>) {
        let position = inner.media.position();
        let update = inner.sync.update(position);

        if let Some(line) = update.line {
            self.emit(PlayerEvent::LineChanged {
                index: line.index,
                text: line.text,
                translation: line.translation,
            });
        }
        if let (Some(states), Some(index)) = (update.words, inner.sync.current_index()) {
            self.emit(PlayerEvent::WordsChanged { index, states });
        }
    }

    /// Set the volume in percent. While muted the new level is remembered and
    /// applied on unmute.
    pub async fn set_volume(&self, percent: f64) {
        if !percent.is_finite() {
            return;
        }
        let mut inner = self.inner.lock().await;
        #[allow(clippy::cast_possible_truncation)]
        let volume = (percent.clamp(0.0, 100.0) / 100.0) as f32;
        inner.volume = volume;
        let effective = inner.effective_volume();
        inner.media.set_volume(effective);
        self.emit(PlayerEvent::VolumeChanged {
            volume,
            muted: inner.muted,
        });
    }

    pub async fn toggle_mute(&self) -> bool {
        let mut inner = self.inner.lock().await;
        inner.muted = !inner.muted;
        let effective = inner.effective_volume();
        inner.media.set_volume(effective);
        self.emit(PlayerEvent::VolumeChanged {
            volume: inner.volume,
            muted: inner.muted,
        });
        inner.muted
    }

    pub async fn toggle_shuffle(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let shuffled = !inner.is_shuffled;
        inner.is_shuffled = shuffled;
        self.emit(PlayerEvent::ShuffleChanged(shuffled));
        shuffled
    }

    pub async fn set_shuffle(&self, shuffled: bool) {
        self.inner.lock().await.is_shuffled = shuffled;
        self.emit(PlayerEvent::ShuffleChanged(shuffled));
    }

    pub async fn cycle_repeat(&self) -> RepeatMode {
        let mut inner = self.inner.lock().await;
        inner.repeat = inner.repeat.cycle();
        self.emit(PlayerEvent::RepeatChanged(inner.repeat));
        inner.repeat
    }

    pub async fn set_repeat(&self, repeat: RepeatMode) {
        self.inner.lock().await.repeat = repeat;
        self.emit(PlayerEvent::RepeatChanged(repeat));
    }

    /// Tier to try first on the next load
    pub async fn set_preferred_quality(&self, tier: QualityTier) {
        self.inner.lock().await.preferred_quality = tier;
        self.emit(PlayerEvent::QualityChanged(tier));
    }

    pub async fn toggle_translation(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let show = !inner.sync.show_translation();
        inner.sync.set_show_translation(show);
        inner.sync.reset();
        self.emit(PlayerEvent::TranslationToggled(show));
        show
    }

    /// Drop a track from history and from the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be persisted.
    pub async fn remove_from_history(&self, track_id: u64) -> crate::error::Result<bool> {
        let removed = self.services.history.remove(track_id)?;

        let mut inner = self.inner.lock().await;
        if inner.playlist.remove_by_id(track_id) {
            self.emit(PlayerEvent::PlaylistChanged {
                len: inner.playlist.len(),
                current: inner.playlist.current_index(),
            });
        }
        Ok(removed)
    }
}
