//! Maps the media clock onto lyric cues and drives the lyric view scroll.

use crate::config::LyricsConfig;
use crate::lyrics::{LyricCue, Lyrics, TranslationCue, WordCue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Highlight state of a lyric line relative to the active one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueState {
    Active,
    Passed,
    Neutral,
}

/// Highlight state of a word inside the active line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordState {
    Current,
    Passed,
    Neutral,
}

/// The active line changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    /// `None` before the first cue
    pub index: Option<usize>,
    pub text: Option<String>,
    pub translation: Option<String>,
}

/// What changed since the previous tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncUpdate {
    pub line: Option<LineChange>,
    /// Word states of the active line, when word timing exists and they changed
    pub words: Option<Vec<WordState>>,
}

impl SyncUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.line.is_none() && self.words.is_none()
    }
}

/// Index of the last cue starting at or before `position`
#[must_use]
pub fn cue_index_at(cues: &[LyricCue], position: Duration) -> Option<usize> {
    cues.partition_point(|cue| cue.start_time <= position)
        .checked_sub(1)
}

/// Word states at `position`. At most one word is current: when windows
/// overlap the last containing word wins.
#[must_use]
pub fn word_states_at(words: &[WordCue], position: Duration) -> Vec<WordState> {
    let current = words.iter().rposition(|word| word.contains(position));

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if Some(i) == current {
                WordState::Current
            } else if position >= word.end_time() {
                WordState::Passed
            } else {
                WordState::Neutral
            }
        })
        .collect()
}

/// Nearest translation within `tolerance` of `position`; ties go to the
/// earlier cue.
#[must_use]
pub fn nearest_translation(
    translations: &[TranslationCue],
    position: Duration,
    tolerance: Duration,
) -> Option<&TranslationCue> {
    let split = translations.partition_point(|cue| cue.start_time <= position);

    let before = split.checked_sub(1).map(|i| {
        // First of any cues sharing that timestamp
        let time = translations[i].start_time;
        let first = translations.partition_point(|cue| cue.start_time < time);
        (&translations[first], position - time)
    });
    let after = translations
        .get(split)
        .map(|cue| (cue, cue.start_time - position));

    let best = match (before, after) {
        (Some(b), Some(a)) => {
            if b.1 <= a.1 {
                b
            } else {
                a
            }
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => return None,
    };

    (best.1 <= tolerance).then_some(best.0)
}

/// Tracks the active line and word for one track's lyrics.
#[derive(Debug, Clone)]
pub struct LyricSync {
    lyrics: Lyrics,
    show_translation: bool,
    tolerance: Duration,
    current: Option<usize>,
    words: Vec<WordState>,
}

impl LyricSync {
    #[must_use]
    pub fn new(config: &LyricsConfig) -> Self {
        Self {
            lyrics: Lyrics::default(),
            show_translation: config.show_translation,
            tolerance: config.translation_tolerance(),
            current: None,
            words: Vec::new(),
        }
    }

    /// Swap in lyrics for a new track and reset the cursor
    pub fn set_lyrics(&mut self, lyrics: Lyrics) {
        self.lyrics = lyrics;
        self.reset();
    }

    pub fn clear(&mut self) {
        self.set_lyrics(Lyrics::default());
    }

    /// Forget the active line so the next update re-emits it
    pub fn reset(&mut self) {
        self.current = None;
        self.words.clear();
    }

    #[must_use]
    pub const fn lyrics(&self) -> &Lyrics {
        &self.lyrics
    }

    /// Cues being displayed (word-timed when available)
    #[must_use]
    pub fn cues(&self) -> &[LyricCue] {
        self.lyrics.display_cues()
    }

    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current_cue_index(&self, position: Duration) -> Option<usize> {
        cue_index_at(self.cues(), position)
    }

    /// State of line `index` relative to the active line
    #[must_use]
    pub fn cue_state(&self, index: usize) -> CueState {
        match self.current {
            Some(current) if index == current => CueState::Active,
            Some(current) if index < current => CueState::Passed,
            _ => CueState::Neutral,
        }
    }

    #[must_use]
    pub const fn show_translation(&self) -> bool {
        self.show_translation
    }

    pub fn set_show_translation(&mut self, show: bool) {
        self.show_translation = show;
    }

    /// Translation to show at `position`, if any and if enabled
    #[must_use]
    pub fn translation_at(&self, position: Duration) -> Option<&TranslationCue> {
        if !self.show_translation {
            return None;
        }
        nearest_translation(&self.lyrics.translations, position, self.tolerance)
    }

    /// Translation for cue `index`
    #[must_use]
    pub fn translation_for(&self, index: usize) -> Option<&TranslationCue> {
        let cue = self.cues().get(index)?;
        self.translation_at(cue.start_time)
    }

    /// Advance to `position`, reporting the line and word changes.
    pub fn update(&mut self, position: Duration) -> SyncUpdate {
        let mut update = SyncUpdate::default();
        let index = self.current_cue_index(position);

        if index != self.current {
            self.current = index;
            self.words.clear();
            update.line = Some(LineChange {
                index,
                text: index.and_then(|i| self.cues().get(i)).map(|cue| cue.text.clone()),
                translation: index
                    .and_then(|i| self.translation_for(i))
                    .map(|t| t.text.clone()),
            });
        }

        let words = index
            .and_then(|i| self.cues().get(i))
            .and_then(|cue| cue.words.as_deref())
            .map(|words| word_states_at(words, position));
        if let Some(words) = words {
            if words != self.words {
                self.words.clone_from(&words);
                update.words = Some(words);
            }
        }

        update
    }
}

/// `1 - 2^(-10t)`, exactly 1 at `t = 1`
#[must_use]
pub fn ease_out_expo(t: f64) -> f64 {
    if t >= 1.0 {
        1.0
    } else {
        1.0 - 2f64.powf(-10.0 * t)
    }
}

/// Scroll offset that centres a line in its container
#[must_use]
pub fn center_target(line_top: f64, line_height: f64, container_height: f64) -> f64 {
    line_top - container_height / 2.0 + line_height / 2.0
}

/// Eased scroll of the lyric view. Offsets are published on a watch channel.
///
/// Only one animation runs at a time: starting a new one, closing the view or
/// dropping the animator cancels the running task.
pub struct ScrollAnimator {
    offset: Arc<watch::Sender<f64>>,
    duration: Duration,
    frame_interval: Duration,
    snap_distance: f64,
    active: Option<CancellationToken>,
}

impl ScrollAnimator {
    #[must_use]
    pub fn new(config: &LyricsConfig) -> Self {
        let (offset, _) = watch::channel(0.0);
        let frame_rate = u64::from(config.scroll_frame_rate.max(1));
        Self {
            offset: Arc::new(offset),
            duration: Duration::from_millis(config.scroll_duration_ms),
            frame_interval: Duration::from_micros((1_000_000 / frame_rate).max(1)),
            snap_distance: config.scroll_snap_distance,
            active: None,
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.offset.subscribe()
    }

    #[must_use]
    pub fn offset(&self) -> f64 {
        *self.offset.borrow()
    }

    /// Whether an animation task is still running
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.active.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Scroll to `target`. Short distances jump; longer ones animate.
    /// Must be called from within a tokio runtime.
    pub fn animate_to(&mut self, target: f64) {
        self.cancel();

        let start = self.offset();
        let distance = target - start;
        if distance.abs() < self.snap_distance || self.duration.is_zero() {
            self.offset.send_replace(target);
            return;
        }

        let token = CancellationToken::new();
        self.active = Some(token.clone());

        let offset = Arc::clone(&self.offset);
        let duration = self.duration;
        let frame_interval = self.frame_interval;
        let started = Instant::now();

        tokio::spawn(async move {
            let mut ticker = interval(frame_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let progress =
                            (started.elapsed().as_secs_f64() / duration.as_secs_f64()).min(1.0);
                        offset.send_replace(start + distance * ease_out_expo(progress));
                        if progress >= 1.0 {
                            token.cancel();
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Stop any running animation, leaving the offset where it is
    pub fn close(&mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(token) = self.active.take() {
            token.cancel();
        }
    }
}

impl Drop for ScrollAnimator {
    fn drop(&mut self) {
        self.cancel();
    }
}
