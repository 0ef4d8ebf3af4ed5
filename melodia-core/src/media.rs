use crate::error::Result;
use std::time::Duration;

/// The host's audio output. Decoding and the media clock live behind this
/// trait; the engine only drives transport.
pub trait MediaElement: Send {
    /// Load a new stream. Position resets to zero and playback is paused.
    fn set_source(&mut self, url: &str, duration_hint: Option<Duration>);

    /// Unload the current stream
    fn clear_source(&mut self);

    fn has_source(&self) -> bool;

    /// Start or resume playback of the loaded stream.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if there is no source or the host refuses to play.
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Current position of the media clock
    fn position(&self) -> Duration;

    fn set_position(&mut self, position: Duration);

    /// Stream length, once known
    fn duration(&self) -> Option<Duration>;

    /// Output volume in [0, 1]
    fn set_volume(&mut self, volume: f32);
}
