use melodia_core::{CoreError, MediaElement};
use std::time::Duration;
use tokio::time::Instant;

/// Silent media element driven by the wall clock. Position advances in real
/// time while playing and stops at the stream's duration.
#[derive(Debug, Default)]
pub struct ClockMedia {
    source: Option<String>,
    duration: Option<Duration>,
    /// Position at the last play/pause/seek
    anchor: Duration,
    /// Set while playing
    started_at: Option<Instant>,
}

impl ClockMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// The clock reached the end of the stream
    pub fn is_ended(&self) -> bool {
        self.duration
            .is_some_and(|duration| self.source.is_some() && self.position() >= duration)
    }
}

impl MediaElement for ClockMedia {
    fn set_source(&mut self, url: &str, duration_hint: Option<Duration>) {
        self.source = Some(url.to_string());
        self.duration = duration_hint;
        self.anchor = Duration::ZERO;
        self.started_at = None;
    }

    fn clear_source(&mut self) {
        self.source = None;
        self.duration = None;
        self.anchor = Duration::ZERO;
        self.started_at = None;
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn play(&mut self) -> Result<(), CoreError> {
        if self.source.is_none() {
            return Err(CoreError::MediaError {
                reason: "no source loaded".to_string(),
            });
        }
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.anchor = self.position();
        self.started_at = None;
    }

    fn is_paused(&self) -> bool {
        self.started_at.is_none()
    }

    fn position(&self) -> Duration {
        let position = self.anchor + self.started_at.map_or(Duration::ZERO, |t| t.elapsed());
        self.duration.map_or(position, |duration| position.min(duration))
    }

    fn set_position(&mut self, position: Duration) {
        self.anchor = self.duration.map_or(position, |duration| position.min(duration));
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn set_volume(&mut self, _volume: f32) {
        // No audio output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_clock_advances_only_while_playing() {
        let mut media = ClockMedia::new();
        assert!(media.play().is_err());

        media.set_source("http://cdn/1.mp3", Some(Duration::from_secs(10)));
        assert!(media.is_paused());
        advance(Duration::from_secs(2)).await;
        assert_eq!(media.position(), Duration::ZERO);

        media.play().unwrap();
        advance(Duration::from_secs(3)).await;
        assert_eq!(media.position(), Duration::from_secs(3));

        media.pause();
        advance(Duration::from_secs(3)).await;
        assert_eq!(media.position(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_stops_at_duration() {
        let mut media = ClockMedia::new();
        media.set_source("http://cdn/1.mp3", Some(Duration::from_secs(5)));
        media.play().unwrap();

        advance(Duration::from_secs(4)).await;
        assert!(!media.is_ended());
        advance(Duration::from_secs(4)).await;
        assert!(media.is_ended());
        assert_eq!(media.position(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_while_playing() {
        let mut media = ClockMedia::new();
        media.set_source("http://cdn/1.mp3", Some(Duration::from_secs(60)));
        media.play().unwrap();
        advance(Duration::from_secs(10)).await;

        media.set_position(Duration::from_secs(30));
        advance(Duration::from_secs(1)).await;
        assert_eq!(media.position(), Duration::from_secs(31));

        media.set_position(Duration::from_secs(90));
        assert_eq!(media.position(), Duration::from_secs(60));
    }

    #[test]
    fn test_clear_source() {
        let mut media = ClockMedia::new();
        media.set_source("http://cdn/1.mp3", None);
        media.clear_source();
        assert!(!media.has_source());
        assert!(!media.is_ended());
    }
}
