//! Timed-text parsing for line-level, word-level and translation lyrics.
//!
//! Three formats are consumed:
//!
//! - line lyrics: `[mm:ss.xx]text`, optionally with several timestamps on one
//!   line (`[00:05.00][00:15.00]Chorus`)
//! - word-timed lyrics: `[lineStartMs,lineDurationMs](wordStartMs,wordDurationMs,0)word...`
//! - translations: the line grammar, one cue per line
//!
//! Parsing never fails. Lines that do not match are skipped.

use std::time::Duration;

/// Word-level timing inside a lyric line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCue {
    pub start_time: Duration,
    pub duration: Duration,
    pub text: String,
}

impl WordCue {
    /// End of the word's window (exclusive)
    #[must_use]
    pub fn end_time(&self) -> Duration {
        self.start_time.saturating_add(self.duration)
    }

    /// Whether `position` falls inside `[start, start + duration)`
    #[must_use]
    pub fn contains(&self, position: Duration) -> bool {
        position >= self.start_time && position < self.end_time()
    }
}

/// A single timed lyric line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricCue {
    pub start_time: Duration,
    pub text: String,
    /// Line duration, present for word-timed lyrics
    pub duration: Option<Duration>,
    /// Word-level timing, present for word-timed lyrics
    pub words: Option<Vec<WordCue>>,
}

impl LyricCue {
    /// Create a plain line cue without word timing
    pub fn line(start_time: Duration, text: impl Into<String>) -> Self {
        Self {
            start_time,
            text: text.into(),
            duration: None,
            words: None,
        }
    }
}

/// A timed translation line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationCue {
    pub start_time: Duration,
    pub text: String,
}

/// Everything parsed for one track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lyrics {
    /// Line-level cues
    pub lines: Vec<LyricCue>,
    /// Word-timed cues (empty when the service has none)
    pub word_lines: Vec<LyricCue>,
    /// Translation cues
    pub translations: Vec<TranslationCue>,
}

impl Lyrics {
    /// True when there is nothing to display
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.word_lines.is_empty()
    }

    /// Whether word-level timing is available
    #[must_use]
    pub fn has_word_timing(&self) -> bool {
        !self.word_lines.is_empty()
    }

    /// Whether a translation is available
    #[must_use]
    pub fn has_translation(&self) -> bool {
        !self.translations.is_empty()
    }

    /// The cues to display: word-timed when available, line-level otherwise
    #[must_use]
    pub fn display_cues(&self) -> &[LyricCue] {
        if self.word_lines.is_empty() {
            &self.lines
        } else {
            &self.word_lines
        }
    }
}

/// Parse line lyrics into cues sorted by start time.
///
/// A line carrying several leading timestamps yields one cue per timestamp,
/// all sharing the same text.
#[must_use]
pub fn parse_line_lyrics(raw: &str) -> Vec<LyricCue> {
    let mut cues = Vec::new();

    for line in raw.lines() {
        let (timestamps, rest) = split_leading_timestamps(line.trim());
        if timestamps.is_empty() {
            continue;
        }

        let text = rest.trim();
        if text.is_empty() {
            continue;
        }

        cues.extend(
            timestamps
                .into_iter()
                .map(|start_time| LyricCue::line(start_time, text)),
        );
    }

    // Stable sort keeps insertion order for identical timestamps
    cues.sort_by_key(|cue| cue.start_time);
    cues
}

/// Parse word-timed lyrics into cues sorted by line start time.
#[must_use]
pub fn parse_word_lyrics(raw: &str) -> Vec<LyricCue> {
    let mut cues: Vec<LyricCue> = raw
        .lines()
        .filter_map(|line| parse_word_line(line.trim_start()))
        .collect();

    cues.sort_by_key(|cue| cue.start_time);
    cues
}

/// Parse translation lyrics. Only the first timestamp on a line is used.
#[must_use]
pub fn parse_translation_lyrics(raw: &str) -> Vec<TranslationCue> {
    let mut cues = Vec::new();

    for line in raw.lines() {
        let (timestamps, rest) = split_leading_timestamps(line.trim());
        let Some(&start_time) = timestamps.first() else {
            continue;
        };

        let text = rest.trim();
        if !text.is_empty() {
            cues.push(TranslationCue {
                start_time,
                text: text.to_string(),
            });
        }
    }

    cues.sort_by_key(|cue| cue.start_time);
    cues
}

/// Strip every leading `[mm:ss.xx]` group, returning the parsed times and the
/// remainder of the line.
fn split_leading_timestamps(line: &str) -> (Vec<Duration>, &str) {
    let mut timestamps = Vec::new();
    let mut remaining = line;

    while let Some(after_open) = remaining.strip_prefix('[') {
        let Some(end) = after_open.find(']') else {
            break;
        };
        let Some(time) = parse_timestamp(&after_open[..end]) else {
            // Metadata tag such as [ar:Artist]
            break;
        };
        timestamps.push(time);
        remaining = &after_open[end + 1..];
    }

    (timestamps, remaining)
}

/// Parse `mm:ss.xx` or `mm:ss.xxx`. Two-digit fractions are hundredths.
fn parse_timestamp(s: &str) -> Option<Duration> {
    let (minutes, rest) = s.split_once(':')?;
    let (seconds, fraction) = rest.split_once('.')?;

    if !is_digits(minutes) || seconds.len() != 2 || !is_digits(seconds) {
        return None;
    }
    if !(2..=3).contains(&fraction.len()) || !is_digits(fraction) {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let mut millis: u64 = fraction.parse().ok()?;
    if fraction.len() == 2 {
        millis *= 10;
    }

    let total = minutes
        .checked_mul(60_000)?
        .checked_add(seconds * 1000)?
        .checked_add(millis)?;
    Some(Duration::from_millis(total))
}

/// Parse one `[start,duration](ws,wd,n)text...` line.
fn parse_word_line(line: &str) -> Option<LyricCue> {
    let header_body = line.strip_prefix('[')?;
    let (header, body) = header_body.split_once(']')?;
    let (start_ms, duration_ms) = header.split_once(',')?;
    let start_time = parse_millis(start_ms)?;
    let duration = parse_millis(duration_ms)?;

    let mut words = Vec::new();
    let mut remaining = body;

    while let Some(open) = remaining.find('(') {
        let after_open = &remaining[open + 1..];
        let Some(close) = after_open.find(')') else {
            break;
        };
        let timing = &after_open[..close];
        let tail = &after_open[close + 1..];
        let text_end = tail.find('(').unwrap_or(tail.len());

        if let Some((word_start, word_duration)) = parse_word_timing(timing) {
            words.push(WordCue {
                start_time: word_start,
                duration: word_duration,
                text: tail[..text_end].to_string(),
            });
        }

        remaining = &tail[text_end..];
    }

    if words.is_empty() {
        return None;
    }

    let text = words.iter().map(|w| w.text.as_str()).collect();
    Some(LyricCue {
        start_time,
        text,
        duration: Some(duration),
        words: Some(words),
    })
}

/// Parse `wordStartMs,wordDurationMs,flag`
fn parse_word_timing(s: &str) -> Option<(Duration, Duration)> {
    let mut parts = s.split(',');
    let start = parse_millis(parts.next()?)?;
    let duration = parse_millis(parts.next()?)?;
    let flag = parts.next()?;
    if !is_digits(flag) || parts.next().is_some() {
        return None;
    }
    Some((start, duration))
}

fn parse_millis(s: &str) -> Option<Duration> {
    if !is_digits(s) {
        return None;
    }
    s.parse().ok().map(Duration::from_millis)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
