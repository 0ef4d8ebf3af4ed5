use clap::{Parser, Subcommand, ValueEnum};
use melodia_core::{QualityTier, RepeatMode};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "melodia",
    version,
    about = "Headless music player with quality fallback and synced lyrics"
)]
pub struct Cli {
    /// Override config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find a playable stream, stepping down quality tiers until one works
    Resolve {
        track_id: u64,
        /// Tier to try first (jymaster, sky, jyeffect, hires, lossless, exhigh, higher, standard)
        #[arg(long, short)]
        quality: Option<QualityTier>,
    },
    /// Print a track's lyrics
    Lyrics {
        track_id: u64,
        /// Follow along in real time, printing each line as it becomes active
        #[arg(long)]
        follow: bool,
        /// Hide translations
        #[arg(long)]
        no_translation: bool,
    },
    /// List the tracks of a playlist
    Playlist { playlist_id: u64 },
    /// Show play history
    History {
        /// Remove every entry
        #[arg(long)]
        clear: bool,
    },
    /// Play a playlist on a silent clock, printing tracks and lyric lines
    Play {
        playlist_id: u64,
        /// Queue index to start from
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long)]
        shuffle: bool,
        #[arg(long, value_enum, default_value_t = RepeatArg::Off)]
        repeat: RepeatArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatArg {
    Off,
    All,
    One,
}

impl From<RepeatArg> for RepeatMode {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Off => Self::Off,
            RepeatArg::All => Self::All,
            RepeatArg::One => Self::One,
        }
    }
}
