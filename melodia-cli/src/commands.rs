use crate::cli::Command;
use crate::clock_media::ClockMedia;
use chrono::{DateTime, Local};
use melodia_core::{
    Catalog, CoreError, DataCache, DurationExt, JsonFileStore, LyricSync, LyricsLoader,
    MelodiaConfig, MusicApi, NoticeKind, PlayHistory, PlayerEngine, PlayerEvent, PlayerServices,
    PlayerSettings, PlayerStatus, QualityTier, RepeatMode, SharedCache, StateStore,
    StreamResolver, Track,
};
use melodia_netease::NeteaseClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOG_TARGET: &str = "melodia::cli";

/// Media clock tick for `play`
const PLAY_TICK: Duration = Duration::from_millis(250);
/// Lyric clock tick for `lyrics --follow`
const FOLLOW_TICK: Duration = Duration::from_millis(100);
/// How long `lyrics --follow` keeps running after the last line starts
const FOLLOW_TAIL: Duration = Duration::from_secs(5);

/// Shared collaborators for one CLI invocation
struct Context {
    config: MelodiaConfig,
    api: Arc<dyn MusicApi>,
    cache: SharedCache,
    store: Arc<dyn StateStore>,
}

impl Context {
    fn new(config: MelodiaConfig) -> Result<Self, CoreError> {
        let store: Arc<dyn StateStore> = Arc::new(JsonFileStore::open_default());
        let client = NeteaseClient::new(&config.api)?.with_store(Arc::clone(&store));
        info!(
            target: LOG_TARGET,
            "Using {} API at {}",
            client.name(),
            client.base_url()
        );

        Ok(Self {
            cache: DataCache::shared(&config.cache),
            api: Arc::new(client),
            store,
            config,
        })
    }

    fn history(&self) -> PlayHistory {
        PlayHistory::new(Arc::clone(&self.store), self.config.playback.history_limit)
    }
}

/// Run one subcommand to completion.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, a catalog request
/// fails, or history cannot be persisted.
pub async fn run(
    command: Command,
    config: MelodiaConfig,
    cancel: &CancellationToken,
) -> Result<(), CoreError> {
    let ctx = Context::new(config)?;

    match command {
        Command::Resolve { track_id, quality } => {
            resolve(&ctx, track_id, quality).await;
            Ok(())
        }
        Command::Lyrics {
            track_id,
            follow,
            no_translation,
        } => {
            lyrics(&ctx, track_id, follow, !no_translation, cancel).await;
            Ok(())
        }
        Command::Playlist { playlist_id } => {
            let tracks = Catalog::new(Arc::clone(&ctx.api), ctx.cache.clone())
                .playlist_tracks(playlist_id)
                .await?;
            print_tracks(&tracks);
            Ok(())
        }
        Command::History { clear } => history(&ctx, clear),
        Command::Play {
            playlist_id,
            start,
            shuffle,
            repeat,
        } => play(&ctx, playlist_id, start, shuffle, repeat.into(), cancel).await,
    }
}

async fn resolve(ctx: &Context, track_id: u64, quality: Option<QualityTier>) {
    let preferred = quality.unwrap_or(ctx.config.playback.preferred_quality);
    let resolver = StreamResolver::new(Arc::clone(&ctx.api));

    match resolver.resolve(track_id, preferred).await {
        Some(stream) => {
            println!("{} [{}]", stream.tier.label(), stream.tier.badge());
            println!("{}", stream.url);
        }
        None => println!("No playable source for track {track_id}"),
    }
}

async fn lyrics(
    ctx: &Context,
    track_id: u64,
    follow: bool,
    show_translation: bool,
    cancel: &CancellationToken,
) {
    let loaded = LyricsLoader::new(Arc::clone(&ctx.api), ctx.cache.clone())
        .load(track_id)
        .await;
    if loaded.is_empty() {
        println!("No lyrics found for track {track_id}");
        return;
    }

    let mut sync = LyricSync::new(&ctx.config.lyrics);
    sync.set_show_translation(show_translation);
    sync.set_lyrics(loaded);

    if !follow {
        for (index, cue) in sync.cues().iter().enumerate() {
            println!("[{}] {}", cue.start_time.to_clock_string(), cue.text);
            if let Some(translation) = sync.translation_for(index) {
                println!("        {}", translation.text);
            }
        }
        return;
    }

    let end = sync
        .cues()
        .last()
        .map_or(Duration::ZERO, |cue| {
            cue.start_time + cue.duration.unwrap_or(FOLLOW_TAIL)
        });
    let started = Instant::now();
    let mut ticker = interval(FOLLOW_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let position = started.elapsed();
        if let Some(line) = sync.update(position).line {
            if let Some(text) = line.text {
                println!("{text}");
            }
            if let Some(translation) = line.translation {
                println!("    {translation}");
            }
        }
        if position >= end {
            break;
        }
    }
}

fn history(ctx: &Context, clear: bool) -> Result<(), CoreError> {
    let history = ctx.history();

    if clear {
        history.clear()?;
        println!("History cleared");
        return Ok(());
    }

    let entries = history.entries();
    if entries.is_empty() {
        println!("No play history");
        return Ok(());
    }
    for entry in entries {
        let played = DateTime::from_timestamp_millis(entry.played_at).map_or_else(
            || "-".to_string(),
            |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        );
        println!(
            "{played}  {} - {} [{}]",
            entry.track.title,
            entry.track.artist_display(),
            entry.track.duration_label()
        );
    }
    Ok(())
}

fn print_tracks(tracks: &[Track]) {
    if tracks.is_empty() {
        println!("Playlist is empty");
        return;
    }
    for (index, track) in tracks.iter().enumerate() {
        println!(
            "{:>3}. {} - {} [{}]",
            index + 1,
            track.title,
            track.artist_display(),
            track.duration_label()
        );
    }
}

async fn play(
    ctx: &Context,
    playlist_id: u64,
    start: usize,
    shuffle: bool,
    repeat: RepeatMode,
    cancel: &CancellationToken,
) -> Result<(), CoreError> {
    let tracks = Catalog::new(Arc::clone(&ctx.api), ctx.cache.clone())
        .playlist_tracks(playlist_id)
        .await?;
    if tracks.is_empty() {
        println!("Playlist is empty");
        return Ok(());
    }
    let len = tracks.len();

    let services = PlayerServices::new(
        Arc::clone(&ctx.api),
        ctx.cache.clone(),
        Arc::clone(&ctx.store),
        ctx.config.playback.history_limit,
    );
    let engine = PlayerEngine::new(
        ClockMedia::new(),
        services,
        PlayerSettings::from_config(&ctx.config),
    );
    let printer = tokio::spawn(print_events(engine.subscribe()));

    engine.set_playlist(tracks, Some(start.min(len - 1))).await;
    engine.set_shuffle(shuffle).await;
    engine.set_repeat(repeat).await;
    engine.play().await;

    let mut failures = 0;
    let mut ticker = interval(PLAY_TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        engine.on_time_update().await;
        if engine.with_media(|media| media.is_ended()).await {
            engine.on_track_ended().await;
        }

        match engine.state().await.status {
            PlayerStatus::Ended => break,
            PlayerStatus::Idle => {
                failures += 1;
                if failures >= len {
                    println!("No playable tracks left in the queue");
                    break;
                }
                engine.next().await;
            }
            PlayerStatus::Playing => failures = 0,
            PlayerStatus::Loading | PlayerStatus::Paused => {}
        }
    }

    engine.pause().await;
    printer.abort();
    Ok(())
}

async fn print_events(mut rx: broadcast::Receiver<PlayerEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event {
                PlayerEvent::TrackStarted { index, track, tier } => {
                    println!();
                    println!(
                        "#{} {} - {} [{}] ({})",
                        index + 1,
                        track.title,
                        track.artist_display(),
                        track.duration_label(),
                        tier.label()
                    );
                }
                PlayerEvent::LineChanged {
                    text: Some(text),
                    translation,
                    ..
                } => {
                    println!("  {text}");
                    if let Some(translation) = translation {
                        println!("    {translation}");
                    }
                }
                PlayerEvent::LyricsNotFound { .. } => println!("  (no lyrics)"),
                PlayerEvent::Notification { kind, message } => match kind {
                    NoticeKind::Info => println!("{message}"),
                    NoticeKind::Error => eprintln!("{message}"),
                },
                PlayerEvent::Ended => println!("Queue finished"),
                _ => {}
            },
            Err(broadcast::error::RecvError::Closed) => break,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!(target: LOG_TARGET, "Missed {n} player events");
            }
        }
    }
}
