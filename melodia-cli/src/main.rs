mod cli;
mod clock_media;
mod commands;

use crate::cli::Cli;
use clap::Parser;
use melodia_core::{CoreError, MelodiaConfig, TomlParseError};
use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(MelodiaConfig::config_path);

    // Peek at logging.file_enabled before the full config load so that load
    // errors are logged too
    init_tracing(MelodiaConfig::file_logging_enabled(&config_path));

    let config = match MelodiaConfig::load_or_create_at(&config_path) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            println!(
                "Created a config template at {}. Review it and run melodia again.",
                path.display()
            );
            return ExitCode::SUCCESS;
        }
        Err(CoreError::ConfigParseError(parse_error)) => {
            report_parse_error(&parse_error, &config_path);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Ctrl+C stops long-running commands
    let cancel_token = CancellationToken::new();
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {e}");
    }

    match runtime.block_on(commands::run(cli.command, config, &cancel_token)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn report_parse_error(parse_error: &TomlParseError, config_path: &Path) {
    let location = parse_error
        .span()
        .map(|span| format!(" (bytes {}..{})", span.start, span.end))
        .unwrap_or_default();
    error!(
        "Failed to parse {}{location}: {}",
        config_path.display(),
        parse_error.message()
    );
    error!("Fix the file, or delete it to have a fresh template written on the next run.");
}

fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest_retry=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if file_logging_enabled {
        let log_path = melodia_core::paths::log_file_path();

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match File::create(&log_path) {
            Ok(file) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt_layer)
                    .with(file_layer)
                    .init();

                return;
            }
            Err(e) => {
                eprintln!("Failed to create log file at {}: {e}", log_path.display());
            }
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
