//! Subscriber setup for the command line.

use std::env;
use std::fs::{File, OpenOptions};
use std::io;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(text: &str) -> Result<Self, String> {
        if text.eq_ignore_ascii_case("pretty") {
            Ok(LogFormat::Pretty)
        } else if text.eq_ignore_ascii_case("json") {
            Ok(LogFormat::Json)
        } else {
            Err("Invalid TANDEM_LOG_FORMAT (expected 'json' or 'pretty')".to_string())
        }
    }
}

fn open_log_file(path: &str) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| format!("Failed to open log file: {err}"))
}

fn map_init_err<E: std::fmt::Display>(err: E) -> String {
    format!("Failed to initialize logging: {err}")
}

/// Filter from `level`, else `TANDEM_TRACE`, else `off`.
fn build_filter(level: Option<&str>) -> Result<EnvFilter, String> {
    let level_value = level
        .map(str::to_string)
        .or_else(|| env::var("TANDEM_TRACE").ok())
        .unwrap_or_else(|| "off".to_string());
    if level_value.eq_ignore_ascii_case("off") {
        Ok(EnvFilter::default().add_directive(LevelFilter::OFF.into()))
    } else {
        EnvFilter::try_new(&level_value).map_err(|err| format!("Invalid log filter: {err}"))
    }
}

/// Install the global subscriber on stderr, mirrored to `TANDEM_LOG_FILE`
/// when set. Returns false when a subscriber is already installed.
pub fn init(level: Option<&str>) -> Result<bool, String> {
    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let filter = build_filter(level)?;
    let format = LogFormat::parse(
        &env::var("TANDEM_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
    )?;
    let log_file = env::var("TANDEM_LOG_FILE").ok();

    match format {
        LogFormat::Json => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .json();
            let base = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer);
            if let Some(path) = log_file {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(open_log_file(&path)?)
                    .with_ansi(false)
                    .json();
                base.with(file_layer).try_init().map_err(map_init_err)?;
            } else {
                base.try_init().map_err(map_init_err)?;
            }
        }
        LogFormat::Pretty => {
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .pretty();
            let base = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer);
            if let Some(path) = log_file {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(open_log_file(&path)?)
                    .with_ansi(false)
                    .pretty();
                base.with(file_layer).try_init().map_err(map_init_err)?;
            } else {
                base.try_init().map_err(map_init_err)?;
            }
        }
    }
    Ok(true)
}
