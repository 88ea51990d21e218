//! Process-wide `tracing` setup: a compact stdout layer plus a daily log file
//! `logs/rag-assistant.<date>.log` under the data dir.

use std::sync::OnceLock;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

/// Used when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "rag_assistant=info,tower_http=info";

// Flushes the file writer on drop, so it lives as long as the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn init(paths: &AppPaths) -> anyhow::Result<()> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("rag-assistant")
        .filename_suffix("log")
        .build(&paths.log_dir)
        .with_context(|| format!("Cannot open log file in {}", paths.log_dir.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    let _ = FILE_GUARD.set(guard);
    Ok(())
}
