//! Logging setup for nlip-agent using tracing.

use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging: console on stderr plus a daily-rolling file under the
/// app data directory. The returned guard must be held for the process
/// lifetime or buffered file output is lost.
pub fn init() -> Result<(WorkerGuard, PathBuf)> {
    let log_dir = log_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let (file_writer, guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::daily(&log_dir, "nlip-agent.log"),
    );

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nlip_agent=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();

    tracing::debug!("Log directory: {}", log_dir.display());

    Ok((guard, log_dir))
}

fn log_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "nlip-agent", "nlip-agent")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;

    Ok(dirs.data_dir().join("logs"))
}
