//! Logging setup and configuration

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_NAME: &str = "atomic-arb.log";

pub struct LoggingGuard {
    pub _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Console layer plus an hourly rolling file under `<output_dir>/logs`.
pub fn setup_logging(output_dir: &str) -> Result<Arc<LoggingGuard>> {
    let log_dir = Path::new(output_dir).join("logs");
    let file_appender = tracing_appender::rolling::hourly(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_ansi(true)
                .with_level(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_level(true)
                .with_ansi(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    Ok(Arc::new(LoggingGuard { _guard: guard }))
}

pub fn setup_output_directories(output_dir: &str) -> Result<()> {
    use std::fs;

    let root = Path::new(output_dir);
    fs::create_dir_all(root.join("logs"))?;
    fs::create_dir_all(root.join("settlements"))?;
    fs::create_dir_all(root.join("rejections"))?;

    Ok(())
}
