use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Sends tracing output to a daily rotated file under the platform data
/// directory. The terminal belongs to the UI, so there is no console layer.
///
/// `RUST_LOG` overrides the default `info` level, e.g.
/// `RUST_LOG=appdeck::controller=debug appdeck`.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the whole run.
pub fn init_logging() -> (tracing_appender::non_blocking::WorkerGuard, PathBuf) {
    let log_dir = directories::ProjectDirs::from("com", "appdeck", "appdeck")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "Warning: Failed to create log directory at {}: {}",
            log_dir.display(),
            e
        );
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "appdeck.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    (guard, log_dir)
}
