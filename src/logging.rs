use std::path::Path;

use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, fmt::time::UtcTime, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "HOMEBOX_LOG";
const DEFAULT_FILTER: &str = "homebox=info,sqlx=warn";
const LOG_FILE_PREFIX: &str = "homebox.log";

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the JSON subscriber on stderr, plus a daily rolling file sink
/// under `log_dir` when one is given. Calling it again is a no-op.
pub fn init_logging(log_dir: Option<&Path>) {
    let _ = tracing_log::LogTracer::init();

    let file_layer = log_dir.and_then(|dir| {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("homebox: cannot create log dir {}: {err}", dir.display());
            return None;
        }
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        // A second init keeps the first guard; the new writer is dropped with the layer.
        let _ = FILE_GUARD.set(guard);
        Some(
            fmt::layer()
                .json()
                .with_target(true)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(writer),
        )
    });

    let stderr_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}
