//! File logging for the `ascan` binary
//!
//! stdout carries NDJSON, so every log line goes to a daily-rotated file.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable that overrides the log filter
pub const LOG_ENV_VAR: &str = "AUDIT_SCAN_LOG";

/// Environment variable that overrides the log directory
pub const LOG_DIR_ENV_VAR: &str = "AUDIT_SCAN_LOG_DIR";

const LOG_FILE_PREFIX: &str = "audit-scan.log";

const DEFAULT_FILTER: &str = "audit_scan=info,audit_scan_app=info,audit_scan_decoder=info,warn";

/// Install the global subscriber writing to `<log dir>/audit-scan.log.<date>`.
///
/// ```bash
/// AUDIT_SCAN_LOG=audit_scan_app=trace ascan session < lines.ndjson
/// AUDIT_SCAN_LOG_DIR=/tmp/ascan-logs ascan resolve property-42
/// ```
pub fn init() -> Result<()> {
    let log_dir = log_directory(std::env::var_os(LOG_DIR_ENV_VAR).map(PathBuf::from));
    std::fs::create_dir_all(&log_dir)?;

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(RollingFileAppender::new(
                    Rotation::DAILY,
                    &log_dir,
                    LOG_FILE_PREFIX,
                ))
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!(
        "ascan {} logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );
    Ok(())
}

/// `override_dir` if given, else `<data_local_dir>/audit-scan/logs`
fn log_directory(override_dir: Option<PathBuf>) -> PathBuf {
    override_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("audit-scan")
            .join("logs")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_override_wins() {
        let dir = PathBuf::from("/tmp/ascan-logs");
        assert_eq!(log_directory(Some(dir.clone())), dir);
    }

    #[test]
    fn test_default_log_directory() {
        assert!(log_directory(None).ends_with("audit-scan/logs"));
    }
}
