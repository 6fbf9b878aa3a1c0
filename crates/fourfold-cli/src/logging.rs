use anyhow::Context as _;
use flexi_logger::{Logger, LoggerHandle, opt_format};

/// Starts logging to stderr.
///
/// `RUST_LOG` takes precedence over `level`. The returned handle must be kept
/// alive for as long as logging is needed.
pub(crate) fn init(level: &str) -> anyhow::Result<LoggerHandle> {
    Logger::try_with_env_or_str(level)
        .with_context(|| format!("Invalid log specification: {level}"))?
        .log_to_stderr()
        .format(opt_format)
        .start()
        .context("Failed to start logger")
}
