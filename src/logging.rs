// Tracing setup
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. Progress and diagnostics go to stderr so
/// CSV summaries on stdout stay machine-readable.
pub fn init(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", level, e))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}
