use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use priscilla_core::PriscillaConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured `loglevel`. An empty `logfile` (or
/// `stdout`) logs to stdout; anything else is appended to as a file.
pub fn init(config: &PriscillaConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&config.loglevel)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let logfile = config.logfile.trim();
    if logfile.is_empty() || logfile.eq_ignore_ascii_case("stdout") {
        builder.init();
        return Ok(());
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logfile)
        .with_context(|| format!("unable to open log file {logfile}"))?;
    builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    Ok(())
}

/// Map a configured level name to a filter directive. Unknown names fall back to `warn`.
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "error" | "fatal" => "error",
        "off" | "none" => "off",
        _ => "warn",
    }
}
