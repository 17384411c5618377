//! Diagnostics go to stderr; stdout carries only results.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SUNFETCH_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Filter precedence: explicit option, then `SUNFETCH_LOG`, then warnings only.
pub fn build_filter(explicit: Option<&str>) -> Result<EnvFilter, String> {
    match explicit {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| format!("Invalid log filter {:?}: {}", directives, e)),
        None => Ok(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        ),
    }
}

pub fn init(explicit: Option<&str>) -> Result<(), String> {
    let filter = build_filter(explicit)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| format!("Cannot initialize logging: {}", e))
}
