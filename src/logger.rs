//! Centralized logging configuration for apex-dynamics drivers and tests
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! left to the executable that drives the relation builder or the solver.

use tracing::Level;

/// Initialize the tracing subscriber with apex-dynamics' standard configuration
///
/// Default log level: INFO (overrideable via RUST_LOG)
///
/// # Example
/// ```no_run
/// use apex_dynamics::init_logger;
///
/// init_logger();
/// tracing::info!("Dynamics driver started");
/// ```
///
/// # Environment Variables
/// ```bash
/// RUST_LOG=apex_dynamics=debug cargo test
/// RUST_LOG=apex_dynamics::linalg=trace cargo test
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Initialize the tracing subscriber with a custom default level
///
/// Calling it more than once is harmless: later calls leave the first
/// subscriber in place.
///
/// # Arguments
/// * `default_level` - The default log level (overrideable via RUST_LOG)
pub fn init_logger_with_level(default_level: Level) {
    use tracing_subscriber::fmt::time::SystemTime;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_timer(SystemTime)
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice_does_not_panic() {
        init_logger_with_level(Level::DEBUG);
        init_logger();
        tracing::debug!("logger initialised");
    }
}
