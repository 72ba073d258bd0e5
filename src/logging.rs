//! Logger setup.

use crate::config::LogLevel;

/// Install an `env_logger` filtered at `level`.
///
/// `RUST_LOG` still overrides the level for individual modules. Calling this
/// more than once is harmless; later calls are ignored.
pub fn init(level: LogLevel) {
    let result = env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();

    match result {
        Ok(()) => log::debug!("Logging initialized at {}", level.name()),
        Err(_) => log::trace!("Logger already installed"),
    }
}
