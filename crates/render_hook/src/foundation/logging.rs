//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

use log::LevelFilter;

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system with an explicit default level
///
/// `RUST_LOG` still overrides individual modules. Calling this more than once
/// (for example once per loaded host module) is harmless.
pub fn init_with_level(level: LevelFilter) {
    let result = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();

    if result.is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}

/// Parse a level name such as `"info"` or `"trace"`, falling back to `Info`
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or_else(|_| {
        log::warn!("Unknown log level '{}', using 'info'", name);
        LevelFilter::Info
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), LevelFilter::Trace);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("loud"), LevelFilter::Info);
    }
}
