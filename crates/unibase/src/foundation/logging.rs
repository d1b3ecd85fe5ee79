//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    // A second init (tests, embedding hosts) keeps the first logger.
    let _ = env_logger::try_init();
}

/// Initialize the logging system with an explicit filter string
///
/// `level` uses the `env_logger` filter syntax, e.g. `"info"` or
/// `"unibase::scene=debug,warn"`. `RUST_LOG` still overrides it when set.
pub fn init_with_level(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(level);
    if let Ok(env_filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&env_filters);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized, ignoring level '{}'", level);
    }
}
