//! Log output setup
//!
//! The library only emits `tracing` events; embedders that want to see them
//! call [`init_logging`] once at startup (or install their own subscriber).

use tracing_subscriber::EnvFilter;

/// Map a verbosity count (0..=3, as from repeated `-v` flags) to a level
pub fn level_for(verbosity: u8) -> tracing::Level {
    match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }
}

/// Install a formatted stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbosity` picks the level. Safe to
/// call more than once, later calls are no-ops. Returns whether this call
/// installed the subscriber.
pub fn init_logging(verbosity: u8) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity).to_string().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes through the test harness capture
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .with_test_writer()
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(0), tracing::Level::WARN);
        assert_eq!(level_for(1), tracing::Level::INFO);
        assert_eq!(level_for(2), tracing::Level::DEBUG);
        assert_eq!(level_for(9), tracing::Level::TRACE);
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_test_logging();
        assert!(!init_logging(3));
    }
}
