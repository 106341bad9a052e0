//! Logging setup on top of `env_logger`

pub use log::{debug, error, info, trace, warn};

/// Initialize logging with a fallback level used when `RUST_LOG` is unset.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_level(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_ignored() {
        init_with_level("warn");
        init_with_level("debug");
        log::warn!("logger still usable after a second init");
    }
}
