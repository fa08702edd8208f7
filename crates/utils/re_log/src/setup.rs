//! Function to setup logging in binaries and tests.

/// The filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,re_sdk=debug"
    } else {
        "info"
    }
}

/// Installs `env_logger` as the global logger, honoring `RUST_LOG` if set.
///
/// Calling this more than once is harmless: only the first call installs anything.
pub fn setup_logging() {
    let env = env_logger::Env::default().default_filter_or(default_log_filter());
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .ok();
}
