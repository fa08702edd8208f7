/// Panics in debug builds with a "DEBUG PANIC: " prefix, logs an error in release builds.
///
/// Use this for states that are bugs on our side, but that we can recover from in production.
///
/// We use `if cfg!(…)` instead of `#[cfg(…)]` so that the code is still
/// compiled in release builds, to avoid unused variable warnings.
#[macro_export]
macro_rules! debug_panic {
    ($($arg:tt)+) => {
        if cfg!(debug_assertions) {
            ::core::panic!("DEBUG PANIC: {}", ::core::format_args!($($arg)+));
        } else {
            $crate::error!($($arg)+);
        }
    };
}
