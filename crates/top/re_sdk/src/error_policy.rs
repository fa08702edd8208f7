use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What to do with a usage or conversion error while logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Return the error to the caller.
    Strict,

    /// Turn the error into a warning, both in the process log and in the recording itself,
    /// and carry on with whatever data survived.
    #[default]
    Lenient,
}

impl ErrorPolicy {
    #[inline]
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }

    #[inline]
    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

/// Restores the previous default error policy of a [`crate::RecordingStream`] when dropped.
///
/// See [`crate::RecordingStream::strict_mode_scope`].
#[must_use = "strict mode is restored as soon as the guard is dropped"]
pub struct StrictModeGuard {
    strict: Arc<AtomicBool>,
    previous: bool,
}

impl StrictModeGuard {
    pub(crate) fn new(strict: Arc<AtomicBool>, enabled: bool) -> Self {
        let previous = strict.swap(enabled, Ordering::Relaxed);
        Self { strict, previous }
    }
}

impl Drop for StrictModeGuard {
    fn drop(&mut self) {
        self.strict.store(self.previous, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_previous_value() {
        let strict = Arc::new(AtomicBool::new(false));
        {
            let _outer = StrictModeGuard::new(strict.clone(), true);
            assert!(strict.load(Ordering::Relaxed));
            {
                let _inner = StrictModeGuard::new(strict.clone(), false);
                assert!(!strict.load(Ordering::Relaxed));
            }
            assert!(strict.load(Ordering::Relaxed));
        }
        assert!(!strict.load(Ordering::Relaxed));

        assert!(ErrorPolicy::from_strict(true).is_strict());
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::Lenient);
    }
}
