//! Common traits for Lapse.
//!
//! The cache never calls `Instant::now()` directly; it reads time through
//! [`Clock`] so that expiration can be driven deterministically in tests.

use std::sync::Arc;
use std::time::Instant;

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of the current instant.
///
/// Implementations must be monotonic: successive calls never go backwards.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn elapsed_through(clock: &dyn Clock, start: Instant) -> Duration {
        clock.now() - start
    }

    #[test]
    fn test_clock_through_pointers() {
        let manual = ManualClock::new();
        let start = manual.now();
        manual.advance(Duration::from_secs(3));

        let shared: Arc<ManualClock> = Arc::new(manual.clone());
        let boxed: Box<dyn Clock> = Box::new(manual.clone());

        assert_eq!(elapsed_through(&shared, start), Duration::from_secs(3));
        assert_eq!(elapsed_through(&boxed, start), Duration::from_secs(3));
        assert_eq!(elapsed_through(&&manual, start), Duration::from_secs(3));
    }
}
