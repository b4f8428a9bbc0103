//! Deterministic clock for tests.

use chrono::{DateTime, Utc};
use comments_core::clock::Clock;

/// Fixed clock that always returns the same time.
///
/// # Example
///
/// ```
/// use comments_testing::FixedClock;
/// use comments_core::clock::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time.
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }

    /// Default fixed clock for tests (2026-01-01 00:00:00 UTC).
    #[must_use]
    pub fn test_clock() -> Self {
        Self::new(
            DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        )
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}
