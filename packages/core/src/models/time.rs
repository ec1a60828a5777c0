//! Time Provider Abstraction
//!
//! Provides a trait-based abstraction for the clock used to stamp version
//! records, creation/change timestamps and repository checkpoints, so those
//! can be tested deterministically.
//!
//! # Examples
//!
//! ```rust
//! use docmapper_core::models::time::{MockTimeProvider, TimeProvider};
//! use chrono::{Duration, TimeZone, Utc};
//! use std::sync::Arc;
//!
//! let clock = Arc::new(MockTimeProvider::with_time(
//!     Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
//! ));
//! let shared: Arc<dyn TimeProvider> = clock.clone();
//!
//! clock.advance(Duration::hours(1));
//! assert_eq!(shared.now(), Utc.with_ymd_and_hms(2026, 1, 1, 13, 0, 0).unwrap());
//! ```

use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// Trait for providing current time
///
/// Implemented by `SystemTimeProvider` in production and by
/// `MockTimeProvider` wherever `authored`, `created` or `changed` values are
/// asserted on.
pub trait TimeProvider: Send + Sync {
    /// Get the current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// System time provider using actual system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
///
/// Uses interior mutability so one instance can be handed to a document
/// manager (behind an `Arc`) and still be moved forward by the test.
#[derive(Debug)]
pub struct MockTimeProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl MockTimeProvider {
    /// Create a new mock time provider starting at the current time
    pub fn new() -> Self {
        Self::with_time(Utc::now())
    }

    /// Create a mock time provider with a specific starting time
    pub fn with_time(time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(time),
        }
    }

    /// Set the current time to a specific value
    pub fn set_time(&self, time: DateTime<Utc>) {
        match self.current_time.write() {
            Ok(mut current) => *current = time,
            Err(poisoned) => *poisoned.into_inner() = time,
        }
    }

    /// Advance time by the given duration
    pub fn advance(&self, duration: chrono::Duration) {
        let next = self.now() + duration;
        self.set_time(next);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        match self.current_time.read() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl Default for MockTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}
