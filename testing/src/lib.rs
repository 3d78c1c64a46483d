//! # Frontdesk Testing
//!
//! Test doubles and fixtures for the frontdesk engine.
//!
//! This crate provides:
//! - [`InMemoryBackend`]: a collaborator double with real pagination,
//!   lifecycle enforcement, call counters, and a response gate
//! - [`ScriptedFeed`]: an event feed driven by the test
//! - [`FixedClock`]: deterministic time
//! - [`fixtures`]: appointment builders and common values
//!
//! ## Example
//!
//! ```
//! use frontdesk_sync::SyncEngine;
//! use frontdesk_testing::{fixtures, InMemoryBackend, ScriptedFeed, test_clock};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend = InMemoryBackend::new(fixtures::date(2024, 3, 10));
//! backend.seed(fixtures::appointment("apt-1").build());
//!
//! let handle = SyncEngine::new(
//!     Arc::new(backend.clone()),
//!     ScriptedFeed::healthy(),
//!     fixtures::receptionist(),
//! )
//! .with_clock(Arc::new(test_clock()))
//! .spawn();
//! # handle.shutdown().await;
//! # }
//! ```

use chrono::{DateTime, Utc};
use frontdesk_core::Clock;

pub mod backend;
pub mod feed;
pub mod fixtures;

/// Mock implementations of engine dependencies.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests.
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use frontdesk_testing::mocks::FixedClock;
    /// use frontdesk_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// The default fixed clock (2024-03-10 10:00:00 UTC).
    ///
    /// The fixture builders schedule records on the same day, so a test
    /// using both gets "today" semantics without any setup.
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2024-03-10T10:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use backend::InMemoryBackend;
pub use feed::ScriptedFeed;
pub use mocks::{test_clock, FixedClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }
}
