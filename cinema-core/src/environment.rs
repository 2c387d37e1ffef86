//! Time abstraction injected into the coordinator for its own
//! timestamped log lines, so tests can swap in a fixed clock instead
//! of asserting against wall-clock time.

use chrono::{DateTime, Utc};

/// Abstracts time so reservation timestamps are testable.
///
/// # Examples
///
/// ```ignore
/// struct FixedClock(DateTime<Utc>);
/// impl Clock for FixedClock {
///     fn now(&self) -> DateTime<Utc> {
///         self.0
///     }
/// }
/// ```
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
