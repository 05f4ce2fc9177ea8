//! Time source for commit timestamps and age-based retention.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Shared time source; stores take one so tests can pin or advance time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Wall-clock time in UTC.
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
