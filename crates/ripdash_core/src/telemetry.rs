use std::time::Duration;

/// A telemetry value together with the time it was last written.
///
/// Staleness is judged by whoever reads the value, against the reader's
/// notion of "now".
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    value: T,
    updated_at: Duration,
}

impl<T> Stamped<T> {
    pub fn new(value: T, updated_at: Duration) -> Self {
        Self { value, updated_at }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn updated_at(&self) -> Duration {
        self.updated_at
    }

    pub fn age(&self, now: Duration) -> Duration {
        now.saturating_sub(self.updated_at)
    }

    /// The value, if it is no older than `max_age` at `now`.
    pub fn fresh(&self, now: Duration, max_age: Duration) -> Option<&T> {
        (self.age(now) <= max_age).then_some(&self.value)
    }
}
