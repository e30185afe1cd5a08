//! A shared, manually advanced clock for deterministic fixture dates.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Virtual time shared between the platform double and creator wrappers.
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl VirtualClock {
    /// A clock frozen at `instant`.
    pub fn frozen_at(instant: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(instant)),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("virtual clock lock poisoned")
    }

    pub fn advance(&self, by: Duration) -> DateTime<Utc> {
        let mut now = self.now.lock().expect("virtual clock lock poisoned");
        *now += by;
        *now
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().expect("virtual clock lock poisoned") = instant;
    }
}
