use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Time source for refresh and autosave schedules.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }
}

/// True when `interval` has elapsed since `last`, or nothing ran yet.
pub fn is_due(last: Option<DateTime<Utc>>, now: DateTime<Utc>, interval: std::time::Duration) -> bool {
    match last {
        None => true,
        Some(last) => {
            let interval = Duration::from_std(interval).unwrap_or_else(|_| Duration::days(36_500));
            now - last >= interval
        }
    }
}
