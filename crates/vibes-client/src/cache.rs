//! Two-phase local state: the last confirmed server snapshot plus optimistic
//! patches applied on top of it.
//!
//! A reload replaces the snapshot and drops every pending patch, so the server
//! always wins a conflict.

use chrono::{DateTime, Utc};

use crate::clock::is_due;

/// A local edit that can be replayed over a snapshot.
pub trait Patch<T> {
    fn apply(&self, value: &mut T);
}

#[derive(Debug, Clone)]
pub struct OptimisticCache<T, P> {
    confirmed: Option<T>,
    fetched_at: Option<DateTime<Utc>>,
    pending: Vec<P>,
}

impl<T, P> Default for OptimisticCache<T, P> {
    fn default() -> Self {
        Self {
            confirmed: None,
            fetched_at: None,
            pending: Vec::new(),
        }
    }
}

impl<T: Clone, P: Patch<T>> OptimisticCache<T, P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the UI shows: the snapshot with pending patches applied in order.
    pub fn view(&self) -> Option<T> {
        let mut value = self.confirmed.clone()?;
        for patch in &self.pending {
            patch.apply(&mut value);
        }
        Some(value)
    }

    pub fn confirmed(&self) -> Option<&T> {
        self.confirmed.as_ref()
    }

    pub fn push(&mut self, patch: P) {
        self.pending.push(patch);
    }

    /// Install a fresh server snapshot.
    pub fn confirm(&mut self, value: T, at: DateTime<Utc>) {
        self.confirmed = Some(value);
        self.fetched_at = Some(at);
        self.pending.clear();
    }

    pub fn is_due(&self, now: DateTime<Utc>, interval: std::time::Duration) -> bool {
        is_due(self.fetched_at, now, interval)
    }
}
