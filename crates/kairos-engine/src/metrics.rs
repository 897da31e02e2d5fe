//! Cumulative world counters.
//!
//! [`WorldMetrics`] is a plain snapshot of the atomic counters the world
//! bumps while ticking. Counters survive [`World::clear`](crate::World::clear).

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of cumulative world counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldMetrics {
    /// Completed ticks.
    pub ticks: u64,
    /// Synchronous impacts performed.
    pub sync_impacts: u64,
    /// Asynchronous impacts performed.
    pub async_impacts: u64,
    /// Dynamic entity `tick()` calls.
    pub entity_ticks: u64,
    /// Entities whose `adjust()` committed at least one row.
    pub commits: u64,
    /// Dynamic membership re-evaluations.
    pub respawns: u64,
    /// Transitions into the desync state.
    pub desync_events: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub ticks: AtomicU64,
    pub sync_impacts: AtomicU64,
    pub async_impacts: AtomicU64,
    pub entity_ticks: AtomicU64,
    pub commits: AtomicU64,
    pub respawns: AtomicU64,
    pub desync_events: AtomicU64,
}

impl Counters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WorldMetrics {
        WorldMetrics {
            ticks: self.ticks.load(Ordering::Relaxed),
            sync_impacts: self.sync_impacts.load(Ordering::Relaxed),
            async_impacts: self.async_impacts.load(Ordering::Relaxed),
            entity_ticks: self.entity_ticks.load(Ordering::Relaxed),
            commits: self.commits.load(Ordering::Relaxed),
            respawns: self.respawns.load(Ordering::Relaxed),
            desync_events: self.desync_events.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        assert_eq!(Counters::default().snapshot(), WorldMetrics::default());
    }

    #[test]
    fn bump_is_visible_in_snapshot() {
        let c = Counters::default();
        Counters::bump(&c.ticks);
        Counters::bump(&c.ticks);
        Counters::bump(&c.desync_events);
        let m = c.snapshot();
        assert_eq!(m.ticks, 2);
        assert_eq!(m.desync_events, 1);
        assert_eq!(m.sync_impacts, 0);
    }
}
