//! The interface the solver drives.

use kairos_engine::{SharedImpact, World};

/// Something that can be reset, seeded, fed impacts, and ticked.
///
/// [`World`] is the production implementation; tests substitute
/// recorders to observe the exact call sequence.
pub trait Timeline {
    /// Return to an empty state at time 0.
    fn reset(&mut self);

    /// Reset the random engine.
    fn seed(&mut self, seed: u64);

    /// Queue an impact for the next tick.
    fn queue(&mut self, impact: SharedImpact);

    /// Run `delta` ticks and wait for them.
    fn tick(&mut self, delta: u64);

    /// Start `delta` ticks without waiting.
    fn schedule(&mut self, delta: u64);

    /// Wait for scheduled ticks.
    fn join(&mut self);
}

impl Timeline for World {
    fn reset(&mut self) {
        World::join(self);
        self.clear();
    }

    fn seed(&mut self, seed: u64) {
        self.reseed(seed);
    }

    fn queue(&mut self, impact: SharedImpact) {
        self.queue_shared(impact);
    }

    fn tick(&mut self, delta: u64) {
        World::tick(self, delta);
    }

    fn schedule(&mut self, delta: u64) {
        World::schedule(self, delta);
    }

    fn join(&mut self) {
        World::join(self);
    }
}
