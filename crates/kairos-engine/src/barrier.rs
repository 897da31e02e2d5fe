//! Reusable phase barrier with a leader closure.
//!
//! Every party calls [`PhaseBarrier::sync`] with a closure. The last
//! party to arrive runs its closure exactly once; the result is handed
//! to every party, so decisions taken by the leader are seen identically
//! by all workers.

use parking_lot::{Condvar, Mutex};

struct Round<T> {
    arrived: usize,
    generation: u64,
    verdict: T,
}

/// A barrier for a fixed number of parties, reusable across phases.
pub struct PhaseBarrier<T> {
    parties: usize,
    round: Mutex<Round<T>>,
    released: Condvar,
}

impl<T: Clone + Default> PhaseBarrier<T> {
    /// A barrier for `parties` threads (at least one).
    pub fn new(parties: usize) -> Self {
        Self {
            parties: parties.max(1),
            round: Mutex::new(Round {
                arrived: 0,
                generation: 0,
                verdict: T::default(),
            }),
            released: Condvar::new(),
        }
    }

    /// Number of parties.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Wait for every party. The last arrival runs `leader`; everyone
    /// returns its result.
    ///
    /// A waiter reads the verdict before it can arrive at the next
    /// round, and the next leader only runs once all parties have
    /// arrived again, so a verdict is never overwritten early.
    pub fn sync(&self, leader: impl FnOnce() -> T) -> T {
        let mut round = self.round.lock();
        round.arrived += 1;
        if round.arrived == self.parties {
            // Every other party is parked below; run unlocked.
            let verdict = parking_lot::MutexGuard::unlocked(&mut round, leader);
            round.arrived = 0;
            round.generation = round.generation.wrapping_add(1);
            round.verdict = verdict.clone();
            self.released.notify_all();
            return verdict;
        }
        let generation = round.generation;
        while round.generation == generation {
            self.released.wait(&mut round);
        }
        round.verdict.clone()
    }
}
