//! Time-sorted impact history with rewind-and-replay.
//!
//! ```text
//! history: [ t=0 | t=2 | t=2 | t=5 | t=9 ]
//!                         ^ position        time = 4
//! ```
//!
//! Everything before `position` has been queued into the timeline;
//! everything from `position` on is still in the future. Advancing to a
//! target time queues each pending impact when the timeline reaches its
//! timestamp, ticking through the gaps in between.

use std::fmt;
use std::sync::Arc;

use kairos_core::Time;
use kairos_engine::{Impact, SharedImpact, World};

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::timeline::Timeline;

/// Turns an encoded impact into an impact object.
pub type Decoder = Box<dyn Fn(&[u8]) -> Option<Box<dyn Impact>> + Send + Sync>;

fn time_of(impact: &SharedImpact) -> Time {
    impact.time().unwrap_or(0)
}

/// Drives a [`Timeline`] through a sorted history of impacts.
pub struct Solver<T: Timeline = World> {
    world: Option<T>,
    history: Vec<SharedImpact>,
    time: Time,
    position: usize,
    seed: u64,
    allow_rewind: bool,
    decoder: Option<Decoder>,
}

impl<T: Timeline> Solver<T> {
    /// A solver with an empty history and no timeline attached.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            world: None,
            history: Vec::new(),
            time: 0,
            position: 0,
            seed: config.seed,
            allow_rewind: config.allow_rewind,
            decoder: None,
        }
    }

    /// A solver driving `world` from time 0.
    pub fn with_world(config: SolverConfig, world: T) -> Self {
        let mut solver = Self::new(config);
        solver.attach(world);
        solver
    }

    // ── timeline ───────────────────────────────────────────────────

    /// Attach `world`, resetting it and replaying history up to the
    /// current time. Returns the previously attached timeline.
    pub fn attach(&mut self, world: T) -> Option<T> {
        let previous = self.world.replace(world);
        let now = self.time;
        if let Some(world) = self.world.as_mut() {
            world.reset();
        }
        self.time = 0;
        self.position = 0;
        self.rewind_to(now);
        previous
    }

    /// Detach and return the timeline. History and time are kept.
    pub fn detach(&mut self) -> Option<T> {
        if let Some(world) = self.world.as_mut() {
            world.join();
        }
        self.world.take()
    }

    /// The attached timeline.
    pub fn world(&self) -> Option<&T> {
        self.world.as_ref()
    }

    /// The attached timeline, mutably.
    pub fn world_mut(&mut self) -> Option<&mut T> {
        self.world.as_mut()
    }

    // ── history ────────────────────────────────────────────────────

    /// Insert `impact` into the history.
    ///
    /// An unstamped impact is stamped with the current time. An impact
    /// stamped in the past rewinds and replays the timeline when rewind
    /// is allowed, and is dropped with [`SolverError::RewindDisallowed`]
    /// otherwise.
    pub fn apply(&mut self, impact: impl Impact) -> Result<(), SolverError> {
        self.apply_boxed(Box::new(impact))
    }

    /// [`apply`](Self::apply) for an already boxed impact.
    pub fn apply_boxed(&mut self, mut impact: Box<dyn Impact>) -> Result<(), SolverError> {
        let time = match impact.time() {
            Some(time) => time,
            None => {
                impact.set_time(self.time);
                self.time
            }
        };
        let impact: SharedImpact = Arc::from(impact);

        if time >= self.time {
            self.insert(impact, time);
            return Ok(());
        }

        if !self.allow_rewind {
            tracing::error!(
                name = impact.name(),
                impact_time = time,
                current_time = self.time,
                "impact predates current time, dropped"
            );
            return Err(SolverError::RewindDisallowed {
                impact_time: time,
                current_time: self.time,
            });
        }

        let now = self.time;
        tracing::debug!(impact_time = time, current_time = now, "rewinding for late impact");
        self.rewind_to(time);
        self.insert(impact, time);
        self.rewind_to(now);
        Ok(())
    }

    /// Decode `bytes` with the installed decoder and apply the result.
    pub fn apply_encoded(&mut self, bytes: &[u8]) -> Result<(), SolverError> {
        let decoder = self.decoder.as_ref().ok_or(SolverError::NoDecoder)?;
        let impact = decoder(bytes).ok_or(SolverError::DecodeFailed { len: bytes.len() })?;
        self.apply_boxed(impact)
    }

    /// Install the decoder used by [`apply_encoded`](Self::apply_encoded).
    pub fn set_decoder(
        &mut self,
        decoder: impl Fn(&[u8]) -> Option<Box<dyn Impact>> + Send + Sync + 'static,
    ) {
        self.decoder = Some(Box::new(decoder));
    }

    /// Number of impacts in the history.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The impact at `index` in time order.
    pub fn history(&self, index: usize) -> Option<&SharedImpact> {
        self.history.get(index)
    }

    /// Forget every impact. Time is kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.position = 0;
    }

    fn insert(&mut self, impact: SharedImpact, time: Time) {
        // Equal times keep arrival order.
        let pending = &self.history[self.position..];
        let at = self.position + pending.partition_point(|queued| time_of(queued) <= time);
        self.history.insert(at, impact);
    }

    // ── time ───────────────────────────────────────────────────────

    /// Current time.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Number of history entries already queued into the timeline.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Advance by `delta` ticks without waiting for the timeline.
    pub fn schedule(&mut self, delta: u64) {
        if delta == 0 {
            return;
        }
        self.adjust(self.time.saturating_add(delta));
    }

    /// Advance by `delta` ticks and wait.
    pub fn solve(&mut self, delta: u64) {
        self.schedule(delta);
        self.join();
    }

    /// Wait for the timeline to finish scheduled ticks.
    pub fn join(&mut self) {
        if let Some(world) = self.world.as_mut() {
            world.join();
        }
    }

    /// Move to `time`, replaying from 0 when it lies in the past, and
    /// wait.
    pub fn rewind_to(&mut self, time: Time) {
        self.adjust(time);
        self.join();
    }

    /// Move the timeline to `target`.
    ///
    /// Bookkeeping advances even with no timeline attached.
    pub fn adjust(&mut self, target: Time) {
        if target < self.time {
            if let Some(world) = self.world.as_mut() {
                world.reset();
            }
            self.time = 0;
            self.position = 0;
        }
        if self.time == 0 && target > 0 {
            if let Some(world) = self.world.as_mut() {
                world.seed(self.seed);
            }
        }

        let mut joined = false;
        while let Some(impact) = self.history.get(self.position) {
            let at = time_of(impact);
            if at >= target {
                break;
            }
            if let Some(world) = self.world.as_mut() {
                if at > self.time {
                    world.tick(at - self.time);
                    joined = true;
                }
                if !joined {
                    world.join();
                    joined = true;
                }
                world.queue(Arc::clone(impact));
            }
            self.time = self.time.max(at);
            self.position += 1;
        }

        if target > self.time {
            if let Some(world) = self.world.as_mut() {
                world.schedule(target - self.time);
            }
            self.time = target;
        }
    }

    // ── seed ───────────────────────────────────────────────────────

    /// Seed applied whenever the timeline leaves time 0.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Replace the seed. Takes effect at the next replay from 0.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Draw a fresh seed from the thread RNG, store it, and return it.
    pub fn generate_seed(&mut self) -> u64 {
        self.seed = rand::random();
        self.seed
    }

    /// Accept or refuse impacts stamped in the past.
    pub fn allow_rewind(&mut self, allow: bool) {
        self.allow_rewind = allow;
    }

    /// Whether impacts stamped in the past trigger a rewind.
    pub fn is_rewind_allowed(&self) -> bool {
        self.allow_rewind
    }
}

impl<T: Timeline> Default for Solver<T> {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl<T: Timeline> fmt::Debug for Solver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("time", &self.time)
            .field("position", &self.position)
            .field("history_len", &self.history.len())
            .field("seed", &self.seed)
            .field("allow_rewind", &self.allow_rewind)
            .field("attached", &self.world.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::ImpactMeta;
    use kairos_engine::WorldAccess;

    /// Calls a solver made on its timeline.
    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Call {
        Reset,
        Seed(u64),
        Queue(u32),
        Tick(u64),
        Schedule(u64),
        Join,
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl Timeline for Recorder {
        fn reset(&mut self) {
            self.calls.push(Call::Reset);
        }
        fn seed(&mut self, seed: u64) {
            self.calls.push(Call::Seed(seed));
        }
        fn queue(&mut self, impact: SharedImpact) {
            let tag = impact.actor().map_or(u32::MAX, |a| a.0);
            self.calls.push(Call::Queue(tag));
        }
        fn tick(&mut self, delta: u64) {
            self.calls.push(Call::Tick(delta));
        }
        fn schedule(&mut self, delta: u64) {
            self.calls.push(Call::Schedule(delta));
        }
        fn join(&mut self) {
            self.calls.push(Call::Join);
        }
    }

    /// An impact identified by its actor id.
    struct Marker {
        meta: ImpactMeta,
    }

    impl Marker {
        fn new(tag: u32, time: Option<Time>) -> Self {
            let mut meta = ImpactMeta::sync().with_actor(kairos_core::EntityId(tag));
            meta.time = time;
            Self { meta }
        }
    }

    impl Impact for Marker {
        fn meta(&self) -> &ImpactMeta {
            &self.meta
        }
        fn meta_mut(&mut self) -> &mut ImpactMeta {
            &mut self.meta
        }
        fn perform(&self, _world: &WorldAccess<'_>) {}
    }

    fn solver(rewind: bool) -> Solver<Recorder> {
        let config = SolverConfig::default().with_seed(7).with_rewind(rewind);
        let mut s = Solver::with_world(config, Recorder::default());
        s.world_mut().unwrap().calls.clear();
        s
    }

    fn calls(s: &mut Solver<Recorder>) -> Vec<Call> {
        std::mem::take(&mut s.world_mut().unwrap().calls)
    }

    fn times(s: &Solver<Recorder>) -> Vec<Time> {
        (0..s.history_len())
            .map(|i| s.history(i).unwrap().time().unwrap())
            .collect()
    }

    // ── history ────────────────────────────────────────────────────

    #[test]
    fn unstamped_impacts_get_current_time() {
        let mut s = solver(false);
        s.solve(4);
        s.apply(Marker::new(1, None)).unwrap();
        assert_eq!(s.history(0).unwrap().time(), Some(4));
    }

    #[test]
    fn history_is_time_sorted_and_stable() {
        let mut s = solver(false);
        s.apply(Marker::new(1, Some(5))).unwrap();
        s.apply(Marker::new(2, Some(2))).unwrap();
        s.apply(Marker::new(3, Some(5))).unwrap();
        s.apply(Marker::new(4, Some(0))).unwrap();
        assert_eq!(times(&s), vec![0, 2, 5, 5]);
        let tags: Vec<_> = (0..4)
            .map(|i| s.history(i).unwrap().actor().unwrap().0)
            .collect();
        assert_eq!(tags, vec![4, 2, 1, 3]);
    }

    #[test]
    fn past_impact_without_rewind_is_dropped() {
        let mut s = solver(false);
        s.solve(10);
        let err = s.apply(Marker::new(1, Some(3))).unwrap_err();
        assert_eq!(
            err,
            SolverError::RewindDisallowed {
                impact_time: 3,
                current_time: 10
            }
        );
        assert_eq!(s.history_len(), 0);
        assert!(!s.is_rewind_allowed());
    }

    // ── timeline calls ─────────────────────────────────────────────

    #[test]
    fn advance_seeds_then_queues_at_each_timestamp() {
        let mut s = solver(false);
        s.apply(Marker::new(1, Some(0))).unwrap();
        s.apply(Marker::new(2, Some(3))).unwrap();
        s.apply(Marker::new(3, Some(3))).unwrap();
        s.solve(10);
        assert_eq!(
            calls(&mut s),
            vec![
                Call::Seed(7),
                Call::Join,
                Call::Queue(1),
                Call::Tick(3),
                Call::Queue(2),
                Call::Queue(3),
                Call::Schedule(7),
                Call::Join,
            ]
        );
        assert_eq!(s.time(), 10);
        assert_eq!(s.position(), 3);
    }

    #[test]
    fn impacts_at_target_wait_for_next_advance() {
        let mut s = solver(false);
        s.apply(Marker::new(1, Some(5))).unwrap();
        s.solve(5);
        assert_eq!(calls(&mut s), vec![Call::Seed(7), Call::Schedule(5), Call::Join]);
        s.solve(1);
        assert_eq!(
            calls(&mut s),
            vec![Call::Join, Call::Queue(1), Call::Schedule(1), Call::Join]
        );
    }

    #[test]
    fn zero_delta_schedule_does_nothing() {
        let mut s = solver(false);
        s.schedule(0);
        assert!(calls(&mut s).is_empty());
        assert_eq!(s.time(), 0);
    }

    #[test]
    fn late_impact_rewinds_and_replays() {
        let mut s = solver(true);
        s.apply(Marker::new(1, Some(5))).unwrap();
        s.solve(10);
        calls(&mut s);

        s.apply(Marker::new(2, Some(2))).unwrap();
        assert_eq!(
            calls(&mut s),
            vec![
                // back to 2
                Call::Reset,
                Call::Seed(7),
                Call::Schedule(2),
                Call::Join,
                // forward to 10
                Call::Join,
                Call::Queue(2),
                Call::Tick(3),
                Call::Queue(1),
                Call::Schedule(5),
                Call::Join,
            ]
        );
        assert_eq!(s.time(), 10);
        assert_eq!(times(&s), vec![2, 5]);
    }

    #[test]
    fn rewind_to_zero_resets_without_seeding() {
        let mut s = solver(true);
        s.solve(3);
        calls(&mut s);
        s.rewind_to(0);
        assert_eq!(calls(&mut s), vec![Call::Reset, Call::Join]);
        assert_eq!(s.time(), 0);
    }

    #[test]
    fn detached_solver_keeps_bookkeeping() {
        let mut s: Solver<Recorder> = Solver::new(SolverConfig::default());
        s.apply(Marker::new(1, Some(1))).unwrap();
        s.solve(4);
        assert_eq!(s.time(), 4);
        assert_eq!(s.position(), 1);
        assert!(s.world().is_none());

        s.attach(Recorder::default());
        let replay = calls(&mut s);
        assert_eq!(replay.first(), Some(&Call::Reset));
        assert!(replay.contains(&Call::Queue(1)));
        assert_eq!(s.time(), 4);
    }

    // ── decoder ────────────────────────────────────────────────────

    #[test]
    fn encoded_impacts_go_through_the_decoder() {
        let mut s = solver(false);
        assert_eq!(s.apply_encoded(&[1]), Err(SolverError::NoDecoder));

        s.set_decoder(|bytes| {
            let tag = *bytes.first()?;
            Some(Box::new(Marker::new(u32::from(tag), Some(1))) as Box<dyn Impact>)
        });
        assert_eq!(s.apply_encoded(&[]), Err(SolverError::DecodeFailed { len: 0 }));
        s.apply_encoded(&[9]).unwrap();
        assert_eq!(s.history(0).unwrap().actor().unwrap().0, 9);
    }

    #[test]
    fn generated_seed_is_used_on_replay() {
        let mut s = solver(false);
        let seed = s.generate_seed();
        assert_eq!(s.seed(), seed);
        s.solve(1);
        assert_eq!(calls(&mut s)[0], Call::Seed(seed));
    }
}
