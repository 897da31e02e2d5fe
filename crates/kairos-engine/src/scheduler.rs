//! Worker pool driving the four-phase tick protocol.
//!
//! Each tick pass runs, on every worker:
//!
//! ```text
//! ┌─> barrier: leader drains the sync queue ── queues empty? ──┐
//! │   all workers drain the async queue                         │
//! └── barrier: leader cleans the async queue                    │
//!     all workers tick due dynamic entities  <──────────────────┘
//!     barrier: leader resets cursors
//!     all workers adjust every live entity
//!     barrier: leader resets cursors and retires the tick
//! ```
//!
//! Every phase decision is taken by the barrier leader and returned to
//! all workers as a [`Flow`], so no two workers can disagree about
//! whether to drain again, proceed, or stop. Workers idle on a condition
//! variable between passes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::barrier::PhaseBarrier;
use crate::world::WorldCore;

/// Verdict of a barrier leader.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Stay in the current loop.
    #[default]
    Continue,
    /// Move on to the next phase.
    Proceed,
    /// Shut down.
    Stop,
}

struct Control {
    pending: u64,
    done: bool,
    running: usize,
}

struct Shared {
    core: Arc<WorldCore>,
    barrier: PhaseBarrier<Flow>,
    control: Mutex<Control>,
    /// Wakes idle workers.
    work: Condvar,
    /// Wakes `join` callers.
    idle: Condvar,
}

impl Shared {
    fn boundary(&self) -> Flow {
        if self.control.lock().done {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }

    fn finish_tick(&self) -> Flow {
        self.core.finish_tick();
        let mut control = self.control.lock();
        control.pending = control.pending.saturating_sub(1);
        if control.pending == 0 {
            self.idle.notify_all();
        }
        if control.done {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

/// The worker pool of a world.
///
/// With zero workers, [`schedule`](Scheduler::schedule) runs ticks on the
/// calling thread.
pub struct Scheduler {
    core: Arc<WorldCore>,
    shared: Option<Arc<Shared>>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// A pool of `threads` workers over `core`. Falls back to inline
    /// ticking if a worker cannot be spawned.
    pub fn new(core: Arc<WorldCore>, threads: usize) -> Self {
        let mut scheduler = Self {
            core,
            shared: None,
            workers: Vec::new(),
        };
        scheduler.start(threads);
        scheduler
    }

    /// Number of worker threads; 0 when ticking inline.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Request `delta` more ticks.
    pub fn schedule(&self, delta: u64) {
        if delta == 0 {
            return;
        }
        match &self.shared {
            None => {
                for _ in 0..delta {
                    self.core.run_tick();
                }
            }
            Some(shared) => {
                let mut control = shared.control.lock();
                control.pending = control.pending.saturating_add(delta);
                shared.work.notify_all();
            }
        }
    }

    /// Block until no ticks are pending or every worker has exited.
    pub fn join(&self) {
        let Some(shared) = &self.shared else {
            return;
        };
        let mut control = shared.control.lock();
        while control.pending > 0 && control.running > 0 {
            shared.idle.wait(&mut control);
        }
    }

    /// Ask every worker to exit at its next phase boundary.
    pub fn set_done(&self) {
        if let Some(shared) = &self.shared {
            shared.control.lock().done = true;
            shared.work.notify_all();
        }
    }

    /// Finish pending ticks, then rebuild the pool with `threads` workers.
    pub fn set_thread_count(&mut self, threads: usize) {
        self.join();
        self.stop();
        self.start(threads);
    }

    fn start(&mut self, threads: usize) {
        if threads == 0 {
            return;
        }
        let shared = Arc::new(Shared {
            core: Arc::clone(&self.core),
            barrier: PhaseBarrier::new(threads),
            control: Mutex::new(Control {
                pending: 0,
                done: false,
                running: threads,
            }),
            work: Condvar::new(),
            idle: Condvar::new(),
        });
        self.shared = Some(Arc::clone(&shared));

        for index in 0..threads {
            let worker = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name(format!("kairos-worker-{index}"))
                .spawn(move || worker_loop(&worker, index));
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(err) => {
                    tracing::error!(%err, index, threads, "cannot spawn worker, ticking inline");
                    // Nothing is pending, so the spawned workers exit from idle.
                    self.stop();
                    return;
                }
            }
        }
        tracing::debug!(threads, "worker pool started");
    }

    fn stop(&mut self) {
        let Some(shared) = self.shared.take() else {
            return;
        };
        {
            let mut control = shared.control.lock();
            if control.pending > 0 {
                tracing::warn!(pending = control.pending, "stopping with ticks pending");
            }
            control.done = true;
            shared.work.notify_all();
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(shared: &Shared, index: usize) {
    tracing::trace!(index, "worker started");
    loop {
        {
            let mut control = shared.control.lock();
            // Pending only drops inside a barrier, so once any worker sees
            // work every other worker will see it too.
            while control.pending == 0 && !control.done {
                shared.work.wait(&mut control);
            }
            if control.pending == 0 {
                break;
            }
        }
        if run_pass(shared) == Flow::Stop {
            break;
        }
    }
    let mut control = shared.control.lock();
    control.running = control.running.saturating_sub(1);
    shared.idle.notify_all();
    tracing::trace!(index, "worker exited");
}

fn run_pass(shared: &Shared) -> Flow {
    let core = &shared.core;
    loop {
        let flow = shared.barrier.sync(|| {
            if shared.control.lock().done {
                return Flow::Stop;
            }
            if core.no_queue() {
                return Flow::Proceed;
            }
            core.drain_sync();
            core.clean_sync_queue();
            Flow::Continue
        });
        match flow {
            Flow::Stop => return Flow::Stop,
            Flow::Proceed => break,
            Flow::Continue => {}
        }
        core.drain_async();
        let flow = shared.barrier.sync(|| {
            core.clean_async_queue();
            shared.boundary()
        });
        if flow == Flow::Stop {
            return Flow::Stop;
        }
    }

    core.tick_dynamic();
    let flow = shared.barrier.sync(|| {
        core.reset_index();
        shared.boundary()
    });
    if flow == Flow::Stop {
        return Flow::Stop;
    }

    core.adjust_all();
    shared.barrier.sync(|| {
        core.reset_index();
        shared.finish_tick()
    })
}
