//! Background loader: decodes and applies byte payloads off the tick
//! thread.
//!
//! Tasks travel over an unbounded crossbeam channel to a single named
//! thread. Progress is two atomic counters, polled by whoever is waiting
//! on the load (typically a loading screen). The loader is not part of
//! the deterministic tick path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

/// Errors from starting a [`Loader`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoaderError {
    /// The loader thread could not be created.
    #[error("cannot spawn loader thread: {0}")]
    SpawnFailed(String),
}

#[derive(Default)]
struct Progress {
    submitted: AtomicU64,
    processed: AtomicU64,
    stop: AtomicBool,
}

/// A background thread that decodes byte tasks and performs them.
pub struct Loader {
    tx: Option<Sender<Vec<u8>>>,
    progress: Arc<Progress>,
    thread: Option<JoinHandle<()>>,
}

impl Loader {
    /// Start the loader. `decode` turns a payload into a value, `perform`
    /// consumes it. Payloads that fail to decode are logged and skipped.
    pub fn spawn<T, D, P>(decode: D, perform: P) -> Result<Self, LoaderError>
    where
        T: 'static,
        D: Fn(&[u8]) -> Option<T> + Send + 'static,
        P: FnMut(T) + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let progress = Arc::new(Progress::default());
        let worker = Arc::clone(&progress);
        let thread = thread::Builder::new()
            .name("kairos-loader".into())
            .spawn(move || run(rx, &worker, decode, perform))
            .map_err(|e| LoaderError::SpawnFailed(e.to_string()))?;
        Ok(Self {
            tx: Some(tx),
            progress,
            thread: Some(thread),
        })
    }

    /// Submit a payload.
    pub fn add_task(&self, task: Vec<u8>) {
        let Some(tx) = &self.tx else {
            tracing::warn!(len = task.len(), "loader stopped, task dropped");
            return;
        };
        self.progress.submitted.fetch_add(1, Ordering::AcqRel);
        if tx.send(task).is_err() {
            // The thread is gone; count the task so is_ready() settles.
            tracing::error!("loader thread exited, task dropped");
            self.progress.processed.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Whether every submitted task has been processed.
    pub fn is_ready(&self) -> bool {
        self.progress() >= self.submitted()
    }

    /// Number of processed tasks.
    pub fn progress(&self) -> u64 {
        self.progress.processed.load(Ordering::Acquire)
    }

    /// Number of submitted tasks.
    pub fn submitted(&self) -> u64 {
        self.progress.submitted.load(Ordering::Acquire)
    }

    /// Stop the thread. Tasks not yet started are discarded but still
    /// counted as processed, so [`is_ready`](Self::is_ready) holds
    /// afterwards.
    pub fn done(&mut self) {
        self.progress.stop.store(true, Ordering::Release);
        self.tx = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("loader thread panicked");
            }
        }
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.done();
    }
}

fn run<T>(
    rx: Receiver<Vec<u8>>,
    progress: &Progress,
    decode: impl Fn(&[u8]) -> Option<T>,
    mut perform: impl FnMut(T),
) {
    tracing::debug!("loader started");
    let mut abandoned = 0u64;
    // The sender is dropped on stop, so this drains what is left and ends.
    for task in rx.iter() {
        if progress.stop.load(Ordering::Acquire) {
            abandoned += 1;
            progress.processed.fetch_add(1, Ordering::AcqRel);
            continue;
        }
        match decode(&task) {
            Some(value) => perform(value),
            None => tracing::warn!(len = task.len(), "loader task failed to decode"),
        }
        let processed = progress.processed.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(processed, "loader task complete");
    }
    if abandoned > 0 {
        tracing::debug!(abandoned, "loader discarded pending tasks");
    }
    tracing::debug!("loader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::{Duration, Instant};

    fn wait_ready(loader: &Loader) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !loader.is_ready() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn tasks_are_decoded_and_performed_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let loader = Loader::spawn(
            |bytes: &[u8]| bytes.first().copied(),
            move |b| sink.lock().push(b),
        )
        .unwrap();
        assert!(loader.is_ready());
        for b in 1..=5u8 {
            loader.add_task(vec![b]);
        }
        wait_ready(&loader);
        assert!(loader.is_ready());
        assert_eq!(loader.progress(), 5);
        assert_eq!(*seen.lock(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn undecodable_tasks_still_count() {
        let loader = Loader::spawn(|bytes: &[u8]| bytes.first().copied(), |_| {}).unwrap();
        loader.add_task(Vec::new());
        loader.add_task(vec![1]);
        wait_ready(&loader);
        assert_eq!(loader.progress(), 2);
        assert_eq!(loader.submitted(), 2);
    }

    #[test]
    fn done_settles_pending_tasks() {
        let loader_gate = Arc::new(Mutex::new(()));
        let gate = Arc::clone(&loader_gate);
        let held = loader_gate.lock();
        let mut loader = Loader::spawn(
            |bytes: &[u8]| bytes.first().copied(),
            move |_| drop(gate.lock()),
        )
        .unwrap();
        for b in 0..50u8 {
            loader.add_task(vec![b]);
        }
        assert!(!loader.is_ready());
        loader.progress.stop.store(true, Ordering::Release);
        drop(held);
        loader.done();
        assert_eq!(loader.submitted(), 50);
        assert_eq!(loader.progress(), 50);
        assert!(loader.is_ready());
    }

    #[test]
    fn tasks_after_done_are_dropped() {
        let mut loader = Loader::spawn(|_: &[u8]| Some(()), |_| {}).unwrap();
        loader.done();
        loader.add_task(vec![1]);
        assert_eq!(loader.submitted(), 0);
        assert!(loader.is_ready());
    }
}
