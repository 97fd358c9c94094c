use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::{Result, StreamError};

/// Runs one body on a dedicated background thread until told to stop.
///
/// Start and shutdown transitions are serialized behind one lock, so two
/// concurrent `start` calls can never spawn two threads. The shutdown flag is
/// shared with the body, which polls it between blocking operations.
#[derive(Debug)]
pub struct Worker {
    name: String,
    shutdown: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Create a stopped worker whose thread will be named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shutdown: Arc::new(AtomicBool::new(true)),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the background thread running `body`.
    ///
    /// Fails with [`StreamError::AlreadyRunning`] unless the worker is shut down
    /// and any previous thread has finished.
    pub fn start<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut handle = self.lock();
        if !self.is_shutdown() {
            return Err(StreamError::AlreadyRunning(self.name.clone()));
        }
        if let Some(previous) = handle.take() {
            if !previous.is_finished() {
                *handle = Some(previous);
                return Err(StreamError::AlreadyRunning(self.name.clone()));
            }
            let _ = previous.join();
        }

        self.shutdown.store(false, Ordering::SeqCst);
        let spawned = thread::Builder::new().name(self.name.clone()).spawn(body);
        match spawned {
            Ok(join) => {
                debug!(worker = %self.name, "worker thread spawned");
                *handle = Some(join);
                Ok(())
            }
            Err(source) => {
                self.shutdown.store(true, Ordering::SeqCst);
                Err(StreamError::Spawn {
                    name: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// Request shutdown. Returns `true` only for the call that performed the transition.
    pub fn shutdown(&self) -> bool {
        let _guard = self.lock();
        let was_shutdown = self.shutdown.swap(true, Ordering::SeqCst);
        if !was_shutdown {
            debug!(worker = %self.name, "worker shutdown requested");
        }
        !was_shutdown
    }

    /// Point-in-time view of the shutdown flag.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Wait for the background thread to exit.
    ///
    /// Must not be called from the worker's own thread.
    pub fn join(&self) {
        let handle = self.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                *self.lock() = Some(handle);
                return;
            }
            let _ = handle.join();
        }
    }

    /// Whether a background thread exists and has not yet exited.
    pub fn is_alive(&self) -> bool {
        self.lock().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Thread name used for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn starts_shut_down() {
        let worker = Worker::new("idle");
        assert!(worker.is_shutdown());
        assert!(!worker.is_alive());
        assert!(!worker.shutdown(), "nothing to stop yet");
    }

    #[test]
    fn shutdown_is_idempotent() {
        let worker = Worker::new("idem");
        let (tx, rx) = mpsc::channel();
        worker.start(move || rx.recv().unwrap_or(())).unwrap();

        assert!(!worker.is_shutdown());
        assert!(worker.shutdown());
        assert!(!worker.shutdown());

        tx.send(()).unwrap();
        worker.join();
        assert!(!worker.is_alive());
    }

    #[test]
    fn double_start_fails() {
        let worker = Worker::new("twice");
        let (tx, rx) = mpsc::channel();
        worker.start(move || rx.recv().unwrap_or(())).unwrap();

        let err = worker.start(|| {}).unwrap_err();
        assert!(matches!(err, StreamError::AlreadyRunning(name) if name == "twice"));

        worker.shutdown();
        tx.send(()).unwrap();
        worker.join();
    }

    #[test]
    fn restart_waits_for_previous_thread() {
        let worker = Worker::new("restart");
        let (tx, rx) = mpsc::channel::<()>();
        worker.start(move || rx.recv().unwrap_or(())).unwrap();
        worker.shutdown();

        // Flag is set but the old thread is still blocked.
        let err = worker.start(|| {}).unwrap_err();
        assert!(matches!(err, StreamError::AlreadyRunning(_)));

        tx.send(()).unwrap();
        while worker.is_alive() {
            std::thread::sleep(Duration::from_millis(1));
        }

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        worker
            .start(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        worker.join();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn thread_carries_worker_name() {
        let worker = Worker::new("named-worker");
        let (tx, rx) = mpsc::channel();
        worker
            .start(move || {
                let name = std::thread::current().name().map(str::to_string);
                tx.send(name).unwrap();
            })
            .unwrap();

        assert_eq!(rx.recv().unwrap().as_deref(), Some("named-worker"));
        worker.join();
    }

    #[test]
    fn concurrent_starts_spawn_one_thread() {
        let worker = Arc::new(Worker::new("race"));
        let spawned = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let worker = Arc::clone(&worker);
                let spawned = Arc::clone(&spawned);
                let release_rx = Arc::clone(&release_rx);
                std::thread::spawn(move || {
                    worker
                        .start(move || {
                            spawned.fetch_add(1, Ordering::SeqCst);
                            let _ = release_rx.lock().unwrap().recv();
                        })
                        .is_ok()
                })
            })
            .collect();

        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(started, 1);

        worker.shutdown();
        release_tx.send(()).unwrap();
        worker.join();
        assert_eq!(spawned.load(Ordering::SeqCst), 1);
    }
}
