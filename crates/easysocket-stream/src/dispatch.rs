use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};
use tracing::{debug, warn};

use crate::error::{Result, StreamError};

/// Handler invoked by dispatch workers for each submitted item.
pub type Handler<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Fixed-size pool of worker threads fed by a bounded queue.
///
/// When the queue is full, [`Dispatcher::submit_unless`] blocks the submitting
/// thread until a worker frees a slot or the caller cancels. A panicking handler only loses the
/// item it was processing.
pub struct DispatchPool<T> {
    sender: Sender<T>,
    workers: Vec<JoinHandle<()>>,
}

/// Why [`Dispatcher::submit_unless`] handed an item back.
#[derive(Debug, PartialEq, Eq)]
pub enum Rejected<T> {
    /// Every worker has exited.
    Closed(T),
    /// The cancel check fired while the queue was full.
    Cancelled(T),
}

/// Cloneable submission handle for a [`DispatchPool`].
pub struct Dispatcher<T> {
    sender: Sender<T>,
}

impl<T: Send + 'static> DispatchPool<T> {
    /// Spawn `size` workers named `{name}-dispatch-{n}` sharing a queue of `capacity` items.
    pub fn new(name: &str, size: usize, capacity: usize, handler: Handler<T>) -> Result<Self> {
        let (sender, receiver) = channel::bounded(capacity);
        let mut workers = Vec::with_capacity(size);

        for n in 0..size {
            let thread_name = format!("{name}-dispatch-{n}");
            let receiver = receiver.clone();
            let handler = Arc::clone(&handler);
            let spawned = thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || run_worker(receiver, handler));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    // Dropping the sender lets already spawned workers exit.
                    drop(sender);
                    return Err(StreamError::Spawn {
                        name: thread_name,
                        source,
                    });
                }
            }
        }

        debug!(pool = name, size, capacity, "dispatch pool started");
        Ok(Self { sender, workers })
    }

    /// A submission handle sharing this pool's queue.
    pub fn dispatcher(&self) -> Dispatcher<T> {
        Dispatcher {
            sender: self.sender.clone(),
        }
    }

    /// Stop accepting work from this pool's own handle.
    ///
    /// Workers exit after the queue drains and every outstanding
    /// [`Dispatcher`] is dropped. Does not wait. Returns the worker handles
    /// so callers can join them later.
    pub fn shutdown(self) -> Vec<JoinHandle<()>> {
        let Self { sender, workers } = self;
        drop(sender);
        workers
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl<T> Dispatcher<T> {
    /// Queue `item` for a worker, waiting while the queue is full.
    ///
    /// `cancelled` is checked each time a `poll` interval passes without free
    /// space; once it returns true the item is handed back.
    pub fn submit_unless<F>(
        &self,
        mut item: T,
        poll: Duration,
        cancelled: F,
    ) -> std::result::Result<(), Rejected<T>>
    where
        F: Fn() -> bool,
    {
        loop {
            match self.sender.send_timeout(item, poll) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Disconnected(back)) => return Err(Rejected::Closed(back)),
                Err(SendTimeoutError::Timeout(back)) if cancelled() => {
                    return Err(Rejected::Cancelled(back));
                }
                Err(SendTimeoutError::Timeout(back)) => item = back,
            }
        }
    }

    /// Items currently waiting for a worker.
    pub fn queued(&self) -> usize {
        self.sender.len()
    }
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

fn run_worker<T>(receiver: Receiver<T>, handler: Handler<T>) {
    while let Ok(item) = receiver.recv() {
        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| handler(item))) {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "<non-string panic>".to_string());
            warn!(panic = %message, "dispatch handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{mpsc, Mutex};
    use super::*;

    const POLL: Duration = Duration::from_millis(10);

    fn never() -> bool {
        false
    }

    fn join_all(handles: Vec<JoinHandle<()>>) {
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn runs_every_submitted_item() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let pool = DispatchPool::new(
            "count",
            4,
            16,
            Arc::new(move |n: usize| {
                counter.fetch_add(n, Ordering::SeqCst);
            }),
        )
        .unwrap();
        assert_eq!(pool.size(), 4);

        let dispatcher = pool.dispatcher();
        for n in 1..=100 {
            dispatcher.submit_unless(n, POLL, never).unwrap();
        }
        drop(dispatcher);
        join_all(pool.shutdown());

        assert_eq!(seen.load(Ordering::SeqCst), 5050);
    }

    #[test]
    fn panicking_handler_does_not_kill_worker() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let pool = DispatchPool::new(
            "panics",
            1,
            8,
            Arc::new(move |n: u32| {
                if n == 2 {
                    panic!("bad item");
                }
                sink.lock().unwrap().push(n);
            }),
        )
        .unwrap();

        let dispatcher = pool.dispatcher();
        for n in 1..=3 {
            dispatcher.submit_unless(n, POLL, never).unwrap();
        }
        drop(dispatcher);
        join_all(pool.shutdown());

        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn full_queue_blocks_submitter() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let started_tx = Mutex::new(started_tx);
        let pool = DispatchPool::new(
            "bounded",
            1,
            1,
            Arc::new(move |_: u8| {
                started_tx.lock().unwrap().send(()).unwrap();
                let _ = release_rx.lock().unwrap().recv();
            }),
        )
        .unwrap();
        let dispatcher = pool.dispatcher();

        dispatcher.submit_unless(1, POLL, never).unwrap(); // taken by the worker
        started_rx.recv().unwrap();
        dispatcher.submit_unless(2, POLL, never).unwrap(); // fills the queue

        let blocked = {
            let dispatcher = dispatcher.clone();
            std::thread::spawn(move || dispatcher.submit_unless(3, POLL, never).is_ok())
        };
        std::thread::sleep(Duration::from_millis(50));
        assert!(!blocked.is_finished(), "third submit waits for space");
        assert_eq!(dispatcher.queued(), 1);

        for _ in 0..3 {
            release_tx.send(()).unwrap();
        }
        assert!(blocked.join().unwrap());

        drop(dispatcher);
        join_all(pool.shutdown());
    }

    #[test]
    fn outstanding_dispatcher_outlives_shutdown() {
        let pool = DispatchPool::new("closed", 1, 1, Arc::new(|_: ()| {})).unwrap();
        let outstanding = pool.dispatcher();
        let handles = pool.shutdown();

        // Outstanding handles still reach the workers until dropped.
        outstanding.submit_unless((), POLL, never).unwrap();
        drop(outstanding);
        join_all(handles);
    }

    #[test]
    fn cancelled_submit_hands_item_back() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let pool = DispatchPool::new(
            "cancel",
            1,
            1,
            Arc::new(move |_: u8| {
                let _ = release_rx.lock().unwrap().recv_timeout(Duration::from_secs(5));
            }),
        )
        .unwrap();
        let dispatcher = pool.dispatcher();
        dispatcher.submit_unless(1, POLL, never).unwrap();
        // Wait until the worker holds item 1 so item 2 sits in the queue.
        while dispatcher.queued() > 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        dispatcher.submit_unless(2, POLL, never).unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let waiter = {
            let dispatcher = dispatcher.clone();
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                dispatcher.submit_unless(3, POLL, || stop.load(Ordering::SeqCst))
            })
        };
        std::thread::sleep(Duration::from_millis(30));
        stop.store(true, Ordering::SeqCst);
        assert_eq!(waiter.join().unwrap(), Err(Rejected::Cancelled(3)));

        for _ in 0..2 {
            release_tx.send(()).unwrap();
        }
        drop(dispatcher);
        join_all(pool.shutdown());
    }
}
