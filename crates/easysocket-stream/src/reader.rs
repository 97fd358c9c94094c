use std::io::{ErrorKind, Read};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use easysocket_frame::{BinaryCodec, DatagramCodec, FrameAccumulator, FrameError, ReaderConfig};
use tracing::{debug, error, info, warn};

use crate::callback::{Callback, NoopCallback};
use crate::dispatch::{DispatchPool, Dispatcher, Handler, Rejected};
use crate::error::{Result, StreamError};
use crate::stats::{ReaderStats, StatsSnapshot};
use crate::worker::Worker;

type Interrupt = Box<dyn Fn() + Send + Sync + 'static>;

// How often a reader blocked on a full dispatch queue rechecks for shutdown.
const SUBMIT_POLL: Duration = Duration::from_millis(20);

/// Reads datagrams off a byte stream on a dedicated thread.
///
/// The reading thread owns the accumulation buffer; only decoded items are
/// handed to the dispatch pool, where the consumer runs. Frames are decoded
/// in arrival order. Consumers on different pool workers may run concurrently,
/// so delivery order is only preserved with `pool_size == 1`.
///
/// EOF, a read error, or a fatal framing error stops the reader through the
/// same path as [`shutdown`](DatagramReader::shutdown). A reader waiting on a
/// full dispatch queue notices shutdown within a short poll interval and
/// discards the frames it has not handed over.
pub struct DatagramReader<R, C: DatagramCodec = BinaryCodec> {
    shared: Arc<Shared<R, C>>,
}

/// Configures a [`DatagramReader`].
pub struct ReaderBuilder<R, C: DatagramCodec = BinaryCodec> {
    input: R,
    codec: C,
    config: ReaderConfig,
    consumer: Option<Handler<C::Item>>,
    callback: Arc<dyn Callback>,
    interrupt: Option<Interrupt>,
}

struct Shared<R, C: DatagramCodec> {
    worker: Worker,
    // Serializes reader-level start/shutdown on top of the worker's own lock.
    lifecycle: Mutex<()>,
    // Handed to the reading thread on start and returned when it exits.
    input: Mutex<Option<R>>,
    codec: C,
    config: ReaderConfig,
    consumer: Option<Handler<C::Item>>,
    callback: Arc<dyn Callback>,
    interrupt: Option<Interrupt>,
    pool: Mutex<Option<DispatchPool<C::Item>>>,
    retired: Mutex<Vec<JoinHandle<()>>>,
    stats: ReaderStats,
}

enum Exit {
    Eof,
    Stopped,
}

impl<R: Read + Send + 'static> DatagramReader<R, BinaryCodec> {
    /// Start configuring a reader for the default binary datagram format.
    pub fn builder(input: R) -> ReaderBuilder<R, BinaryCodec> {
        ReaderBuilder::new(input, BinaryCodec)
    }
}

impl ReaderBuilder<TcpStream, BinaryCodec> {
    /// Builder for a TCP stream; shutdown closes the read half to unblock a pending read.
    pub fn tcp(stream: TcpStream) -> std::io::Result<Self> {
        let closer = stream.try_clone()?;
        Ok(ReaderBuilder::new(stream, BinaryCodec).interrupt_with(move || {
            if let Err(err) = closer.shutdown(Shutdown::Read) {
                debug!(error = %err, "closing read half failed");
            }
        }))
    }
}

impl<R: Read + Send + 'static, C: DatagramCodec> ReaderBuilder<R, C> {
    /// Builder using an explicit codec.
    pub fn new(input: R, codec: C) -> Self {
        Self {
            input,
            codec,
            config: ReaderConfig::default(),
            consumer: None,
            callback: Arc::new(NoopCallback),
            interrupt: None,
        }
    }

    /// Override reader configuration.
    pub fn config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Handler for every decoded item. Without one, complete frames are dropped.
    pub fn consumer<F>(mut self, consumer: F) -> Self
    where
        F: Fn(C::Item) + Send + Sync + 'static,
    {
        self.consumer = Some(Arc::new(consumer));
        self
    }

    /// Lifecycle callback for fatal conditions and shutdown.
    pub fn callback(mut self, callback: impl Callback) -> Self {
        self.callback = Arc::new(callback);
        self
    }

    /// Action run on shutdown to unblock a read in progress.
    pub fn interrupt_with<F>(mut self, interrupt: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.interrupt = Some(Box::new(interrupt));
        self
    }

    /// Validate configuration against the codec and create a stopped reader.
    pub fn build(self) -> Result<DatagramReader<R, C>> {
        self.config.validate_for(&self.codec)?;
        Ok(DatagramReader {
            shared: Arc::new(Shared {
                worker: Worker::new(self.config.thread_name.clone()),
                lifecycle: Mutex::new(()),
                input: Mutex::new(Some(self.input)),
                codec: self.codec,
                config: self.config,
                consumer: self.consumer,
                callback: self.callback,
                interrupt: self.interrupt,
                pool: Mutex::new(None),
                retired: Mutex::new(Vec::new()),
                stats: ReaderStats::default(),
            }),
        })
    }
}

impl<R: Read + Send + 'static, C: DatagramCodec> DatagramReader<R, C> {
    /// Start configuring a reader with an explicit codec.
    pub fn with_codec(input: R, codec: C) -> ReaderBuilder<R, C> {
        ReaderBuilder::new(input, codec)
    }

    /// Spawn the reading thread and its dispatch pool.
    ///
    /// Fails with [`StreamError::AlreadyRunning`] while a previous run has not
    /// fully stopped.
    pub fn start(&self) -> Result<()> {
        let shared = &self.shared;
        let _lifecycle = lock(&shared.lifecycle);

        let input_ready = lock(&shared.input).is_some();
        if !shared.worker.is_shutdown() || shared.worker.is_alive() || !input_ready {
            return Err(StreamError::AlreadyRunning(shared.worker.name().to_string()));
        }

        let accumulator = FrameAccumulator::new(&shared.config)?;
        let pool = match &shared.consumer {
            Some(consumer) => Some(DispatchPool::new(
                &shared.config.thread_name,
                shared.config.pool_size,
                shared.config.queue_capacity,
                Arc::clone(consumer),
            )?),
            None => None,
        };
        let dispatcher = pool.as_ref().map(DispatchPool::dispatcher);

        let runner = Arc::clone(shared);
        let started = shared
            .worker
            .start(move || runner.run(accumulator, dispatcher));

        match started {
            Ok(()) => {
                debug!(
                    reader = %shared.worker.name(),
                    workers = pool.as_ref().map_or(0, DispatchPool::size),
                    "dispatch pool attached"
                );
                *lock(&shared.pool) = pool;
                Ok(())
            }
            Err(err) => {
                if let Some(pool) = pool {
                    lock(&shared.retired).extend(pool.shutdown());
                }
                Err(err)
            }
        }
    }

    /// Stop reading and shut the dispatch pool down without waiting for it.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn shutdown(&self) -> bool {
        self.shared.shutdown()
    }

    /// Point-in-time view of the shutdown flag.
    pub fn is_shutdown(&self) -> bool {
        self.shared.worker.is_shutdown()
    }

    /// Whether the reading thread has been spawned and not yet exited.
    ///
    /// Dispatch workers may still be finishing queued items after this turns false.
    pub fn is_reading(&self) -> bool {
        self.shared.worker.is_alive()
    }

    /// Wait for the reading thread and every retired dispatch worker to exit.
    ///
    /// Does not request shutdown itself. Calling it from a consumer skips the
    /// calling worker.
    pub fn join(&self) {
        self.shared.worker.join();
        let retired = std::mem::take(&mut *lock(&self.shared.retired));
        let current = thread::current().id();
        for handle in retired {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
    }

    /// Counters for the lifetime of this reader.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Active configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.shared.config
    }
}

impl<R, C: DatagramCodec> Drop for DatagramReader<R, C> {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl<R, C: DatagramCodec> Shared<R, C> {
    fn shutdown(&self) -> bool {
        let pool = {
            let _lifecycle = lock(&self.lifecycle);
            if !self.worker.shutdown() {
                return false;
            }
            if let Some(interrupt) = &self.interrupt {
                interrupt();
            }
            lock(&self.pool).take()
        };

        if let Some(pool) = pool {
            lock(&self.retired).extend(pool.shutdown());
        }
        info!(reader = %self.worker.name(), "datagram reader shut down");
        self.callback.on_shutdown();
        true
    }
}

impl<R: Read, C: DatagramCodec> Shared<R, C> {
    fn run(&self, mut accumulator: FrameAccumulator, dispatcher: Option<Dispatcher<C::Item>>) {
        let Some(mut input) = lock(&self.input).take() else {
            self.shutdown();
            return;
        };
        info!(reader = %self.worker.name(), "datagram reader started");

        match self.read_loop(&mut input, &mut accumulator, dispatcher.as_ref()) {
            Ok(Exit::Eof) if self.worker.is_shutdown() => debug!("read half closed by shutdown"),
            Ok(Exit::Eof) => {
                if !accumulator.is_empty() {
                    debug!(
                        write_point = accumulator.write_point(),
                        "discarding partial frame at end of stream"
                    );
                }
                info!("input closed, reader stopping");
            }
            Ok(Exit::Stopped) => debug!("reader observed shutdown"),
            Err(FrameError::Io(err)) if self.worker.is_shutdown() => {
                debug!(error = %err, "read aborted after shutdown");
            }
            Err(FrameError::Io(err)) => {
                debug!(error = %err, "input read failed, reader stopping");
            }
            Err(err) => {
                error!(error = %err, capacity = accumulator.capacity(), "fatal framing error");
                self.callback.on_fatal(&StreamError::Frame(err));
            }
        }

        drop(dispatcher);
        *lock(&self.input) = Some(input);
        self.shutdown();
    }

    fn read_loop(
        &self,
        input: &mut R,
        accumulator: &mut FrameAccumulator,
        dispatcher: Option<&Dispatcher<C::Item>>,
    ) -> std::result::Result<Exit, FrameError> {
        loop {
            if self.worker.is_shutdown() {
                return Ok(Exit::Stopped);
            }

            let read = match input.read(accumulator.spare_mut()) {
                Ok(0) => return Ok(Exit::Eof),
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };
            accumulator.commit(read);
            self.stats.add_bytes(read);

            while let Some(frame) = accumulator.next_frame(&self.codec)? {
                if self.worker.is_shutdown() {
                    self.stats.add_frame();
                    self.stats.add_dropped();
                    debug!(frame_len = frame.len(), "shutdown requested, frame discarded");
                    return Ok(Exit::Stopped);
                }
                self.handle_frame(frame, dispatcher);
            }
            accumulator.reserve_for_frame()?;
        }
    }

    fn handle_frame(&self, frame: Bytes, dispatcher: Option<&Dispatcher<C::Item>>) {
        self.stats.add_frame();
        let frame_len = frame.len();
        let item = match self.codec.decode_bytes(frame) {
            Ok(item) => item,
            Err(err) => {
                self.stats.add_decode_error();
                warn!(error = %err, frame_len, "skipping undecodable frame");
                return;
            }
        };

        let Some(dispatcher) = dispatcher else {
            self.stats.add_dropped();
            warn!(frame_len, "no consumer registered, datagram dropped");
            return;
        };

        match dispatcher.submit_unless(item, SUBMIT_POLL, || self.worker.is_shutdown()) {
            Ok(()) => {
                self.stats.add_dispatched();
                debug!(
                    frame_len,
                    queued = dispatcher.queued(),
                    "datagram submitted to dispatch pool"
                );
            }
            Err(Rejected::Cancelled(_)) => {
                self.stats.add_dropped();
                debug!(frame_len, "shutdown while dispatch queue full, datagram dropped");
            }
            Err(Rejected::Closed(_)) => {
                self.stats.add_dropped();
                warn!(frame_len, "dispatch pool closed, datagram dropped");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
