//! Stream processors that run on a dedicated background thread.
//!
//! [`Worker`] owns the start/shutdown lifecycle. [`DatagramReader`] builds on it:
//! one thread reads the socket and cuts frames, a [`DispatchPool`] runs the
//! consumer so a slow handler never stalls ingestion.

pub mod callback;
pub mod dispatch;
pub mod error;
pub mod reader;
pub mod stats;
pub mod worker;

pub use callback::{Callback, NoopCallback};
pub use dispatch::{DispatchPool, Dispatcher, Rejected};
pub use error::{Result, StreamError};
pub use reader::{DatagramReader, ReaderBuilder};
pub use stats::{ReaderStats, StatsSnapshot};
pub use worker::Worker;
