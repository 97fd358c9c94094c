use clap::{Args, Subcommand};
use std::path::PathBuf;

use easysocket_frame::{
    ReaderConfig, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE, DEFAULT_QUEUE_CAPACITY, MVC,
};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Accept connections and print received datagrams.
    Listen(ListenArgs),
    /// Send a single datagram.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<u8> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind, e.g. 127.0.0.1:7410.
    pub addr: String,
    /// Filter to specific kinds (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub kinds: Option<Vec<u8>>,
    /// Exit after printing N datagrams.
    #[arg(long)]
    pub count: Option<usize>,
    /// Initial accumulation buffer size in bytes.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,
    /// Largest accepted frame (header + body) in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
    /// Number of dispatch workers.
    #[arg(long, default_value_t = 1)]
    pub pool_size: usize,
    /// Datagrams allowed to wait for a worker.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
}

impl ListenArgs {
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            initial_buffer_size: self.buffer_size,
            max_frame_size: self.max_frame_size,
            pool_size: self.pool_size,
            queue_capacity: self.queue_capacity,
            thread_name: "listen".to_string(),
            ..ReaderConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to connect to.
    pub addr: String,
    /// Datagram kind.
    #[arg(long, short = 'k', default_value_t = MVC)]
    pub kind: u8,
    /// Message id.
    #[arg(long, default_value_t = 0)]
    pub id: u64,
    /// Text body.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the body from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
