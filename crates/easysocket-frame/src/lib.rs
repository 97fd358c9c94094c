//! Length-prefixed datagram framing for socket streams.
//!
//! Every datagram is framed with a fixed 16-byte header:
//! - a 1-byte protocol version
//! - a 4-byte big-endian body length (at byte offset 1)
//! - charset, kind and a 64-bit message id
//!
//! [`FrameAccumulator`] turns an arbitrarily chunked byte stream back into
//! whole frames without any IO of its own, so it can sit under a blocking
//! reader thread or behind the optional `tokio_util` codec.

pub mod accumulator;
pub mod codec;
pub mod config;
pub mod error;
pub mod growth;
pub mod kind;
pub mod writer;

#[cfg(feature = "async")]
pub mod framed;

pub use accumulator::FrameAccumulator;
pub use codec::{
    decode_length, encode_datagram, BinaryCodec, Datagram, DatagramCodec, HeaderLayout,
    BINARY_LAYOUT, HEADER_LEN, LENGTH_FIELD_LEN, LENGTH_OFFSET, VERSION,
};
pub use config::{ReaderConfig, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_SIZE, DEFAULT_QUEUE_CAPACITY};
pub use error::{FrameError, Result};
pub use growth::GrowthPolicy;
pub use kind::{is_user, kind_name, ACK, HEARTBEAT, MVC, USER_KIND_START};
pub use writer::DatagramWriter;

#[cfg(feature = "async")]
pub use framed::DatagramFrameCodec;
