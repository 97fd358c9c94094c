//! Socket datagram framing with a non-blocking dispatch reader.
//!
//! easysocket reconstructs length-prefixed datagrams from an arbitrarily
//! chunked byte stream and hands each one to application code on a worker
//! pool, so a slow handler never stalls the socket.
//!
//! # Crate Structure
//!
//! - [`frame`]: wire format, codec trait, incremental frame accumulator
//! - [`stream`]: worker lifecycle, dispatch pool, threaded datagram reader

/// Re-export frame types.
pub mod frame {
    pub use easysocket_frame::*;
}

/// Re-export stream types.
pub mod stream {
    pub use easysocket_stream::*;
}
