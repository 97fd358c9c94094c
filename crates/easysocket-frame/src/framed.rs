//! `tokio_util::codec` adapter for datagram frames.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_datagram, BinaryCodec, Datagram, DatagramCodec, BINARY_LAYOUT};
use crate::config::{ReaderConfig, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{FrameError, Result};

/// Frames datagrams for `FramedRead`/`FramedWrite`.
///
/// Shares the header contract of [`crate::FrameAccumulator`]; the buffer is
/// owned by the framed transport instead.
#[derive(Debug, Clone)]
pub struct DatagramFrameCodec<C = BinaryCodec> {
    codec: C,
    header_len: usize,
    length_offset: usize,
    max_frame_size: usize,
}

impl DatagramFrameCodec<BinaryCodec> {
    /// Codec for the default binary datagram format.
    pub fn new() -> Self {
        Self {
            codec: BinaryCodec,
            header_len: BINARY_LAYOUT.header_len,
            length_offset: BINARY_LAYOUT.length_offset,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl Default for DatagramFrameCodec<BinaryCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DatagramCodec> DatagramFrameCodec<C> {
    /// Codec using `codec` and the header layout from `config`.
    ///
    /// Fails with [`FrameError::InvalidConfig`] when `codec` cannot decode that layout.
    pub fn with_codec(codec: C, config: &ReaderConfig) -> Result<Self> {
        config.validate_for(&codec)?;
        Ok(Self {
            codec,
            header_len: config.header_len,
            length_offset: config.length_offset,
            max_frame_size: config.max_frame_size,
        })
    }
}

impl<C: DatagramCodec> Decoder for DatagramFrameCodec<C> {
    type Item = C::Item;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<C::Item>> {
        if src.len() < self.header_len {
            return Ok(None);
        }

        let body_len = self
            .codec
            .decode_length(&src[..self.header_len], self.length_offset)?;
        let total = body_len.saturating_add(self.header_len);
        if total > self.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: total,
                max: self.max_frame_size,
            });
        }

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total).freeze();
        self.codec.decode_bytes(frame).map(Some)
    }
}

impl<C: DatagramCodec> Encoder<Datagram> for DatagramFrameCodec<C> {
    type Error = FrameError;

    fn encode(&mut self, item: Datagram, dst: &mut BytesMut) -> Result<()> {
        encode_datagram(&item, dst)
    }
}
