//! Incremental frame boundary detection over a growable byte buffer.
//!
//! The accumulator owns one contiguous buffer and two cursors:
//! - `write_point`: number of valid bytes currently buffered
//! - `frame_length`: total size of the frame at the front, once its header has arrived
//!
//! Callers read directly into [`FrameAccumulator::spare_mut`], [`commit`](FrameAccumulator::commit)
//! the byte count, then drain with [`next_frame`](FrameAccumulator::next_frame) and
//! [`reserve_for_frame`](FrameAccumulator::reserve_for_frame) before the next read.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::codec::DatagramCodec;
use crate::config::ReaderConfig;
use crate::error::{FrameError, Result};
use crate::growth::GrowthPolicy;

/// Accumulates raw bytes and cuts them into complete frames.
#[derive(Debug)]
pub struct FrameAccumulator {
    // Length always equals capacity; only `buf[..write_point]` is meaningful.
    buf: BytesMut,
    write_point: usize,
    frame_length: Option<usize>,
    header_len: usize,
    length_offset: usize,
    max_frame_size: usize,
    growth: GrowthPolicy,
}

impl FrameAccumulator {
    /// Create an accumulator sized and bounded by `config`.
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            buf: BytesMut::zeroed(config.initial_buffer_size),
            write_point: 0,
            frame_length: None,
            header_len: config.header_len,
            length_offset: config.length_offset,
            max_frame_size: config.max_frame_size,
            growth: config.growth_policy(),
        })
    }

    /// Unused tail of the buffer, ready to receive the next read.
    ///
    /// Never empty between calls to [`reserve_for_frame`](Self::reserve_for_frame).
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.write_point..]
    }

    /// Record that `n` bytes were written into [`spare_mut`](Self::spare_mut).
    pub fn commit(&mut self, n: usize) {
        debug_assert!(self.write_point + n <= self.buf.len());
        self.write_point = (self.write_point + n).min(self.buf.len());
    }

    /// Cut the next complete frame off the front of the buffer.
    ///
    /// Returns `Ok(None)` until the header and the whole declared body have arrived.
    /// Bytes beyond the returned frame slide down to index 0.
    pub fn next_frame<C: DatagramCodec + ?Sized>(&mut self, codec: &C) -> Result<Option<Bytes>> {
        let frame_length = match self.frame_length {
            Some(len) => len,
            None => {
                if self.write_point < self.header_len {
                    return Ok(None); // Need the full header first
                }
                let len = self.measure(codec)?;
                self.frame_length = Some(len);
                len
            }
        };

        if self.write_point < frame_length {
            return Ok(None);
        }

        let frame = Bytes::copy_from_slice(&self.buf[..frame_length]);
        self.buf.copy_within(frame_length..self.write_point, 0);
        self.write_point -= frame_length;
        self.frame_length = None;

        debug!(frame_len = frame_length, remaining = self.write_point, "frame complete");
        Ok(Some(frame))
    }

    /// Grow the buffer if the frame at the front cannot fit.
    ///
    /// Buffered bytes are preserved. Fails without touching the buffer when the
    /// growth policy cannot reach the required capacity.
    pub fn reserve_for_frame(&mut self) -> Result<()> {
        let Some(required) = self.frame_length else {
            return Ok(());
        };
        if required <= self.buf.len() {
            return Ok(());
        }

        let capacity = self.growth.next_capacity(self.buf.len(), required)?;
        let mut grown = BytesMut::zeroed(capacity);
        grown[..self.write_point].copy_from_slice(&self.buf[..self.write_point]);

        debug!(
            from = self.buf.len(),
            to = capacity,
            frame_len = required,
            "growing accumulation buffer"
        );
        self.buf = grown;
        Ok(())
    }

    /// Copy `data` in and collect every frame it completes.
    ///
    /// Convenience for push-style callers; the blocking reader reads straight
    /// into [`spare_mut`](Self::spare_mut) instead.
    pub fn push<C: DatagramCodec + ?Sized>(&mut self, mut data: &[u8], codec: &C) -> Result<Vec<Bytes>> {
        let mut frames = Vec::new();
        while !data.is_empty() {
            let spare = self.spare_mut();
            let n = spare.len().min(data.len());
            spare[..n].copy_from_slice(&data[..n]);
            self.commit(n);
            data = &data[n..];

            while let Some(frame) = self.next_frame(codec)? {
                frames.push(frame);
            }
            self.reserve_for_frame()?;
        }
        Ok(frames)
    }

    /// Number of buffered bytes not yet returned as a frame.
    pub fn write_point(&self) -> usize {
        self.write_point
    }

    /// Total length of the frame at the front, once its header has been measured.
    pub fn frame_length(&self) -> Option<usize> {
        self.frame_length
    }

    /// Current buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Whether no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.write_point == 0
    }

    fn measure<C: DatagramCodec + ?Sized>(&self, codec: &C) -> Result<usize> {
        let body_len = codec.decode_length(&self.buf[..self.header_len], self.length_offset)?;
        let total = body_len
            .checked_add(self.header_len)
            .ok_or(FrameError::FrameTooLarge {
                size: usize::MAX,
                max: self.max_frame_size,
            })?;
        if total > self.max_frame_size {
            return Err(FrameError::FrameTooLarge {
                size: total,
                max: self.max_frame_size,
            });
        }
        debug!(frame_len = total, write_point = self.write_point, "measured frame header");
        Ok(total)
    }
}
