use crate::codec::{DatagramCodec, HEADER_LEN, LENGTH_FIELD_LEN, LENGTH_OFFSET};
use crate::error::{FrameError, Result};
use crate::growth::{GrowthPolicy, DEFAULT_GROWTH_CAP, DEFAULT_MAX_CAPACITY};

/// Default initial size of the accumulation buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default maximum frame size (header + body): 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default bound on datagrams waiting for a dispatch worker.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for a datagram reader.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Fixed header length in bytes. Default: 16.
    pub header_len: usize,
    /// Offset of the 4-byte body length field inside the header. Default: 1.
    pub length_offset: usize,
    /// Initial accumulation buffer size. Default: 1024.
    pub initial_buffer_size: usize,
    /// Upper bound on a single growth step. Default: 2048.
    pub growth_cap: usize,
    /// Largest capacity the accumulation buffer may reach.
    pub max_buffer_size: usize,
    /// Largest frame (header + body) accepted from the wire. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Number of dispatch workers. Default: 2x available parallelism.
    pub pool_size: usize,
    /// Decoded datagrams allowed to wait for a worker before the reader blocks.
    pub queue_capacity: usize,
    /// Name of the reading thread; dispatch workers derive theirs from it.
    pub thread_name: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            header_len: HEADER_LEN,
            length_offset: LENGTH_OFFSET,
            initial_buffer_size: DEFAULT_BUFFER_SIZE,
            growth_cap: DEFAULT_GROWTH_CAP,
            max_buffer_size: DEFAULT_MAX_CAPACITY,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            pool_size: default_pool_size(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            thread_name: "datagram-reader".to_string(),
        }
    }
}

impl ReaderConfig {
    /// Check that the configured header can hold the length field and fits the buffer.
    pub fn validate(&self) -> Result<()> {
        if self.header_len == 0 {
            return Err(FrameError::InvalidConfig(
                "header_len must be greater than zero".to_string(),
            ));
        }
        let length_end = self.length_offset.checked_add(LENGTH_FIELD_LEN);
        if length_end.is_none_or(|end| end > self.header_len) {
            return Err(FrameError::InvalidConfig(format!(
                "length field at offset {} does not fit a {}-byte header",
                self.length_offset, self.header_len
            )));
        }
        if self.initial_buffer_size < self.header_len {
            return Err(FrameError::InvalidConfig(format!(
                "initial_buffer_size {} is smaller than header_len {}",
                self.initial_buffer_size, self.header_len
            )));
        }
        if self.max_buffer_size < self.initial_buffer_size {
            return Err(FrameError::InvalidConfig(format!(
                "max_buffer_size {} is smaller than initial_buffer_size {}",
                self.max_buffer_size, self.initial_buffer_size
            )));
        }
        if self.max_frame_size < self.header_len {
            return Err(FrameError::InvalidConfig(format!(
                "max_frame_size {} is smaller than header_len {}",
                self.max_frame_size, self.header_len
            )));
        }
        if self.pool_size == 0 {
            return Err(FrameError::InvalidConfig(
                "pool_size must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(FrameError::InvalidConfig(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// [`validate`](Self::validate), then check that `codec` can decode the configured header.
    pub fn validate_for<C: DatagramCodec + ?Sized>(&self, codec: &C) -> Result<()> {
        self.validate()?;
        match codec.layout() {
            Some(layout)
                if layout.header_len != self.header_len
                    || layout.length_offset != self.length_offset =>
            {
                Err(FrameError::InvalidConfig(format!(
                    "codec expects a {}-byte header with the length at offset {}, \
                     config describes {} bytes with the length at offset {}",
                    layout.header_len, layout.length_offset, self.header_len, self.length_offset
                )))
            }
            _ => Ok(()),
        }
    }

    /// Growth policy derived from this configuration.
    pub fn growth_policy(&self) -> GrowthPolicy {
        GrowthPolicy {
            increment_cap: self.growth_cap,
            max_capacity: self.max_buffer_size,
        }
    }
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(2)
}
