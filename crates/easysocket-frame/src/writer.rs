use std::io::{ErrorKind, Write};

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::codec::{encode_datagram, Datagram};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes complete datagrams to any `Write` stream.
pub struct DatagramWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> DatagramWriter<T> {
    /// Create a new datagram writer.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write one complete datagram (blocking).
    pub fn write_datagram(&mut self, datagram: &Datagram) -> Result<()> {
        self.buf.clear();
        encode_datagram(datagram, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        debug!(id = datagram.id, kind = datagram.kind, size = offset, "datagram written");

        self.flush()
    }

    /// Encode and send a UTF-8 datagram of the given kind.
    pub fn send(&mut self, kind: u8, id: u64, body: impl Into<Bytes>) -> Result<()> {
        self.write_datagram(&Datagram::new(kind, id, body))
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
