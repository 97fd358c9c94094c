use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Datagram header: version (1) + length (4) + charset (1) + kind (1) + reserved (1) + id (8).
pub const HEADER_LEN: usize = 16;

/// Byte offset of the body length field inside the header.
pub const LENGTH_OFFSET: usize = 1;

/// Width of the body length field.
pub const LENGTH_FIELD_LEN: usize = 4;

/// Protocol version written by [`encode_datagram`].
pub const VERSION: u8 = 1;

/// Charset id for UTF-8 bodies.
pub const CHARSET_UTF8: u8 = 0;

/// A decoded datagram. Immutable once produced; clones share the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Protocol version from the header.
    pub version: u8,
    /// Charset of the body.
    pub charset: u8,
    /// Datagram kind (see [`crate::kind`]).
    pub kind: u8,
    /// Sender-assigned message id.
    pub id: u64,
    /// The datagram body.
    pub body: Bytes,
}

impl Datagram {
    /// Create a UTF-8 datagram of the current protocol version.
    pub fn new(kind: u8, id: u64, body: impl Into<Bytes>) -> Self {
        Self {
            version: VERSION,
            charset: CHARSET_UTF8,
            kind,
            id,
            body: body.into(),
        }
    }

    /// The total wire size of this datagram (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_LEN + self.body.len()
    }

    /// The body as text, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(self.body.as_ref()).ok()
    }
}

/// Read the 4-byte big-endian body length stored at `offset`.
pub fn decode_length(header: &[u8], offset: usize) -> Result<usize> {
    let end = offset.saturating_add(LENGTH_FIELD_LEN);
    let field = header.get(offset..end).ok_or(FrameError::Truncated {
        len: header.len(),
        needed: end,
    })?;
    let raw: [u8; LENGTH_FIELD_LEN] = field.try_into().map_err(|_| FrameError::Truncated {
        len: header.len(),
        needed: end,
    })?;
    Ok(u32::from_be_bytes(raw) as usize)
}

/// Header geometry a codec was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Fixed header length in bytes.
    pub header_len: usize,
    /// Offset of the 4-byte body length field.
    pub length_offset: usize,
}

/// Converts raw frame bytes into structured messages.
///
/// The accumulator only ever calls [`decode_length`](DatagramCodec::decode_length)
/// with the header bytes, and [`decode`](DatagramCodec::decode) with exactly one
/// complete frame.
pub trait DatagramCodec: Send + Sync + 'static {
    /// The message type produced for each frame.
    type Item: Send + 'static;

    /// The only header layout this codec can decode, or `None` if it follows
    /// whatever the reader configuration describes.
    fn layout(&self) -> Option<HeaderLayout> {
        None
    }

    /// Body length declared by `header`, read at `offset`.
    fn decode_length(&self, header: &[u8], offset: usize) -> Result<usize> {
        decode_length(header, offset)
    }

    /// Decode one complete frame (header included).
    fn decode(&self, frame: &[u8]) -> Result<Self::Item>;

    /// Decode an owned frame. Codecs that keep part of the frame can slice it
    /// instead of copying.
    fn decode_bytes(&self, frame: Bytes) -> Result<Self::Item> {
        self.decode(&frame)
    }
}

/// The default binary codec for [`Datagram`] frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

/// Layout of the binary datagram header.
pub const BINARY_LAYOUT: HeaderLayout = HeaderLayout {
    header_len: HEADER_LEN,
    length_offset: LENGTH_OFFSET,
};

impl BinaryCodec {
    // Validates the header and returns everything but the body.
    fn header(frame: &[u8]) -> Result<Datagram> {
        if frame.len() < HEADER_LEN {
            return Err(FrameError::Truncated {
                len: frame.len(),
                needed: HEADER_LEN,
            });
        }

        let version = frame[0];
        if version != VERSION {
            return Err(FrameError::InvalidVersion {
                found: version,
                expected: VERSION,
            });
        }

        let declared = decode_length(frame, LENGTH_OFFSET)?;
        let actual = frame.len() - HEADER_LEN;
        if declared != actual {
            return Err(FrameError::LengthMismatch { declared, actual });
        }

        Ok(Datagram {
            version,
            charset: frame[5],
            kind: frame[6],
            id: (&frame[8..HEADER_LEN]).get_u64(),
            body: Bytes::new(),
        })
    }
}

impl DatagramCodec for BinaryCodec {
    type Item = Datagram;

    fn layout(&self) -> Option<HeaderLayout> {
        Some(BINARY_LAYOUT)
    }

    fn decode(&self, frame: &[u8]) -> Result<Datagram> {
        let mut datagram = Self::header(frame)?;
        datagram.body = Bytes::copy_from_slice(&frame[HEADER_LEN..]);
        Ok(datagram)
    }

    fn decode_bytes(&self, frame: Bytes) -> Result<Datagram> {
        let mut datagram = Self::header(&frame)?;
        datagram.body = frame.slice(HEADER_LEN..);
        Ok(datagram)
    }
}

/// Encode a datagram into the wire format.
///
/// Wire format:
/// ```text
/// ┌─────────┬────────────┬─────────┬──────┬──────────┬───────────┬──────────────┐
/// │ Version │ Length     │ Charset │ Kind │ Reserved │ Id        │ Body         │
/// │ (1B)    │ (4B BE)    │ (1B)    │ (1B) │ (1B)     │ (8B BE)   │ (Length B)   │
/// └─────────┴────────────┴─────────┴──────┴──────────┴───────────┴──────────────┘
/// ```
pub fn encode_datagram(datagram: &Datagram, dst: &mut BytesMut) -> Result<()> {
    let body = datagram.body.as_ref();
    if body.len() > u32::MAX as usize {
        return Err(FrameError::BodyTooLarge {
            size: body.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_LEN + body.len());
    dst.put_u8(datagram.version);
    dst.put_u32(body.len() as u32);
    dst.put_u8(datagram.charset);
    dst.put_u8(datagram.kind);
    dst.put_u8(0);
    dst.put_u64(datagram.id);
    dst.put_slice(body);
    Ok(())
}
