//! Frame encoding and decoding.
//!
//! Frame format (all integers big-endian):
//! ```text
//! +----------+---------+--------+------------------+
//! |  Length  | Command | Status |       Body       |
//! |   u64    |   u8    |   u8   |    (variable)    |
//! +----------+---------+--------+------------------+
//! |  8 bytes | 1 byte  | 1 byte |  Length bytes    |
//! ```
//!
//! A nonzero status means the exchange failed and no body follows.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf, Take};

use crate::error::{FrameStatus, ProtocolError};
use crate::types::{Command, FixedLayout};

/// Frame header size: 8 (length) + 1 (command) + 1 (status) = 10 bytes.
pub const HEADER_SIZE: usize = 10;

/// Frame header information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// Number of body bytes after the header.
    pub length: u64,
    pub command: u8,
    pub status: u8,
}

impl FrameHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut raw = [0u8; HEADER_SIZE];
        let mut buf = &mut raw[..];
        buf.put_u64(self.length);
        buf.put_u8(self.command);
        buf.put_u8(self.status);
        raw
    }

    pub fn from_bytes(raw: &[u8; HEADER_SIZE]) -> Self {
        let mut buf = &raw[..];
        FrameHeader {
            length: buf.get_u64(),
            command: buf.get_u8(),
            status: buf.get_u8(),
        }
    }

    pub fn frame_status(&self) -> FrameStatus {
        FrameStatus::from(self.status)
    }
}

/// One request or response frame.
///
/// The body buffer collects fixed fields before sending. After a decode the
/// header holds the received values; call [`Frame::reset`] before reusing
/// the frame for another request.
#[derive(Debug, Default)]
pub struct Frame {
    header: FrameHeader,
    body: BytesMut,
    decoded: bool,
}

impl Frame {
    /// Create an empty frame for `command`.
    pub fn new(command: Command) -> Self {
        let mut frame = Frame::default();
        frame.set_command(command);
        frame
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn set_command(&mut self, command: Command) {
        self.header.command = command.into();
    }

    /// Set the status byte. Only servers send a nonzero status.
    pub fn set_status(&mut self, status: u8) {
        self.header.status = status;
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Mutable access to the in-memory body.
    pub fn body_mut(&mut self) -> &mut BytesMut {
        &mut self.body
    }

    /// Append a fixed-layout record to the body.
    pub fn put_fixed<T: FixedLayout>(&mut self, record: &T) {
        record.put(&mut self.body);
    }

    /// Append raw bytes to the body.
    pub fn put_slice(&mut self, data: &[u8]) {
        self.body.put_slice(data);
    }

    /// Clear the header and body so the frame can carry a new exchange.
    pub fn reset(&mut self) {
        self.header = FrameHeader::default();
        self.body.clear();
        self.decoded = false;
    }

    fn ensure_encodable(&self) -> Result<(), ProtocolError> {
        if self.decoded {
            return Err(ProtocolError::FrameNotReset);
        }
        Ok(())
    }

    /// Write the header followed by the body.
    ///
    /// `length` is always computed from the body, and the header is written
    /// in a single call before any body bytes.
    pub async fn encode<W>(&mut self, w: &mut W) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.ensure_encodable()?;
        self.header.length = self.body.len() as u64;

        w.write_all(&self.header.to_bytes()).await?;
        w.write_all(&self.body).await?;
        Ok(())
    }

    /// Write the header, the body, then `size` bytes streamed from
    /// `attachment`.
    ///
    /// The attachment is copied through a small fixed buffer and never held
    /// in memory as a whole. If it ends before `size` bytes the peer has
    /// already been promised more data, so the connection must be dropped.
    pub async fn encode_with_attachment<W, A>(
        &mut self,
        w: &mut W,
        attachment: A,
        size: u64,
    ) -> Result<(), ProtocolError>
    where
        W: AsyncWrite + Unpin + ?Sized,
        A: AsyncRead + Unpin,
    {
        self.ensure_encodable()?;
        let body_len = self.body.len() as u64;
        self.header.length = body_len + size;

        w.write_all(&self.header.to_bytes()).await?;

        let mut source = AsyncReadExt::chain(&self.body[..], attachment.take(size));
        let copied = tokio::io::copy(&mut source, w).await?;
        if copied < self.header.length {
            return Err(ProtocolError::AttachmentTooShort {
                expected: size,
                actual: copied.saturating_sub(body_len),
            });
        }
        Ok(())
    }

    /// Read one frame header from `r` and return a reader over its body.
    ///
    /// A nonzero status fails with [`ProtocolError::Status`] without
    /// touching any bytes after the header. The returned reader yields at
    /// most `length` bytes, whatever else is buffered on `r`.
    pub async fn decode<'r, R>(&mut self, r: &'r mut R) -> Result<BodyReader<'r, R>, ProtocolError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut raw = [0u8; HEADER_SIZE];
        r.read_exact(&mut raw).await?;

        self.header = FrameHeader::from_bytes(&raw);
        self.body.clear();
        self.decoded = true;

        self.header.frame_status().into_result()?;
        Ok(BodyReader::new(r, self.header.length))
    }
}

/// Reader over exactly one frame body.
///
/// Ends after `length` bytes, and reports `UnexpectedEof` if the transport
/// closes before that.
pub struct BodyReader<'r, R: ?Sized> {
    inner: Take<&'r mut R>,
}

impl<'r, R> BodyReader<'r, R>
where
    R: AsyncRead + Unpin + ?Sized,
{
    pub fn new(inner: &'r mut R, length: u64) -> Self {
        BodyReader {
            inner: AsyncReadExt::take(inner, length),
        }
    }

    /// Body bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.inner.limit()
    }

    /// Decode one fixed-layout record from the front of the body.
    pub async fn read_fixed<T: FixedLayout>(&mut self) -> Result<T, ProtocolError> {
        let remaining = self.remaining();
        if remaining < T::SIZE as u64 {
            return Err(ProtocolError::IncompleteFrame {
                expected: T::SIZE,
                actual: remaining as usize,
            });
        }

        let mut raw = vec![0u8; T::SIZE];
        self.read_exact(&mut raw).await?;
        T::get(&mut Bytes::from(raw))
    }

    /// Read every byte left in the body.
    pub async fn read_remaining(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let capacity = self.remaining().min(64 * 1024) as usize;
        let mut out = Vec::with_capacity(capacity);
        self.read_to_end(&mut out).await?;
        Ok(out)
    }

    /// Read and drop the rest of the body, returning how many bytes were skipped.
    pub async fn discard(&mut self) -> Result<u64, ProtocolError> {
        let skipped = tokio::io::copy(self, &mut tokio::io::sink()).await?;
        Ok(skipped)
    }
}

impl<R> AsyncRead for BodyReader<'_, R>
where
    R: AsyncRead + Unpin + ?Sized,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.inner.limit() == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let before = buf.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) if buf.filled().len() == before => {
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("connection closed with {} body bytes outstanding", this.inner.limit()),
                )))
            }
            other => other,
        }
    }
}
