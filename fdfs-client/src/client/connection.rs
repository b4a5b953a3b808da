//! TCP connection shared by the tracker and storage clients.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use log::{debug, info, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter, ReadBuf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use fdfs_protocol::{BodyReader, Command, FixedLayout, Frame};

use crate::config::ClientConfig;
use crate::error::ClientError;

type Reader = BufReader<OwnedReadHalf>;
type Writer = BufWriter<OwnedWriteHalf>;

/// One connection to a tracker or storage server.
///
/// Exchanges are strictly sequential: a request is written and flushed in
/// full before its response is read.
pub(crate) struct Connection {
    addr: String,
    reader: Reader,
    writer: Writer,
    /// Reused for every request and response on this connection.
    frame: Frame,
    /// Body bytes of the last response that the caller never read.
    unread: u64,
}

impl Connection {
    /// Connect to `addr` (`host:port`).
    pub async fn open(addr: &str, config: &ClientConfig) -> Result<Self, ClientError> {
        debug!("Connecting to {} (timeout {:?})", addr, config.connect_timeout);

        let stream = match tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                return Err(ClientError::Connect {
                    addr: addr.to_string(),
                    source: e,
                })
            }
            Err(_) => return Err(ClientError::ConnectTimeout(addr.to_string())),
        };

        stream.set_nodelay(true).map_err(|e| ClientError::Connect {
            addr: addr.to_string(),
            source: e,
        })?;
        info!("Connected to {}", addr);

        let (reader, writer) = stream.into_split();
        Ok(Self {
            addr: addr.to_string(),
            reader: BufReader::with_capacity(config.io_buffer_size, reader),
            writer: BufWriter::with_capacity(config.io_buffer_size, writer),
            frame: Frame::default(),
            unread: 0,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Start a new request and return the frame to fill in.
    pub fn begin(&mut self, command: Command) -> &mut Frame {
        self.frame.reset();
        self.frame.set_command(command);
        &mut self.frame
    }

    /// Send the prepared frame and flush it to the socket.
    pub async fn send(&mut self) -> Result<(), ClientError> {
        self.drain_unread().await?;
        self.frame.encode(&mut self.writer).await?;
        self.writer.flush().await?;
        self.log_sent();
        Ok(())
    }

    /// Send the prepared frame followed by `size` bytes streamed from
    /// `attachment`, then flush.
    pub async fn send_with_attachment<A>(&mut self, attachment: A, size: u64) -> Result<(), ClientError>
    where
        A: AsyncRead + Unpin,
    {
        self.drain_unread().await?;
        self.frame
            .encode_with_attachment(&mut self.writer, attachment, size)
            .await?;
        self.writer.flush().await?;
        self.log_sent();
        Ok(())
    }

    /// Read the next response header and return its body.
    pub async fn receive(&mut self) -> Result<ResponseStream<'_>, ClientError> {
        self.frame.reset();
        let body = match self.frame.decode(&mut self.reader).await {
            Ok(body) => body,
            Err(e) => {
                if let Some(code) = e.status_code() {
                    debug!("<- {} status={}", self.addr, code);
                }
                return Err(e.into());
            }
        };

        debug!("<- {} len={}", self.addr, body.remaining());
        Ok(ResponseStream {
            body,
            unread: &mut self.unread,
        })
    }

    /// Flush and shut down the write half.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        info!("Closed connection to {}", self.addr);
        Ok(())
    }

    /// Skip whatever an abandoned response left on the socket.
    async fn drain_unread(&mut self) -> Result<(), ClientError> {
        if self.unread == 0 {
            return Ok(());
        }

        warn!(
            "Discarding {} unread response bytes from {}",
            self.unread, self.addr
        );
        let expected = self.unread;
        let mut leftover = (&mut self.reader).take(expected);
        let skipped = tokio::io::copy(&mut leftover, &mut tokio::io::sink()).await?;
        if skipped < expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed with {} body bytes outstanding", expected - skipped),
            )
            .into());
        }
        self.unread = 0;
        Ok(())
    }

    fn log_sent(&self) {
        let header = self.frame.header();
        trace!("-> {} header {:02X?}", self.addr, header.to_bytes());
        debug!(
            "-> {} cmd={} len={}",
            self.addr, header.command, header.length
        );
    }
}

/// Body of one response, read directly from the connection.
///
/// Yields exactly the bytes of this response. Bytes left unread when it is
/// dropped are skipped before the next request on the same client.
pub struct ResponseStream<'a> {
    body: BodyReader<'a, Reader>,
    unread: &'a mut u64,
}

impl ResponseStream<'_> {
    /// Body bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.body.remaining()
    }

    /// Decode one fixed-layout record from the front of the body.
    pub async fn read_fixed<T: FixedLayout>(&mut self) -> Result<T, ClientError> {
        Ok(self.body.read_fixed::<T>().await?)
    }

    /// Read the rest of the body into memory.
    pub async fn read_remaining(&mut self) -> Result<Vec<u8>, ClientError> {
        Ok(self.body.read_remaining().await?)
    }

    /// Skip the rest of the body now instead of before the next request.
    pub async fn discard(&mut self) -> Result<u64, ClientError> {
        Ok(self.body.discard().await?)
    }
}

impl AsyncRead for ResponseStream<'_> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().body).poll_read(cx, buf)
    }
}

impl Drop for ResponseStream<'_> {
    fn drop(&mut self) {
        *self.unread = self.body.remaining();
    }
}
