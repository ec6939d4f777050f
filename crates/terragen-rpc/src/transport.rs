//! Length-prefixed TCP transport.
//!
//! Every call opens a fresh connection, writes one frame, reads the reply
//! until the server closes the connection, and drops the socket.
//!
//! Outgoing frame format:
//! ```text
//! +----------------+------------------+
//! |  4 bytes       |  N bytes         |
//! |  (length LE)   |  (JSON payload)  |
//! +----------------+------------------+
//! ```
//!
//! The reply is not length-prefixed; it ends at end-of-stream.

use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_util::SinkExt;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, FramedWrite};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// Maximum reply size accepted from the server (16 MB)
pub const MAX_REPLY_SIZE: usize = 16 * 1024 * 1024;

/// Length prefix size in bytes
const LENGTH_PREFIX_SIZE: usize = 4;

const READ_CHUNK_SIZE: usize = 1024;

/// Codec for frames carrying a 4-byte little-endian length prefix.
///
/// The client only encodes with it; decoding is the server side of the
/// framing and is what test servers use to read requests.
#[derive(Debug, Default)]
pub struct LengthPrefixCodec {
    current_length: Option<usize>,
}

impl LengthPrefixCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for LengthPrefixCodec {
    type Item = Bytes;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> std::result::Result<Option<Self::Item>, Self::Error> {
        if self.current_length.is_none() {
            if src.len() < LENGTH_PREFIX_SIZE {
                return Ok(None);
            }

            let len = src.get_u32_le() as usize;

            if len > MAX_REPLY_SIZE {
                return Err(CodecError::MessageTooLarge(len));
            }

            self.current_length = Some(len);
        }

        let Some(length) = self.current_length else {
            return Ok(None);
        };

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        self.current_length = None;
        Ok(Some(src.split_to(length).freeze()))
    }
}

impl Encoder<Bytes> for LengthPrefixCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> std::result::Result<(), Self::Error> {
        let length =
            u32::try_from(item.len()).map_err(|_| CodecError::MessageTooLarge(item.len()))?;

        dst.reserve(LENGTH_PREFIX_SIZE + item.len());
        dst.put_u32_le(length);
        dst.put_slice(&item);

        Ok(())
    }
}

/// Errors that can occur during codec operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),
}

/// One-shot transport to a fixed endpoint.
///
/// The timeout is captured at construction, so a client-side timeout change
/// never affects a call already in flight.
#[derive(Debug, Clone)]
pub struct Transport {
    host: String,
    port: u16,
    timeout: Duration,
}

impl Transport {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one framed payload and return everything the server wrote back
    /// before closing the connection.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` if the connection cannot be established or
    /// breaks, `Error::Timeout` if any socket operation exceeds the timeout,
    /// and `Error::Codec` if the payload or the reply exceeds the size limits.
    pub async fn send(&self, payload: Bytes) -> Result<Bytes> {
        let mut stream = self
            .bounded(TcpStream::connect((self.host.as_str(), self.port)))
            .await?;
        debug!(host = %self.host, port = self.port, "Connected to RPC server");

        let payload_len = payload.len();
        {
            let mut framed = FramedWrite::new(&mut stream, LengthPrefixCodec::new());
            match tokio::time::timeout(self.timeout, framed.send(payload)).await {
                Err(_) => return Err(self.timed_out("write")),
                Ok(Err(CodecError::Io(e))) => return Err(self.io_error(e)),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(())) => {}
            }
        }
        trace!(bytes = payload_len, "Sent framed request");

        let mut reply = BytesMut::with_capacity(READ_CHUNK_SIZE);
        loop {
            let read = self.bounded(stream.read_buf(&mut reply)).await?;
            if read == 0 {
                break;
            }
            trace!(bytes = read, total = reply.len(), "Received chunk");
            if reply.len() > MAX_REPLY_SIZE {
                return Err(CodecError::MessageTooLarge(reply.len()).into());
            }
            reply.reserve(READ_CHUNK_SIZE);
        }

        debug!(bytes = reply.len(), "Server closed connection");
        Ok(reply.freeze())
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = io::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(self.io_error(e)),
            Err(_) => Err(self.timed_out("socket operation")),
        }
    }

    fn io_error(&self, e: io::Error) -> Error {
        if e.kind() == io::ErrorKind::TimedOut {
            self.timed_out("socket operation")
        } else {
            Error::Connection(e)
        }
    }

    fn timed_out(&self, operation: &str) -> Error {
        warn!(
            host = %self.host,
            port = self.port,
            timeout = ?self.timeout,
            "RPC {operation} timed out"
        );
        Error::Timeout(self.timeout)
    }
}
