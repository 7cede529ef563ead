//! Payload-level connection over a framed transport.
//!
//! [`Connection`] turns the packet stream into a strict request/response
//! channel of logical payloads and enforces an optional I/O time budget.

use std::future::Future;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::CodecError;
use crate::framed::PacketStream;
use crate::message::{PayloadAssembler, split_payload};
use crate::packet_codec::{MySqlCodec, Packet};

/// A connection exchanging logical payloads.
///
/// # Timeouts
///
/// [`set_timeout`](Self::set_timeout) installs a time budget shared by every
/// subsequent I/O call. Each call is bounded by what is left of the budget and
/// the elapsed time is subtracted afterwards; once it reaches zero, further
/// calls fail immediately with [`CodecError::Timeout`] until a new budget is
/// set.
///
/// # Example
///
/// ```rust,ignore
/// use mysql_codec::Connection;
/// use tokio::net::TcpStream;
///
/// let stream = TcpStream::connect("localhost:3306").await?;
/// let mut conn = Connection::new(stream);
///
/// let handshake = conn.read_payload().await?;
/// ```
pub struct Connection<T>
where
    T: AsyncRead + AsyncWrite,
{
    stream: PacketStream<T>,
    assembler: PayloadAssembler,
    remaining: Option<Duration>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new connection from a transport.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, MySqlCodec::new())
    }

    /// Create a new connection with a custom codec.
    pub fn with_codec(transport: T, codec: MySqlCodec) -> Self {
        Self {
            stream: PacketStream::with_codec(transport, codec),
            assembler: PayloadAssembler::new(),
            remaining: None,
        }
    }

    /// Set (or clear) the I/O time budget.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.remaining = timeout;
    }

    /// What is left of the I/O time budget.
    #[must_use]
    pub fn remaining_timeout(&self) -> Option<Duration> {
        self.remaining
    }

    /// Restart the packet sequence for a new command.
    pub fn reset_sequence(&mut self) {
        self.stream.codec_mut().reset_sequence();
        self.assembler.clear();
    }

    /// Start a new command and send its payload.
    pub async fn send_command(&mut self, payload: Bytes) -> Result<(), CodecError> {
        self.reset_sequence();
        self.send_payload(payload).await
    }

    /// Send a logical payload, continuing the current sequence.
    ///
    /// Payloads of `0xFFFFFF` bytes or more are split across packets.
    pub async fn send_payload(&mut self, payload: Bytes) -> Result<(), CodecError> {
        tracing::trace!(length = payload.len(), "sending payload");
        let stream = &mut self.stream;
        timed(&mut self.remaining, async move {
            for chunk in split_payload(&payload) {
                stream.feed(Packet::new(chunk)).await?;
            }
            stream.flush().await
        })
        .await
    }

    /// Read the next logical payload.
    ///
    /// Returns [`CodecError::ConnectionClosed`] if the peer closes the
    /// connection first.
    pub async fn read_payload(&mut self) -> Result<Bytes, CodecError> {
        let stream = &mut self.stream;
        let assembler = &mut self.assembler;
        timed(&mut self.remaining, async move {
            loop {
                match stream.next().await {
                    Some(Ok(packet)) => {
                        if let Some(payload) = assembler.push(packet) {
                            return Ok(payload);
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => return Err(CodecError::ConnectionClosed),
                }
            }
        })
        .await
    }

    /// Flush and shut down the write side of the transport.
    pub async fn close(&mut self) -> Result<(), CodecError> {
        let stream = &mut self.stream;
        timed(&mut self.remaining, async move { stream.close().await }).await
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.stream.get_ref()
    }

    /// Get a reference to the codec.
    pub fn codec(&self) -> &MySqlCodec {
        self.stream.codec()
    }

    /// Consume the connection and return the underlying transport.
    pub fn into_inner(self) -> T {
        self.stream.into_inner()
    }
}

/// Run one I/O call within the remaining budget and charge its duration.
async fn timed<F, R>(remaining: &mut Option<Duration>, io: F) -> Result<R, CodecError>
where
    F: Future<Output = Result<R, CodecError>>,
{
    let Some(budget) = *remaining else {
        return io.await;
    };
    if budget.is_zero() {
        return Err(CodecError::Timeout);
    }

    let started = Instant::now();
    let result = tokio::time::timeout(budget, io).await;
    let left = budget.saturating_sub(started.elapsed());
    *remaining = Some(left);

    match result {
        Err(_) => {
            *remaining = Some(Duration::ZERO);
            Err(CodecError::Timeout)
        }
        // A socket error that surfaces at the deadline is reported as the timeout.
        Ok(Err(CodecError::Io(_))) if left.is_zero() => Err(CodecError::Timeout),
        Ok(result) => result,
    }
}

impl<T> std::fmt::Debug for Connection<T>
where
    T: AsyncRead + AsyncWrite + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("remaining_timeout", &self.remaining)
            .field("has_partial_payload", &self.assembler.has_partial())
            .finish_non_exhaustive()
    }
}
