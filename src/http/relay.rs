//! Upstream response relay.
//!
//! # Responsibilities
//! - Copy upstream status and headers onto the client response
//! - Stream the body in bounded chunks, flushing after each one
//! - Deliver data that arrived alongside a read error before stopping
//! - Release the upstream body on every exit path
//!
//! # Design Decisions
//! - The response head is built before the relay task starts, so headers
//!   always precede body bytes
//! - A bounded channel connects the relay task to the client connection;
//!   a slow client applies backpressure to the upstream read
//! - After the head is committed an error cannot be reported; the client
//!   stream is aborted and the client sees a truncated body

use std::future::Future;
use std::io;

use axum::body::{Body, BodyDataStream, HttpBody};
use axum::http::Response;
use axum::BoxError;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::RelayConfig;
use crate::http::error::error_chain;
use crate::observability::metrics;

/// How a read from the upstream body ended, if it did.
#[derive(Debug)]
pub enum ReadEnd {
    /// Clean end of stream.
    Eof,
    /// The upstream body failed.
    Failed(io::Error),
}

/// One step of reading the upstream body.
///
/// `data` may be non-empty even when `end` is set; it is written first.
#[derive(Debug, Default)]
pub struct ReadChunk {
    pub data: Bytes,
    pub end: Option<ReadEnd>,
}

impl ReadChunk {
    pub fn data(data: Bytes) -> Self {
        Self { data, end: None }
    }

    pub fn eof() -> Self {
        Self { data: Bytes::new(), end: Some(ReadEnd::Eof) }
    }

    pub fn failed(error: io::Error) -> Self {
        Self { data: Bytes::new(), end: Some(ReadEnd::Failed(error)) }
    }
}

/// A body being read from the upstream.
pub trait UpstreamBody: Send {
    /// Read at most `max` bytes.
    fn read_chunk(&mut self, max: usize) -> impl Future<Output = ReadChunk> + Send;
}

/// Destination of relayed body bytes.
pub trait ResponseSink: Send {
    fn write(&mut self, data: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Whether `flush` pushes buffered bytes to the client right away.
    fn supports_flush(&self) -> bool {
        false
    }

    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send {
        std::future::ready(Ok(()))
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("error reading upstream body: {0}")]
    Read(#[source] io::Error),

    #[error("error writing response: {0}")]
    Write(#[source] io::Error),
}

/// Copy `body` into `sink` until end of stream or the first failure.
///
/// Takes ownership of the body so it is dropped, and the upstream
/// connection released, whichever way this returns. Returns the number
/// of bytes written.
pub async fn relay_body<B, S>(mut body: B, sink: &mut S, chunk_size: usize) -> Result<u64, RelayError>
where
    B: UpstreamBody,
    S: ResponseSink,
{
    let mut written = 0u64;
    loop {
        let ReadChunk { data, end } = body.read_chunk(chunk_size).await;

        if !data.is_empty() {
            let len = data.len() as u64;
            sink.write(data).await.map_err(RelayError::Write)?;
            if sink.supports_flush() {
                sink.flush().await.map_err(RelayError::Write)?;
            }
            written += len;
        }

        match end {
            None => continue,
            Some(ReadEnd::Eof) => return Ok(written),
            Some(ReadEnd::Failed(e)) => return Err(RelayError::Read(e)),
        }
    }
}

/// [`UpstreamBody`] over an upstream response body.
///
/// Frames larger than the requested size are handed out in slices.
pub struct UpstreamResponseBody {
    frames: BodyDataStream,
    pending: Bytes,
}

impl UpstreamResponseBody {
    pub fn new(body: Body) -> Self {
        Self { frames: body.into_data_stream(), pending: Bytes::new() }
    }
}

impl UpstreamBody for UpstreamResponseBody {
    async fn read_chunk(&mut self, max: usize) -> ReadChunk {
        if self.pending.is_empty() {
            match self.frames.next().await {
                Some(Ok(bytes)) => self.pending = bytes,
                None => return ReadChunk::eof(),
                Some(Err(e)) => return ReadChunk::failed(io::Error::other(error_chain(&e))),
            }
        }
        let n = max.min(self.pending.len());
        ReadChunk::data(self.pending.split_to(n))
    }
}

type Frame = Result<Bytes, io::Error>;

/// [`ResponseSink`] feeding an axum response body through a channel.
///
/// Writes accumulate until `flush` sends them as one frame.
pub struct ChannelSink {
    tx: mpsc::Sender<Frame>,
    buffer: BytesMut,
}

impl ChannelSink {
    /// Create a sink and the response body it feeds.
    pub fn channel(capacity: usize) -> (Self, Body) {
        let (tx, mut rx) = mpsc::channel::<Frame>(capacity);
        let stream = futures_util::stream::poll_fn(move |cx| rx.poll_recv(cx));
        let sink = Self { tx, buffer: BytesMut::new() };
        (sink, Body::from_stream(stream))
    }

    /// Send buffered bytes, then end the client stream cleanly.
    pub async fn close(mut self) -> io::Result<()> {
        self.send_buffer().await
    }

    /// Send buffered bytes, then fail the client stream so the
    /// connection is cut instead of ending as if complete.
    pub async fn abort(mut self, error: io::Error) {
        if self.send_buffer().await.is_ok() {
            let _ = self.tx.send(Err(error)).await;
        }
    }

    async fn send_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let frame = self.buffer.split().freeze();
        self.tx.send(Ok(frame)).await.map_err(|_| client_gone())
    }
}

impl ResponseSink for ChannelSink {
    async fn write(&mut self, data: Bytes) -> io::Result<()> {
        if self.tx.is_closed() {
            return Err(client_gone());
        }
        self.buffer.extend_from_slice(&data);
        Ok(())
    }

    fn supports_flush(&self) -> bool {
        true
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.send_buffer().await
    }
}

fn client_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

/// Turn an upstream response into the client response.
///
/// Status and headers are copied synchronously; the body is relayed by a
/// spawned task that owns the upstream body until it finishes. `url` only
/// labels log events.
pub fn respond<B>(upstream: Response<B>, config: &RelayConfig, url: &str) -> Response<Body>
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, upstream_body) = upstream.into_parts();
    let (mut sink, body) = ChannelSink::channel(config.channel_capacity);
    let chunk_size = config.chunk_size;
    let url = url.to_string();

    tokio::spawn(async move {
        let upstream_body = UpstreamResponseBody::new(Body::new(upstream_body));
        let result = relay_body(upstream_body, &mut sink, chunk_size).await;
        match result {
            Ok(bytes) => {
                metrics::record_relay_bytes(bytes);
                if let Err(e) = sink.close().await {
                    metrics::record_relay_failure("write");
                    tracing::debug!(upstream = %url, error = %e, "Client went away at end of stream");
                }
            }
            Err(RelayError::Read(e)) => {
                metrics::record_relay_failure("read");
                tracing::error!(upstream = %url, error = %e, "Error reading response body");
                sink.abort(e).await;
            }
            Err(RelayError::Write(e)) => {
                metrics::record_relay_failure("write");
                tracing::warn!(upstream = %url, error = %e, "Error writing response");
            }
        }
    });

    let mut response = Response::new(body);
    *response.status_mut() = parts.status;
    *response.headers_mut() = parts.headers;
    response
}
