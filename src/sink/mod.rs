mod recorder;

use crate::{
  error::{StickyHeaderError, StickyHeaderResult},
  log::*,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite};

pub use recorder::RecordingSink;

/// IO bound of a connection handed over to the caller on takeover
pub trait TakeoverIo: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> TakeoverIo for T {}

/// Raw duplex connection yielded by [`ConnectionTakeover::take_over`], e.g. for WebSocket
pub type TakenConnection = Box<dyn TakeoverIo>;

/// Optional capability a sink may or may not support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
  StreamingFlush,
  ConnectionTakeover,
}

impl std::fmt::Display for Capability {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::StreamingFlush => write!(f, "streaming flush"),
      Self::ConnectionTakeover => write!(f, "connection takeover"),
    }
  }
}

/// Underlying response writer of one exchange.
/// Headers accumulate and stay mutable until the head is written; body chunks are
/// forwarded as written, so any backpressure is the implementation's own.
#[async_trait]
pub trait ResponseSink: Send {
  /// Response headers accumulated so far
  fn headers(&self) -> &HeaderMap;
  /// Mutable access to the accumulated headers.
  /// HTTP forbids mutation once the head block is on the wire, so implementations may
  /// ignore changes made after [`ResponseSink::write_head`].
  fn headers_mut(&mut self) -> &mut HeaderMap;
  /// Transmit the status line and the accumulated headers
  async fn write_head(&mut self, status: StatusCode) -> StickyHeaderResult<()>;
  /// Forward one body chunk
  async fn write_body(&mut self, chunk: Bytes) -> StickyHeaderResult<()>;
  /// Streaming flush when the sink supports it
  fn streaming(&mut self) -> Option<&mut dyn StreamingFlush> {
    None
  }
  /// Connection takeover when the sink supports it
  fn takeover(&mut self) -> Option<&mut dyn ConnectionTakeover> {
    None
  }
}

/// Push already-written bytes to the client before the response completes
#[async_trait]
pub trait StreamingFlush: Send {
  async fn flush(&mut self) -> StickyHeaderResult<()>;
}

/// Hand the raw connection over to the caller for protocol upgrades
#[async_trait]
pub trait ConnectionTakeover: Send {
  async fn take_over(&mut self) -> StickyHeaderResult<TakenConnection>;
}

/// Optional capabilities a sink exposed at probe time
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkCapabilities {
  pub streaming_flush: bool,
  pub connection_takeover: bool,
}

impl SinkCapabilities {
  /// Probe which optional capabilities the sink currently exposes
  pub fn probe(sink: &mut dyn ResponseSink) -> Self {
    let capabilities = Self {
      streaming_flush: sink.streaming().is_some(),
      connection_takeover: sink.takeover().is_some(),
    };
    debug!(
      "Probed sink capabilities: streaming flush = {}, connection takeover = {}",
      capabilities.streaming_flush, capabilities.connection_takeover
    );
    capabilities
  }

  pub fn supports(&self, capability: Capability) -> bool {
    match capability {
      Capability::StreamingFlush => self.streaming_flush,
      Capability::ConnectionTakeover => self.connection_takeover,
    }
  }
}

/// Flush through the sink's streaming capability, reporting sinks without one
pub async fn flush_now(sink: &mut dyn ResponseSink) -> StickyHeaderResult<()> {
  match sink.streaming() {
    Some(streaming) => streaming.flush().await,
    None => Err(StickyHeaderError::CapabilityUnsupported(Capability::StreamingFlush)),
  }
}

/// Take over the sink's underlying connection, reporting sinks without the capability
pub async fn take_over(sink: &mut dyn ResponseSink) -> StickyHeaderResult<TakenConnection> {
  match sink.takeover() {
    Some(takeover) => takeover.take_over().await,
    None => Err(StickyHeaderError::CapabilityUnsupported(Capability::ConnectionTakeover)),
  }
}
