use super::{Capability, ConnectionTakeover, ResponseSink, StreamingFlush, TakenConnection};
use crate::error::{StickyHeaderError, StickyHeaderResult};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};

/// In-memory [`ResponseSink`] recording everything written to it, for tests of handlers
/// and middlewares. Optional capabilities are opt-in per instance so that capability
/// pass-through is testable both ways.
#[derive(Default)]
pub struct RecordingSink {
  headers: HeaderMap,
  status: Option<StatusCode>,
  body: BytesMut,
  flush_count: usize,
  streaming_enabled: bool,
  takeover_conn: Option<TakenConnection>,
}

impl RecordingSink {
  pub fn new() -> Self {
    Self::default()
  }

  /// Enable the streaming flush capability
  pub fn with_streaming(mut self) -> Self {
    self.streaming_enabled = true;
    self
  }

  /// Enable the connection takeover capability, yielding the given connection when taken
  pub fn with_takeover(mut self, conn: TakenConnection) -> Self {
    self.takeover_conn = Some(conn);
    self
  }

  /// Status written by the handler, if any; like a real transport, the first write wins
  pub fn status(&self) -> Option<StatusCode> {
    self.status
  }

  /// Body bytes written so far
  pub fn body(&self) -> &[u8] {
    &self.body
  }

  /// Number of streaming flushes requested so far
  pub fn flush_count(&self) -> usize {
    self.flush_count
  }
}

#[async_trait]
impl ResponseSink for RecordingSink {
  fn headers(&self) -> &HeaderMap {
    &self.headers
  }

  fn headers_mut(&mut self) -> &mut HeaderMap {
    &mut self.headers
  }

  async fn write_head(&mut self, status: StatusCode) -> StickyHeaderResult<()> {
    if self.status.is_none() {
      self.status = Some(status);
    }
    Ok(())
  }

  async fn write_body(&mut self, chunk: Bytes) -> StickyHeaderResult<()> {
    self.body.extend_from_slice(&chunk);
    Ok(())
  }

  fn streaming(&mut self) -> Option<&mut dyn StreamingFlush> {
    if self.streaming_enabled {
      Some(self)
    } else {
      None
    }
  }

  fn takeover(&mut self) -> Option<&mut dyn ConnectionTakeover> {
    if self.takeover_conn.is_some() {
      Some(self)
    } else {
      None
    }
  }
}

#[async_trait]
impl StreamingFlush for RecordingSink {
  async fn flush(&mut self) -> StickyHeaderResult<()> {
    self.flush_count += 1;
    Ok(())
  }
}

#[async_trait]
impl ConnectionTakeover for RecordingSink {
  async fn take_over(&mut self) -> StickyHeaderResult<TakenConnection> {
    // the capability disappears with the connection once it has been taken
    self
      .takeover_conn
      .take()
      .ok_or(StickyHeaderError::CapabilityUnsupported(Capability::ConnectionTakeover))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn first_status_wins() {
    let mut sink = RecordingSink::new();
    sink.write_head(StatusCode::OK).await.unwrap();
    sink.write_head(StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(sink.status(), Some(StatusCode::OK));
  }

  #[tokio::test]
  async fn body_accumulates_across_writes() {
    let mut sink = RecordingSink::new();
    sink.write_body(Bytes::from_static(b"hello ")).await.unwrap();
    sink.write_body(Bytes::from_static(b"world")).await.unwrap();
    assert_eq!(sink.body(), b"hello world");
  }

  #[test]
  fn capabilities_are_opt_in() {
    let mut sink = RecordingSink::new();
    assert!(sink.streaming().is_none());
    assert!(sink.takeover().is_none());

    let (_client, server) = tokio::io::duplex(8);
    let mut sink = RecordingSink::new().with_streaming().with_takeover(Box::new(server));
    assert!(sink.streaming().is_some());
    assert!(sink.takeover().is_some());
  }

  #[tokio::test]
  async fn takeover_yields_the_given_connection() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (mut client, server) = tokio::io::duplex(64);
    let mut sink = RecordingSink::new().with_takeover(Box::new(server));

    let mut conn = sink.takeover().unwrap().take_over().await.unwrap();
    conn.write_all(b"ping").await.unwrap();

    let mut buf = [0u8; 4];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    // taken exactly once
    assert!(sink.takeover().is_none());
  }
}
