use super::{
  affinity_cookie::AffinityCookie,
  utils_headers::{
    add_header_entry_overwrite_if_exist, append_header_entry_with_comma, append_set_cookie_entry,
    extract_affinity_from_set_cookie,
  },
};
use crate::{
  constants::{AFFINITY_COOKIE_NAME, AFFINITY_HEADER_NAME},
  error::StickyHeaderResult,
  log::*,
  sink::{Capability, ConnectionTakeover, ResponseSink, SinkCapabilities, StreamingFlush},
};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::{header, HeaderMap, StatusCode};

/// Response-writer decorator reconciling the affinity channels when the downstream
/// handler finalizes the status: an affinity cookie in the response's own `Set-Cookie`
/// always wins, then the query-derived candidate recorded at request time; the resolved
/// token is exposed through the `X-Traefik-Backend` header. Status code and body are
/// forwarded to the wrapped sink untouched.
pub struct BackendHeaderSink<'a> {
  inner: &'a mut dyn ResponseSink,
  affinity_from_query: Option<String>,
  capabilities: SinkCapabilities,
  head_written: bool,
}

impl<'a> BackendHeaderSink<'a> {
  /// Wrap a sink, probing its optional capabilities once at construction
  pub fn new(inner: &'a mut dyn ResponseSink, affinity_from_query: Option<String>) -> Self {
    let capabilities = SinkCapabilities::probe(inner);
    Self {
      inner,
      affinity_from_query,
      capabilities,
      head_written: false,
    }
  }

  fn reconcile_affinity(&mut self) {
    if let Err(e) = reconcile_affinity_headers(self.inner.headers_mut(), self.affinity_from_query.take()) {
      debug!("Failed to reconcile affinity headers: {}", e);
    }
  }
}

/// Apply the affinity precedence to the response's accumulated headers.
/// A `Set-Cookie` from downstream wins; otherwise the query candidate is promoted to
/// both the cookie and the header, keeping the two channels in sync for the client's
/// next request. Either way the exposed header name is declared to cross-origin
/// clients.
fn reconcile_affinity_headers(headers: &mut HeaderMap, affinity_from_query: Option<String>) -> Result<()> {
  if let Some(token) = extract_affinity_from_set_cookie(headers, AFFINITY_COOKIE_NAME) {
    debug!("Affinity cookie set by the downstream handler: {}", token);
    add_header_entry_overwrite_if_exist(headers, AFFINITY_HEADER_NAME, &token)?;
  } else if let Some(token) = affinity_from_query {
    debug!("Affinity token promoted from the query string: {}", token);
    append_set_cookie_entry(headers, AffinityCookie::build(AFFINITY_COOKIE_NAME, token.as_str())?)?;
    add_header_entry_overwrite_if_exist(headers, AFFINITY_HEADER_NAME, &token)?;
  }
  append_header_entry_with_comma(headers, header::ACCESS_CONTROL_EXPOSE_HEADERS.as_str(), AFFINITY_HEADER_NAME)
}

#[async_trait]
impl ResponseSink for BackendHeaderSink<'_> {
  fn headers(&self) -> &HeaderMap {
    self.inner.headers()
  }

  fn headers_mut(&mut self) -> &mut HeaderMap {
    self.inner.headers_mut()
  }

  /// Affinity reconciliation latches on the first head write; the head block cannot be
  /// mutated once on the wire, and repeated writes must not run it again
  async fn write_head(&mut self, status: StatusCode) -> StickyHeaderResult<()> {
    if !self.head_written {
      self.head_written = true;
      self.reconcile_affinity();
    }
    self.inner.write_head(status).await
  }

  async fn write_body(&mut self, chunk: Bytes) -> StickyHeaderResult<()> {
    self.inner.write_body(chunk).await
  }

  fn streaming(&mut self) -> Option<&mut dyn StreamingFlush> {
    if self.capabilities.supports(Capability::StreamingFlush) {
      self.inner.streaming()
    } else {
      None
    }
  }

  fn takeover(&mut self) -> Option<&mut dyn ConnectionTakeover> {
    if self.capabilities.supports(Capability::ConnectionTakeover) {
      self.inner.takeover()
    } else {
      None
    }
  }
}
