use super::{
  backend_header_sink::BackendHeaderSink,
  utils_headers::has_cookie_crumb,
  utils_request::{affinity_token_from_query, synthesize_affinity_cookie},
};
use crate::{
  constants::AFFINITY_COOKIE_NAME, error::StickyHeaderResult, handler::RequestHandler, log::*, sink::ResponseSink,
};
use async_trait::async_trait;
use http::Request;

/// Middleware keeping a client's session affinity visible and synchronized between the
/// load balancer's `_TRAEFIK_BACKEND` cookie, the `X-Traefik-Backend` query parameter,
/// and the `X-Traefik-Backend` response header.
///
/// Before delegation it inspects the request: if the affinity cookie is absent and the
/// query string carries a token, a cookie is synthesized onto the request so downstream
/// cookie-based affinity logic observes it as if client-sent. The downstream handler
/// then runs against a [`BackendHeaderSink`] decorating the caller's sink, which
/// resolves the authoritative token when the status is finalized.
pub struct StickyHeader<H> {
  next: H,
}

impl<H> StickyHeader<H> {
  /// Wrap the next handler
  pub fn new(next: H) -> Self {
    Self { next }
  }
}

#[async_trait]
impl<H, B> RequestHandler<B> for StickyHeader<H>
where
  H: RequestHandler<B>,
  B: Send + 'static,
{
  async fn handle(&self, req: Request<B>, sink: &mut dyn ResponseSink) -> StickyHeaderResult<()> {
    let (mut parts, body) = req.into_parts();

    // read phase: an affinity cookie sent by the client always wins; only without one
    // is the query hint consulted
    let mut affinity_from_query = None;
    if !has_cookie_crumb(&parts.headers, AFFINITY_COOKIE_NAME) {
      if let Some(token) = affinity_token_from_query(&parts.uri) {
        match synthesize_affinity_cookie(&mut parts, &token) {
          Ok(()) => {
            debug!("Affinity cookie synthesized from the query hint: {}", token);
            affinity_from_query = Some(token);
          }
          Err(e) => debug!("Dropping the affinity query hint: {}", e),
        }
      }
    }

    let req = Request::from_parts(parts, body);
    let mut decorated = BackendHeaderSink::new(sink, affinity_from_query);
    self.next.handle(req, &mut decorated).await
  }
}
