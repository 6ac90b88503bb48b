use crate::{error::StickyHeaderResult, sink::ResponseSink};
use async_trait::async_trait;
use http::Request;

/// Opaque downstream handler invoked once per exchange.
/// It may read the affinity cookie from the (possibly augmented) request and may append
/// its own `Set-Cookie` to the sink's headers before finalizing the status; middlewares
/// wrapping it observe but never constrain that choice.
#[async_trait]
pub trait RequestHandler<B>: Send + Sync {
  /// Serve one request, writing the response through the given sink
  async fn handle(&self, req: Request<B>, sink: &mut dyn ResponseSink) -> StickyHeaderResult<()>;
}
