mod affinity_cookie;
mod backend_header_sink;
mod sticky_header;
mod utils_headers;
mod utils_request;

use thiserror::Error;

pub use backend_header_sink::BackendHeaderSink;
pub use sticky_header::StickyHeader;

/// Result type for affinity cookie handling
type AffinityCookieResult<T> = std::result::Result<T, AffinityCookieError>;
/// Describes things that can go wrong around the affinity cookie.
/// None of these ever surface to a caller; they are absorbed into "no affinity signal".
#[derive(Debug, Error)]
pub enum AffinityCookieError {
  #[error("Empty Set-Cookie fragment")]
  EmptyCookieFragment,

  #[error("Invalid cookie structure")]
  InvalidCookieStructure,

  #[error("Not the affinity cookie")]
  NotAffinityCookie,

  #[error("No affinity cookie value")]
  NoAffinityCookieValue,

  #[error("Failed to build affinity cookie")]
  FailedToBuildAffinityCookie,
}
