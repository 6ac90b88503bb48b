use crate::sink::Capability;
use thiserror::Error;

pub type StickyHeaderResult<T> = std::result::Result<T, StickyHeaderError>;

/// Describes things that can go wrong around the sticky header middleware
#[derive(Debug, Error)]
pub enum StickyHeaderError {
  /// Requested an optional sink capability the underlying sink does not support.
  /// This is a report, not a failure of the sink itself.
  #[error("Sink does not support {0}")]
  CapabilityUnsupported(Capability),

  // IO errors surfaced by real sink implementations (transport writes, takeover)
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  // Opaque failures bubbling up from a downstream handler
  #[error(transparent)]
  Other(#[from] anyhow::Error),
}
