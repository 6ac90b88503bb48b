mod constants;
mod error;
mod handler;
mod log;
mod middleware;
mod sink;

pub use crate::{
  constants::{AFFINITY_COOKIE_NAME, AFFINITY_HEADER_NAME, AFFINITY_QUERY_NAME},
  error::{StickyHeaderError, StickyHeaderResult},
  handler::RequestHandler,
  middleware::{BackendHeaderSink, StickyHeader},
  sink::{
    flush_now, take_over, Capability, ConnectionTakeover, RecordingSink, ResponseSink, SinkCapabilities, StreamingFlush,
    TakenConnection, TakeoverIo,
  },
};
