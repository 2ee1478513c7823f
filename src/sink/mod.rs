//! Publishing enriched records to the downstream pub/sub system.
mod error;
mod redis_sink;

pub use error::{Error, Result};
pub use redis_sink::RedisSink;

/// A fire-and-forget pub/sub channel.
///
/// There is no buffering and no acknowledgement: a failed publish is returned to the caller.
pub trait Sink: Send + Sync + 'static {
    fn publish(
        &self,
        channel: &str,
        payload: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
