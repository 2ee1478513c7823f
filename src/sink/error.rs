#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to connect to sink at `{address}`: {source}")]
    Connect {
        address: String,
        #[source]
        source: redis::RedisError,
    },
    #[error("sink at `{address}` unavailable: {source}")]
    SinkUnavailable {
        address: String,
        #[source]
        source: redis::RedisError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
