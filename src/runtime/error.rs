/// Errors returned while talking to the container runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid runtime endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("failed to connect to runtime at `{endpoint}`: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: bollard::errors::Error,
    },
    #[error("runtime request `{operation}` failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: bollard::errors::Error,
    },
    #[error("invalid container id in `{operation}` response: {source}")]
    Container {
        operation: &'static str,
        #[source]
        source: crate::container::Error,
    },
    #[error("failed to encode `{operation}` payload: {source}")]
    Encode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode lifecycle event: {0}")]
    Event(#[source] serde_json::Error),
    #[error("lifecycle event without container id: {0}")]
    MissingEventID(String),
    #[error("invalid container id in lifecycle event: {0}")]
    InvalidEventID(#[source] crate::container::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
