use std::time::Duration;

use crate::container::ContainerID;
use crate::{runtime, sink};

/// Errors reported by [`Supervisor`](super::Supervisor) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no collector running for container `{0}`")]
    NotFound(ContainerID),
    #[error("failed to inspect container `{id}`: {source}")]
    Inspect {
        id: ContainerID,
        #[source]
        source: runtime::Error,
    },
    #[error("failed to enumerate running containers: {0}")]
    Enumerate(#[source] runtime::Error),
    #[error("{remaining} tasks still alive after {timeout:?}")]
    StopTimeout { remaining: usize, timeout: Duration },
    #[error("failed to subscribe to runtime events: {0}")]
    EventSubscribe(#[source] runtime::Error),
    #[error("failed to read runtime event: {0}")]
    EventStream(#[source] runtime::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a collector task ends on its own.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("failed to open stats stream for container `{id}`: {source}")]
    Subscribe {
        id: ContainerID,
        #[source]
        source: runtime::Error,
    },
    #[error("stats stream for container `{id}` failed: {source}")]
    Stream {
        id: ContainerID,
        #[source]
        source: runtime::Error,
    },
    #[error("failed to publish stats for container `{id}`: {source}")]
    Publish {
        id: ContainerID,
        #[source]
        source: sink::Error,
    },
}
