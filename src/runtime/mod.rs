//! Access to the container runtime.
//!
//! The collector only needs a handful of capabilities from the runtime: enumerate the running
//! containers, inspect a container for its name, describe the host, and stream stats and
//! lifecycle events. They are expressed by the [`Runtime`] trait so the supervisor can be driven
//! by the Docker Engine API in production and by an in-memory fake in tests.
//!
//! # Key Components
//!
//! - [`Runtime`] — the capability set consumed by the collector supervisor.
//! - [`PayloadStream`] — a lazy, non-restartable sequence of raw JSON payloads.
//! - [`DockerClient`] — Docker Engine API client over a unix socket or TCP, built on bollard.
//! - [`LifecycleEvent`] — a decoded container start/die notification.
mod docker;
mod error;
mod event;

pub use docker::{DockerClient, DockerStream, Endpoint};
pub use error::{Error, Result};
pub use event::{EventKind, LifecycleEvent};

use crate::container::{ContainerID, ContainerIdentity};
use crate::host::HostIdentity;

/// A lazy, unbounded sequence of raw JSON payloads.
///
/// `Ok(None)` marks the end of the stream. A stream cannot be restarted once it ended or failed.
pub trait PayloadStream: Send + 'static {
    fn next_payload(&mut self) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Capabilities the collector consumes from the container runtime.
pub trait Runtime: Send + Sync + 'static {
    type Stream: PayloadStream;

    /// Lists the ids of all currently running containers.
    fn list_containers(&self) -> impl Future<Output = Result<Vec<ContainerID>>> + Send;

    /// Resolves the identity (i.e. the name) of a container.
    fn inspect(&self, id: &ContainerID)
    -> impl Future<Output = Result<ContainerIdentity>> + Send;

    /// Describes the host the runtime is running on.
    fn host_info(&self) -> impl Future<Output = Result<HostIdentity>> + Send;

    /// Opens the stats feed of a single container.
    fn stats(&self, id: &ContainerID) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Opens the lifecycle event feed of the runtime.
    fn events(&self) -> impl Future<Output = Result<Self::Stream>> + Send;
}
