use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::str::FromStr;

use bollard::Docker;
use bollard::query_parameters::{
    EventsOptions, InspectContainerOptions, ListContainersOptions, StatsOptionsBuilder,
};
use futures::{Stream, StreamExt};
use serde::Serialize;

use super::{Error, PayloadStream, Result, Runtime};
use crate::container::{ContainerID, ContainerIdentity};
use crate::host::HostIdentity;

/// Timeout for a single Engine API request, not for the lifetime of a stream.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Address of a Docker Engine API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A unix domain socket, e.g. `/var/run/docker.sock`.
    Unix(PathBuf),
    /// A `host:port` pair reachable over plain TCP.
    Tcp(String),
}

impl FromStr for Endpoint {
    type Err = Error;

    /// Parses `unix://<path>`, `tcp://<host>:<port>`, `http://<host>:<port>` or a bare
    /// absolute socket path.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(Error::InvalidEndpoint(s.to_owned()));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = s
            .strip_prefix("tcp://")
            .or_else(|| s.strip_prefix("http://"))
        {
            let addr = addr.trim_end_matches('/');
            if addr.is_empty() {
                return Err(Error::InvalidEndpoint(s.to_owned()));
            }
            return Ok(Self::Tcp(addr.to_owned()));
        }
        if s.starts_with('/') {
            return Ok(Self::Unix(PathBuf::from(s)));
        }

        Err(Error::InvalidEndpoint(s.to_owned()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

/// Docker Engine API client backed by [`bollard`].
///
/// The underlying connection is established lazily, so an unreachable daemon surfaces on the
/// first request rather than in [`DockerClient::connect`].
#[derive(Debug, Clone)]
pub struct DockerClient {
    docker: Docker,
    endpoint: Endpoint,
}

impl DockerClient {
    /// Builds a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] if bollard rejects the endpoint, e.g. a socket path that does
    /// not exist.
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        let docker = match endpoint {
            Endpoint::Unix(path) => Docker::connect_with_unix(
                &path.to_string_lossy(),
                REQUEST_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            Endpoint::Tcp(addr) => Docker::connect_with_http(
                &format!("http://{}", addr),
                REQUEST_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
        }
        .map_err(|source| Error::Connect {
            endpoint: endpoint.to_string(),
            source,
        })?;
        log::trace!("Created runtime client for {}", endpoint);

        Ok(Self {
            docker,
            endpoint: endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// Encodes every item of a bollard stream back into its JSON document.
fn into_payloads<T>(
    operation: &'static str,
    stream: impl Stream<Item = std::result::Result<T, bollard::errors::Error>> + Send + 'static,
) -> DockerStream
where
    T: Serialize + 'static,
{
    let payloads = stream.map(move |item| {
        let item = item.map_err(|source| Error::Request { operation, source })?;
        serde_json::to_string(&item).map_err(|source| Error::Encode { operation, source })
    });

    DockerStream {
        inner: Box::pin(payloads),
    }
}

impl Runtime for DockerClient {
    type Stream = DockerStream;

    async fn list_containers(&self) -> Result<Vec<ContainerID>> {
        const OPERATION: &str = "list containers";
        // `all: false` limits the listing to running containers.
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::default()))
            .await
            .map_err(|source| Error::Request {
                operation: OPERATION,
                source,
            })?;
        log::debug!("Found {} running containers", containers.len());

        containers
            .into_iter()
            .map(|c| {
                ContainerID::new(c.id.unwrap_or_default()).map_err(|source| Error::Container {
                    operation: OPERATION,
                    source,
                })
            })
            .collect()
    }

    async fn inspect(&self, id: &ContainerID) -> Result<ContainerIdentity> {
        let container = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(|source| Error::Request {
                operation: "inspect container",
                source,
            })?;

        Ok(ContainerIdentity::new(
            id.clone(),
            container.name.unwrap_or_default(),
        ))
    }

    async fn host_info(&self) -> Result<HostIdentity> {
        let info = self.docker.info().await.map_err(|source| Error::Request {
            operation: "info",
            source,
        })?;
        // Missing or out of range values are rejected by the host session.
        let ncpu = info
            .ncpu
            .and_then(|ncpu| u32::try_from(ncpu).ok())
            .unwrap_or(0);

        Ok(HostIdentity::new(info.name.unwrap_or_default(), ncpu))
    }

    async fn stats(&self, id: &ContainerID) -> Result<DockerStream> {
        let options = StatsOptionsBuilder::new().stream(true).build();
        Ok(into_payloads(
            "stats",
            self.docker.stats(id.as_str(), Some(options)),
        ))
    }

    async fn events(&self) -> Result<DockerStream> {
        let options = EventsOptions {
            filters: Some(HashMap::from([(
                "type".to_owned(),
                vec!["container".to_owned()],
            )])),
            ..Default::default()
        };
        Ok(into_payloads("events", self.docker.events(Some(options))))
    }
}

/// A bollard stream re-encoded as JSON documents.
pub struct DockerStream {
    inner: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

impl fmt::Debug for DockerStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DockerStream").finish_non_exhaustive()
    }
}

impl PayloadStream for DockerStream {
    async fn next_payload(&mut self) -> Result<Option<String>> {
        self.inner.next().await.transpose()
    }
}
