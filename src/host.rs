//! Host identity, resolved once per process lifetime.
use std::sync::Arc;

use crate::runtime::{self, Runtime};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to query host information: {0}")]
    Runtime(#[from] runtime::Error),
    #[error("runtime reported an empty hostname")]
    EmptyHostname,
    #[error("runtime reported zero CPUs for host `{0}`")]
    NoCpus(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Name and CPU count of the host the collector runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    hostname: String,
    ncpu: u32,
}

impl HostIdentity {
    pub fn new(hostname: impl Into<String>, ncpu: u32) -> Self {
        Self {
            hostname: hostname.into(),
            ncpu,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn ncpu(&self) -> u32 {
        self.ncpu
    }
}

/// Read-only host identity shared by every collector task.
#[derive(Debug, Clone)]
pub struct HostSession {
    identity: Arc<HostIdentity>,
}

impl HostSession {
    /// Resolves the host identity from the runtime.
    ///
    /// There is no retry: a runtime that cannot be reached at startup is a fatal condition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Runtime`] if the runtime is unreachable, and [`Error::EmptyHostname`] or
    /// [`Error::NoCpus`] if it answers with an unusable identity.
    pub async fn resolve<R: Runtime>(runtime: &R) -> Result<Self> {
        let identity = runtime.host_info().await?;
        if identity.hostname.is_empty() {
            return Err(Error::EmptyHostname);
        }
        if identity.ncpu == 0 {
            return Err(Error::NoCpus(identity.hostname));
        }
        log::info!(
            "Resolved host `{}` with {} CPUs",
            identity.hostname,
            identity.ncpu
        );

        Ok(Self {
            identity: Arc::new(identity),
        })
    }

    pub fn identity(&self) -> Arc<HostIdentity> {
        Arc::clone(&self.identity)
    }
}
