use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::registry::{StatusCell, TaskEntry, TaskRegistry, TaskStatus};
use super::task::CollectorTask;
use super::{Error, Result, listener};
use crate::container::{ContainerID, ContainerIdentity};
use crate::error::ResultOkLogExt;
use crate::host::HostIdentity;
use crate::runtime::Runtime;
use crate::sink::Sink;

/// Tunables of the [`Supervisor`].
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Delay before a new collector attaches to its container's stats stream.
    pub grace_period: Duration,
    /// How often terminated handles are polled for liveness.
    pub poll_interval: Duration,
    /// Upper bound on how long `stop()` and `remove()` wait for handles to finish.
    pub stop_timeout: Duration,
    /// Sink channel records are published to.
    pub channel: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            poll_interval: Duration::from_millis(200),
            stop_timeout: Duration::from_secs(10),
            channel: "stats".to_owned(),
        }
    }
}

/// Result of [`Supervisor::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new collector was registered and started.
    Started,
    /// A live collector already exists for the container; nothing was started.
    AlreadyTracked,
}

struct Shared<R, S> {
    runtime: Arc<R>,
    sink: Arc<S>,
    host: Arc<HostIdentity>,
    config: SupervisorConfig,
    channel: Arc<str>,
    registry: Arc<TaskRegistry>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Creates and terminates collector tasks.
///
/// Cloning a `Supervisor` yields another handle to the same registry.
pub struct Supervisor<R, S> {
    shared: Arc<Shared<R, S>>,
}

impl<R, S> Clone for Supervisor<R, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R: Runtime, S: Sink> Supervisor<R, S> {
    pub fn new(
        runtime: Arc<R>,
        sink: Arc<S>,
        host: Arc<HostIdentity>,
        config: SupervisorConfig,
    ) -> Self {
        let channel = Arc::from(config.channel.as_str());
        Self {
            shared: Arc::new(Shared {
                runtime,
                sink,
                host,
                config,
                channel,
                registry: Arc::default(),
                listener: Mutex::new(None),
            }),
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.shared.registry
    }

    pub(crate) fn runtime(&self) -> &R {
        &self.shared.runtime
    }

    /// Returns whether the event listener is registered and has not exited.
    pub fn listener_running(&self) -> bool {
        self.shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Resolves the container's identity and starts a collector for it.
    ///
    /// If a live collector is already registered for `id` the call is a no-op that logs a
    /// warning and returns [`AddOutcome::AlreadyTracked`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inspect`] if the container cannot be inspected.
    pub async fn add(&self, id: ContainerID) -> Result<AddOutcome> {
        if self.shared.registry.is_live(&id) {
            log::warn!(
                "Collector for container `{}` already running, ignoring duplicate add",
                id
            );
            return Ok(AddOutcome::AlreadyTracked);
        }

        log::debug!("Creating collector for container `{}`", id);
        let identity = self
            .shared
            .runtime
            .inspect(&id)
            .await
            .map_err(|source| Error::Inspect {
                id: id.clone(),
                source,
            })?;

        // The container may have been registered while it was being inspected.
        let started = self
            .shared
            .registry
            .insert_with(id.clone(), |generation| self.spawn_collector(identity, generation));
        if !started {
            log::warn!(
                "Collector for container `{}` already running, ignoring duplicate add",
                id
            );
            return Ok(AddOutcome::AlreadyTracked);
        }

        Ok(AddOutcome::Started)
    }

    fn spawn_collector(&self, identity: ContainerIdentity, generation: u64) -> TaskEntry {
        let id = identity.id().clone();
        let status = Arc::new(StatusCell::default());
        let task = CollectorTask::new(
            Arc::clone(&self.shared.runtime),
            Arc::clone(&self.shared.sink),
            Arc::clone(&self.shared.host),
            identity,
            Arc::clone(&self.shared.channel),
            self.shared.config.grace_period,
            Arc::clone(&status),
        );
        let registry = Arc::clone(&self.shared.registry);
        let exit_status = Arc::clone(&status);

        let handle = tokio::spawn(async move {
            match task.run().await {
                Ok(()) => log::info!("Stats stream of container `{}` closed", id),
                Err(err) => log::error!("Collector stopped: {}", err),
            }
            exit_status.set(TaskStatus::Stopped);
            if registry.reap(&id, generation) {
                log::debug!("Unregistered exited collector of container `{}`", id);
            }
        });

        TaskEntry::new(generation, handle, status)
    }

    /// Terminates the collector of `id` and waits until it has exited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no collector is registered for `id`, and
    /// [`Error::StopTimeout`] if the aborted task does not exit within the stop timeout.
    pub async fn remove(&self, id: &ContainerID) -> Result<()> {
        let entry = self
            .shared
            .registry
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        let handle = entry.abort();
        self.wait_terminated(std::slice::from_ref(&handle)).await?;
        log::info!("Collector stopped for container `{}`", id);

        Ok(())
    }

    /// Terminates the event listener and every collector, then waits until all of them exited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StopTimeout`] if some handles are still alive after the stop timeout.
    /// The registry is empty either way.
    pub async fn stop(&self) -> Result<()> {
        let mut handles = Vec::with_capacity(self.shared.registry.len() + 1);
        let listener = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
            // An `add` that is mid-poll on another worker still registers its collector, so the
            // registry is only drained once the listener has exited.
            if let Err(err) = self.wait_terminated(std::slice::from_ref(&listener)).await {
                log::warn!("Event listener did not exit in time: {}", err);
            }
            handles.push(listener);
        }
        for (id, entry) in self.shared.registry.drain() {
            log::debug!("Terminating collector of container `{}`", id);
            handles.push(entry.abort());
        }
        if handles.is_empty() {
            return Ok(());
        }

        self.wait_terminated(&handles).await?;
        log::info!("Stopped {} tasks", handles.len());

        Ok(())
    }

    /// Restarts collection from scratch: stops everything, starts a collector for every running
    /// container and (re)starts the event listener.
    ///
    /// Failures to add individual containers are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Enumerate`] if the running containers cannot be listed.
    pub async fn reload(&self) -> Result<()> {
        self.stop().await.ok_log();

        let ids = self
            .shared
            .runtime
            .list_containers()
            .await
            .map_err(Error::Enumerate)?;
        log::debug!("Adding collectors for {} running containers", ids.len());
        for id in ids {
            self.add(id).await.ok_log();
        }

        self.start_listener();

        Ok(())
    }

    fn start_listener(&self) {
        let supervisor = self.clone();
        let handle = tokio::spawn(async move {
            match listener::listen(&supervisor).await {
                Ok(()) => log::warn!("Runtime event stream ended, event listener stopped"),
                Err(err) => log::error!("Event listener stopped: {}", err),
            }
        });

        let previous = self
            .shared
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn wait_terminated(&self, handles: &[JoinHandle<()>]) -> Result<()> {
        wait_terminated(
            handles,
            self.shared.config.poll_interval,
            self.shared.config.stop_timeout,
        )
        .await
    }
}

/// Polls `handles` every `poll_interval` until all of them finished or `timeout` elapsed.
pub(crate) async fn wait_terminated(
    handles: &[JoinHandle<()>],
    poll_interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = handles.iter().filter(|h| !h.is_finished()).count();
        if remaining == 0 {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::StopTimeout { remaining, timeout });
        }
        tokio::time::sleep(poll_interval).await;
    }
}
