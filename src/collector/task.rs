use std::sync::Arc;
use std::time::Duration;

use super::TaskError;
use super::registry::{StatusCell, TaskStatus};
use crate::container::ContainerIdentity;
use crate::host::HostIdentity;
use crate::record::StatRecord;
use crate::runtime::{PayloadStream, Runtime};
use crate::sink::Sink;

/// Streams the stats of a single container to the sink.
///
/// The task has no cancellation check of its own: it runs until its stats stream ends, a read
/// or publish fails, or it is aborted by the supervisor.
pub struct CollectorTask<R, S> {
    runtime: Arc<R>,
    sink: Arc<S>,
    host: Arc<HostIdentity>,
    container: ContainerIdentity,
    channel: Arc<str>,
    grace_period: Duration,
    status: Arc<StatusCell>,
}

impl<R: Runtime, S: Sink> CollectorTask<R, S> {
    pub(crate) fn new(
        runtime: Arc<R>,
        sink: Arc<S>,
        host: Arc<HostIdentity>,
        container: ContainerIdentity,
        channel: Arc<str>,
        grace_period: Duration,
        status: Arc<StatusCell>,
    ) -> Self {
        Self {
            runtime,
            sink,
            host,
            container,
            channel,
            grace_period,
            status,
        }
    }

    /// Waits out the grace period, then publishes one enriched record per stats payload.
    ///
    /// Payloads that are not JSON objects are logged and skipped. Records are published in the
    /// order the runtime delivers them.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskError`] naming the container when the stream cannot be opened, a read
    /// fails, or the sink rejects a record. A stream that simply ends returns `Ok(())`.
    pub async fn run(self) -> Result<(), TaskError> {
        // The delay gives a freshly started container time to come up. It is a heuristic, not a
        // guarantee that the container is ready.
        tokio::time::sleep(self.grace_period).await;

        let id = self.container.id();
        log::info!("Starting collector for container `{}`", id);
        let mut stats = self
            .runtime
            .stats(id)
            .await
            .map_err(|source| TaskError::Subscribe {
                id: id.clone(),
                source,
            })?;
        self.status.set(TaskStatus::Running);

        let mut published: u64 = 0;
        while let Some(payload) =
            stats
                .next_payload()
                .await
                .map_err(|source| TaskError::Stream {
                    id: id.clone(),
                    source,
                })?
        {
            let record = match StatRecord::enrich(&payload, &self.container, &self.host)
                .and_then(|record| record.to_json())
            {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("Skipping stats payload of container `{}`: {}", id, err);
                    continue;
                }
            };
            self.sink
                .publish(&self.channel, &record)
                .await
                .map_err(|source| TaskError::Publish {
                    id: id.clone(),
                    source,
                })?;
            published += 1;
            log::trace!("Published record #{} for container `{}`", published, id);
        }
        log::debug!(
            "Stats stream of container `{}` ended after {} records",
            id,
            published
        );

        Ok(())
    }
}
