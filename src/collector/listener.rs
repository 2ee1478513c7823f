use super::{Error, Result, Supervisor};
use crate::error::ResultOkLogExt;
use crate::runtime::{EventKind, LifecycleEvent, PayloadStream, Runtime};
use crate::sink::Sink;

/// Consumes the runtime's event feed and adds or removes collectors accordingly.
///
/// Events are handled one at a time in feed order. Undecodable events are logged and skipped.
/// There is no retry: once the feed ends or fails the listener returns.
pub(crate) async fn listen<R: Runtime, S: Sink>(supervisor: &Supervisor<R, S>) -> Result<()> {
    log::info!("Starting event listener");
    let mut events = supervisor
        .runtime()
        .events()
        .await
        .map_err(Error::EventSubscribe)?;

    while let Some(payload) = events.next_payload().await.map_err(Error::EventStream)? {
        match LifecycleEvent::from_json(&payload) {
            Ok(event) => handle_event(supervisor, event).await,
            Err(err) => log::warn!("Ignoring runtime event: {}", err),
        }
    }

    Ok(())
}

async fn handle_event<R: Runtime, S: Sink>(supervisor: &Supervisor<R, S>, event: LifecycleEvent) {
    let id = event.container_id();
    match event.kind() {
        EventKind::Start => {
            log::debug!("Container `{}` started", id);
            supervisor.add(id.clone()).await.ok_log();
        }
        EventKind::Die => {
            log::debug!("Container `{}` died", id);
            match supervisor.remove(id).await {
                Ok(()) => {}
                // The collector usually unregisters itself once the stats stream closes.
                Err(Error::NotFound(id)) => {
                    log::debug!("No collector left to remove for container `{}`", id)
                }
                Err(err) => log::error!("{}", err),
            }
        }
        EventKind::Other(action) => {
            log::trace!("Ignoring `{}` event for container `{}`", action, id)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::collector::SupervisorConfig;
    use crate::container::ContainerID;
    use crate::host::HostIdentity;
    use crate::testing::{FakeRuntime, FakeSink, start_event, wait_until};

    use super::*;

    fn setup() -> (Arc<FakeRuntime>, Supervisor<FakeRuntime, FakeSink>) {
        let host = HostIdentity::new("node-1", 4);
        let runtime = Arc::new(FakeRuntime::new(host.clone()));
        let supervisor = Supervisor::new(
            Arc::clone(&runtime),
            Arc::new(FakeSink::default()),
            Arc::new(host),
            SupervisorConfig::default(),
        );
        (runtime, supervisor)
    }

    fn id(raw: &str) -> ContainerID {
        ContainerID::new(raw).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_die_events_drive_registry() {
        let (runtime, supervisor) = setup();
        let listener = {
            let supervisor = supervisor.clone();
            tokio::spawn(async move { listen(&supervisor).await })
        };
        wait_until(|| runtime.events_open()).await;

        runtime.start_container("a", "/web");
        runtime.push_event(&start_event("a"));
        wait_until(|| supervisor.registry().contains(&id("a"))).await;

        runtime.push_event(r#"{"status":"die","id":"a"}"#);
        wait_until(|| supervisor.registry().is_empty()).await;

        listener.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignores_other_and_malformed_events() {
        let (runtime, supervisor) = setup();
        let listener = {
            let supervisor = supervisor.clone();
            tokio::spawn(async move { listen(&supervisor).await })
        };
        wait_until(|| runtime.events_open()).await;

        runtime.start_container("a", "/web");
        runtime.push_event("garbage");
        runtime.push_event(r#"{"status":"pause","id":"a"}"#);
        runtime.push_event(r#"{"status":"die","id":"unknown"}"#);
        runtime.push_event(&start_event("a"));
        wait_until(|| supervisor.registry().contains(&id("a"))).await;
        assert_eq!(supervisor.registry().len(), 1);
        assert!(!listener.is_finished());

        listener.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_start_events_keep_single_task() {
        let (runtime, supervisor) = setup();
        let listener = {
            let supervisor = supervisor.clone();
            tokio::spawn(async move { listen(&supervisor).await })
        };
        wait_until(|| runtime.events_open()).await;

        runtime.start_container("a", "/web");
        runtime.start_container("b", "/db");
        runtime.push_event(&start_event("a"));
        runtime.push_event(&start_event("a"));
        runtime.push_event(&start_event("b"));
        wait_until(|| supervisor.registry().contains(&id("b"))).await;
        assert_eq!(supervisor.registry().ids(), vec![id("a"), id("b")]);

        listener.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_stream_failure_ends_listener() {
        let (runtime, supervisor) = setup();
        let listener = {
            let supervisor = supervisor.clone();
            tokio::spawn(async move { listen(&supervisor).await })
        };
        wait_until(|| runtime.events_open()).await;

        runtime.fail_events();
        let err = listener.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::EventStream(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_subscription_failure() {
        let (runtime, supervisor) = setup();
        runtime.set_unreachable(true);

        let err = listen(&supervisor).await.unwrap_err();
        assert!(matches!(err, Error::EventSubscribe(_)));
    }
}
