//! In-memory runtime and sink used by the collector tests.
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::container::{ContainerID, ContainerIdentity};
use crate::host::HostIdentity;
use crate::runtime::{self, PayloadStream, Runtime};
use crate::sink::{self, Sink};

type Feed = mpsc::UnboundedSender<runtime::Result<String>>;

/// Polls `condition` on a 10ms cadence, panicking if it never holds.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

pub(crate) fn start_event(id: &str) -> String {
    format!(
        r#"{{"status":"start","id":"{id}","Type":"container","Action":"start","Actor":{{"ID":"{id}"}}}}"#
    )
}

fn unreachable() -> runtime::Error {
    runtime::Error::Request {
        operation: "fake",
        source: bollard::errors::Error::IOError {
            err: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "unreachable"),
        },
    }
}

fn stream_failure() -> runtime::Error {
    runtime::Error::Request {
        operation: "fake stream",
        source: bollard::errors::Error::IOError {
            err: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "stream reset"),
        },
    }
}

pub(crate) struct FakeStream(mpsc::UnboundedReceiver<runtime::Result<String>>);

impl PayloadStream for FakeStream {
    async fn next_payload(&mut self) -> runtime::Result<Option<String>> {
        match self.0.recv().await {
            Some(Ok(payload)) => Ok(Some(payload)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }
}

#[derive(Default)]
struct RuntimeState {
    containers: Vec<(ContainerID, String)>,
    stats: HashMap<ContainerID, Feed>,
    subscriptions: Vec<ContainerID>,
    events: Option<Feed>,
    inspect_block: Option<Duration>,
}

/// Scriptable runtime: tests start and stop containers and push payloads into open feeds.
pub(crate) struct FakeRuntime {
    host: HostIdentity,
    unreachable: AtomicBool,
    state: Mutex<RuntimeState>,
}

impl FakeRuntime {
    pub(crate) fn new(host: HostIdentity) -> Self {
        Self {
            host,
            unreachable: AtomicBool::new(false),
            state: Mutex::default(),
        }
    }

    pub(crate) fn with_containers(host: HostIdentity, containers: &[(&str, &str)]) -> Self {
        let runtime = Self::new(host);
        for (id, name) in containers {
            runtime.start_container(id, name);
        }
        runtime
    }

    pub(crate) fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub(crate) fn start_container(&self, id: &str, name: &str) {
        let id = ContainerID::new(id).unwrap();
        self.state
            .lock()
            .unwrap()
            .containers
            .push((id, name.to_owned()));
    }

    /// Makes every following `inspect` block its worker thread for `duration` before answering,
    /// so the calling task cannot be cancelled while the call is in progress.
    pub(crate) fn block_inspect_for(&self, duration: Duration) {
        self.state.lock().unwrap().inspect_block = Some(duration);
    }

    pub(crate) fn stop_container(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .containers
            .retain(|(c, _)| c.as_str() != id);
    }

    /// Sends a payload into the container's stats feed. Returns `false` if no collector is
    /// listening on it.
    pub(crate) fn push_stat(&self, id: &str, payload: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .stats
            .get(id)
            .is_some_and(|feed| feed.send(Ok(payload.to_owned())).is_ok())
    }

    pub(crate) fn fail_stats(&self, id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .stats
            .get(id)
            .is_some_and(|feed| feed.send(Err(stream_failure())).is_ok())
    }

    pub(crate) fn close_stats(&self, id: &str) {
        self.state.lock().unwrap().stats.remove(id);
    }

    /// Whether a collector currently holds the container's stats feed open.
    pub(crate) fn stats_open(&self, id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .stats
            .get(id)
            .is_some_and(|feed| !feed.is_closed())
    }

    pub(crate) fn subscriptions(&self) -> Vec<ContainerID> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub(crate) fn push_event(&self, payload: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .events
            .as_ref()
            .is_some_and(|feed| feed.send(Ok(payload.to_owned())).is_ok())
    }

    pub(crate) fn fail_events(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .events
            .as_ref()
            .is_some_and(|feed| feed.send(Err(stream_failure())).is_ok())
    }

    pub(crate) fn events_open(&self) -> bool {
        self.state
            .lock()
            .unwrap()
            .events
            .as_ref()
            .is_some_and(|feed| !feed.is_closed())
    }

    fn check_reachable(&self) -> runtime::Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(unreachable());
        }
        Ok(())
    }
}

impl Runtime for FakeRuntime {
    type Stream = FakeStream;

    async fn list_containers(&self) -> runtime::Result<Vec<ContainerID>> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(state.containers.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn inspect(&self, id: &ContainerID) -> runtime::Result<ContainerIdentity> {
        self.check_reachable()?;
        let block = self.state.lock().unwrap().inspect_block;
        if let Some(duration) = block {
            std::thread::sleep(duration);
        }
        let state = self.state.lock().unwrap();
        state
            .containers
            .iter()
            .find(|(c, _)| c == id)
            .map(|(c, name)| ContainerIdentity::new(c.clone(), name))
            .ok_or_else(|| runtime::Error::Request {
                operation: "inspect container",
                source: bollard::errors::Error::DockerResponseServerError {
                    status_code: 404,
                    message: format!("No such container: {}", id),
                },
            })
    }

    async fn host_info(&self) -> runtime::Result<HostIdentity> {
        self.check_reachable()?;
        Ok(self.host.clone())
    }

    async fn stats(&self, id: &ContainerID) -> runtime::Result<FakeStream> {
        self.check_reachable()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap();
        state.stats.insert(id.clone(), tx);
        state.subscriptions.push(id.clone());
        Ok(FakeStream(rx))
    }

    async fn events(&self) -> runtime::Result<FakeStream> {
        self.check_reachable()?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.state.lock().unwrap().events = Some(tx);
        Ok(FakeStream(rx))
    }
}

/// Records everything published; publishes for selected containers fail.
#[derive(Default)]
pub(crate) struct FakeSink {
    published: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeSink {
    pub(crate) fn fail_for(&self, container_id: &str) {
        self.failing.lock().unwrap().insert(container_id.to_owned());
    }

    pub(crate) fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    pub(crate) fn records_for(&self, container_id: &str) -> Vec<Value> {
        self.published()
            .iter()
            .map(|(_, payload)| serde_json::from_str::<Value>(payload).unwrap())
            .filter(|record| record["container_id"] == container_id)
            .collect()
    }
}

impl Sink for FakeSink {
    async fn publish(&self, channel: &str, payload: &str) -> sink::Result<()> {
        let record: Value = serde_json::from_str(payload).unwrap();
        let container_id = record["container_id"].as_str().unwrap_or_default();
        if self.failing.lock().unwrap().contains(container_id) {
            return Err(sink::Error::SinkUnavailable {
                address: "fake://sink".to_owned(),
                source: redis::RedisError::from((redis::ErrorKind::IoError, "connection lost")),
            });
        }
        self.published
            .lock()
            .unwrap()
            .push((channel.to_owned(), payload.to_owned()));
        Ok(())
    }
}
