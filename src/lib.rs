//! Statsquid: streams per-container resource statistics from a container runtime and
//! republishes them, tagged with container and host identity, onto a pub/sub channel.
//!
//! The core of the crate is the [`collector`] module: a supervisor that runs one collector task
//! per running container and follows the runtime's lifecycle events to add and remove tasks.
use std::sync::Arc;

use error::ResultOkLogExt;
use tokio::signal::unix::{SignalKind, signal};

pub mod collector;
pub mod config;
pub mod container;
pub mod error;
pub mod host;
pub mod record;
pub mod runtime;
pub mod sink;

#[cfg(test)]
mod testing;

/// Runs the collector until the process is interrupted.
///
/// Resolves the host identity, starts a collector for every running container and then follows
/// the runtime's lifecycle events. `SIGHUP` reloads all collectors; `SIGINT` and `SIGTERM` stop
/// them and return.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid configuration values in the environment.
/// - An unreachable container runtime or sink at startup.
/// - Failure to enumerate the running containers during the initial reload.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::from_env()?;
    log::debug!("Configuration: {:?}", config);

    let runtime = Arc::new(runtime::DockerClient::connect(&config.docker_host)?);
    let host = host::HostSession::resolve(runtime.as_ref()).await?;
    let sink = Arc::new(sink::RedisSink::connect(&config.redis_host, config.redis_port).await?);
    log::info!(
        "Starting collector on source {} (runtime {}, sink {})",
        host.identity().hostname(),
        runtime.endpoint(),
        sink.address()
    );

    let supervisor =
        collector::Supervisor::new(runtime, sink, host.identity(), config.supervisor());
    supervisor.reload().await?;

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received interrupt, shutting down");
                break;
            }
            _ = terminate.recv() => {
                log::info!("Received SIGTERM, shutting down");
                break;
            }
            _ = hangup.recv() => {
                log::info!("Received SIGHUP, reloading collectors");
                supervisor.reload().await.ok_log();
            }
        }
    }

    supervisor.stop().await?;
    log::info!("All collectors stopped");

    Ok(())
}
