/// Entry point for the statsquid collector.
///
/// Connects to the container runtime and the Redis sink, then publishes the stats of every
/// running container to the `stats` channel until interrupted.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid environment variables, an
/// unreachable runtime or sink).
///
/// # Examples
///
/// ```bash
/// STATSQUID_DOCKER_HOST=unix:///var/run/docker.sock STATSQUID_REDIS_HOST=127.0.0.1 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    statsquid::run().await
}
