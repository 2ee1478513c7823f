use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use super::{Error, Result, Sink};

/// Publishes records with Redis `PUBLISH` over a single multiplexed connection.
#[derive(Clone)]
pub struct RedisSink {
    address: String,
    connection: MultiplexedConnection,
}

impl RedisSink {
    /// Connects to database `0` of the Redis server at `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] if the server cannot be reached.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let address = format!("{}:{}", host, port);
        let client = redis::Client::open(format!("redis://{}/0", address)).map_err(|source| {
            Error::Connect {
                address: address.clone(),
                source,
            }
        })?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|source| Error::Connect {
                address: address.clone(),
                source,
            })?;
        log::debug!("Connected to sink at {}", address);

        Ok(Self {
            address,
            connection,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Sink for RedisSink {
    async fn publish(&self, channel: &str, payload: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        connection
            .publish::<_, _, ()>(channel, payload)
            .await
            .map_err(|source| Error::SinkUnavailable {
                address: self.address.clone(),
                source,
            })
    }
}
