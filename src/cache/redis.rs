//! Redis cache connection.
//!
//! Opening resolves the configured address, authenticates and selects the
//! database through the `redis` client, then checks liveness with PING.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};

use crate::cache::{CacheConnection, CacheConnector, CacheInitError};
use crate::config::CacheConfig;

const QUIT_TIMEOUT: Duration = Duration::from_millis(500);

/// Connector for Redis servers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

#[async_trait]
impl CacheConnector for RedisConnector {
    async fn open(&self, config: &CacheConfig) -> Result<Arc<dyn CacheConnection>, CacheInitError> {
        let conn = RedisConnection::open(config).await?;
        Ok(Arc::new(conn))
    }
}

/// A multiplexed connection to a Redis server.
pub struct RedisConnection {
    address: String,
    conn: Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,
}

fn connection_info(config: &CacheConfig) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
        redis: RedisConnectionInfo {
            db: i64::from(config.db),
            password: config.password.clone(),
            ..RedisConnectionInfo::default()
        },
    }
}

impl RedisConnection {
    /// Connect, authenticate and PING, all within the connect timeout.
    pub async fn open(config: &CacheConfig) -> Result<Self, CacheInitError> {
        let address = config.address();
        let after = config.connect_timeout();
        let connect_err = |source| CacheInitError::Connect {
            address: address.clone(),
            source,
        };

        let client = redis::Client::open(connection_info(config)).map_err(connect_err)?;

        let handshake = async {
            let mut conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(connect_err)?;
            let pong: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheInitError::Handshake {
                    address: address.clone(),
                    reason: e.to_string(),
                })?;
            if pong != "PONG" {
                return Err(CacheInitError::Handshake {
                    address: address.clone(),
                    reason: format!("unexpected PING reply {pong:?}"),
                });
            }
            Ok(conn)
        };

        let conn = tokio::time::timeout(after, handshake)
            .await
            .map_err(|_| CacheInitError::Timeout {
                address: address.clone(),
                after,
            })??;

        tracing::info!(address = %address, db = config.db, "Cache connection established");
        Ok(Self {
            address,
            conn: Mutex::new(Some(conn)),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl CacheConnection for RedisConnection {
    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(mut conn) = self.conn.lock().take() else {
            return;
        };
        let quit = async {
            let _: redis::RedisResult<()> = redis::cmd("QUIT").query_async(&mut conn).await;
        };
        if tokio::time::timeout(QUIT_TIMEOUT, quit).await.is_err() {
            tracing::debug!(address = %self.address, "Cache did not answer QUIT in time");
        }
        drop(conn);
        tracing::info!(address = %self.address, "Cache connection closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
