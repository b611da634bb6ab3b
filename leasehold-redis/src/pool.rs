//! Redis connection pool.
//!
//! Connections are handed out by bb8. A connection that hits a connectivity
//! failure is flagged broken, and bb8 drops it on return instead of putting it
//! back into the idle set.

use bb8::{ManageConnection, Pool, PooledConnection};
use bb8_redis::RedisConnectionManager;
use redis::aio::MultiplexedConnection;
use std::ops::{Deref, DerefMut};
use tracing::{debug, info};

use crate::{RedisConfig, RedisError, Result};

/// Type alias for the connection pool.
pub type RedisPool = Pool<TrackedConnectionManager>;

/// A Redis connection that remembers whether it failed at the transport level.
pub struct TrackedConnection {
    inner: MultiplexedConnection,
    broken: bool,
}

impl TrackedConnection {
    /// Flag this connection so the pool discards it instead of recycling it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Whether the connection has been flagged.
    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

impl Deref for TrackedConnection {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for TrackedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// bb8 manager wrapping [`RedisConnectionManager`] with broken-connection tracking.
pub struct TrackedConnectionManager {
    inner: RedisConnectionManager,
    connection_name: Option<String>,
}

impl TrackedConnectionManager {
    /// Create a manager for the given connection URL.
    pub fn new(url: &str, connection_name: Option<String>) -> Result<Self> {
        let inner =
            RedisConnectionManager::new(url).map_err(|e| RedisError::Connection(e.to_string()))?;
        Ok(Self {
            inner,
            connection_name,
        })
    }
}

impl ManageConnection for TrackedConnectionManager {
    type Connection = TrackedConnection;
    type Error = redis::RedisError;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let mut inner = self.inner.connect().await?;

        if let Some(name) = &self.connection_name {
            let _: () = redis::cmd("CLIENT")
                .arg("SETNAME")
                .arg(name)
                .query_async(&mut inner)
                .await?;
        }

        debug!("Opened Redis connection");
        Ok(TrackedConnection {
            inner,
            broken: false,
        })
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        self.inner.is_valid(&mut conn.inner).await
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.broken
    }
}

/// A pooled Redis connection.
///
/// Returned to the pool when dropped, unless it was marked broken.
pub struct RedisConnection<'a> {
    conn: PooledConnection<'a, TrackedConnectionManager>,
}

impl<'a> RedisConnection<'a> {
    /// Create a new connection wrapper.
    pub fn new(conn: PooledConnection<'a, TrackedConnectionManager>) -> Self {
        Self { conn }
    }

    /// Flag the underlying connection for disposal.
    pub fn discard(&mut self) {
        self.conn.mark_broken();
    }
}

impl<'a> Deref for RedisConnection<'a> {
    type Target = MultiplexedConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn.inner
    }
}

impl<'a> DerefMut for RedisConnection<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn.inner
    }
}

/// Builder for creating Redis connection pools.
pub struct RedisPoolBuilder {
    config: RedisConfig,
}

impl RedisPoolBuilder {
    /// Create a new pool builder.
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    /// Build the connection pool and verify it with a PING.
    pub async fn build(self) -> Result<RedisPool> {
        if self.config.command_timeout.is_zero() {
            return Err(RedisError::Config(
                "command_timeout must be greater than zero".to_string(),
            ));
        }

        let url = self.config.connection_url()?;
        let manager = TrackedConnectionManager::new(&url, self.config.connection_name.clone())?;

        let pool = Pool::builder()
            .max_size(self.config.pool_size)
            .min_idle(self.config.min_idle)
            .connection_timeout(self.config.connection_timeout)
            .build(manager)
            .await
            .map_err(|e| RedisError::Pool(e.to_string()))?;

        // Scoped so the probe connection is back in the pool before returning
        {
            let mut conn = pool.get().await?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn.inner)
                .await
                .map_err(|e| RedisError::Connection(e.to_string()))?;
        }

        info!(
            pool_size = self.config.pool_size,
            url = %self.config.url,
            "Redis connection pool created"
        );

        Ok(pool)
    }
}
