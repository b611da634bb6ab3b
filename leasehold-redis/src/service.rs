//! Redis command execution over the connection pool.

use redis::FromRedisValue;
use std::time::Duration;
use tracing::{trace, warn};

use crate::{
    error::is_connectivity_failure,
    pool::{RedisConnection, RedisPool, RedisPoolBuilder},
    RedisConfig, RedisError, Result,
};

/// Redis service owning the connection pool.
///
/// Every command goes through [`RedisService::execute`], which checks a
/// connection out, runs exactly one command and hands the connection back.
pub struct RedisService {
    config: RedisConfig,
    pool: RedisPool,
}

impl RedisService {
    /// Create a new Redis service.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let pool = RedisPoolBuilder::new(config.clone()).build().await?;
        Ok(Self { config, pool })
    }

    /// Create from an existing pool.
    pub fn from_pool(config: RedisConfig, pool: RedisPool) -> Self {
        Self { config, pool }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &RedisPool {
        &self.pool
    }

    /// Get a connection from the pool.
    pub async fn get(&self) -> Result<RedisConnection<'_>> {
        let conn = self.pool.get().await?;
        Ok(RedisConnection::new(conn))
    }

    /// Run one command on a pooled connection.
    ///
    /// Transport failures and command timeouts discard the connection and
    /// come back as [`RedisError::Connection`] / [`RedisError::Timeout`].
    /// Any other failure is a server reply; the connection goes back to the
    /// pool.
    pub async fn execute<T>(&self, cmd: &redis::Cmd) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let mut conn = self.get().await?;

        let outcome = tokio::time::timeout(self.config.command_timeout, async {
            let reply: redis::RedisResult<T> = cmd.query_async(&mut *conn).await;
            reply
        })
        .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if is_connectivity_failure(&err) => {
                warn!(error = %err, "Discarding broken Redis connection");
                conn.discard();
                Err(RedisError::Connection(err.to_string()))
            }
            Ok(Err(err)) => Err(RedisError::Redis(err)),
            Err(_) => {
                warn!(
                    timeout = ?self.config.command_timeout,
                    "Redis command timed out, discarding connection"
                );
                conn.discard();
                Err(RedisError::Timeout)
            }
        }
    }

    /// Check if the connection is healthy.
    pub async fn health_check(&self) -> Result<()> {
        let _: String = self.execute(&redis::cmd("PING")).await?;
        Ok(())
    }

    /// Get pool statistics.
    pub fn pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections: state.connections,
            idle_connections: state.idle_connections,
        }
    }

    /// `SET key value NX EX ttl`.
    ///
    /// Returns `true` if the key was written, `false` if it already existed.
    pub async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("NX").arg("EX").arg(ttl.as_secs());

        let reply: Option<String> = self.execute(&cmd).await?;
        trace!(key = %key, reply = ?reply, "SET NX EX");
        Ok(matches!(reply.as_deref(), Some("OK")))
    }

    /// Get a value.
    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.execute(&cmd).await
    }

    /// Raw `TTL` reply: seconds remaining, `-1` without expiry, `-2` if missing.
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("TTL");
        cmd.arg(key);
        self.execute(&cmd).await
    }

    /// `EXPIRE key ttl`; `false` when the key no longer exists.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(ttl.as_secs());

        let reply: i64 = self.execute(&cmd).await?;
        Ok(reply == 1)
    }
}

/// Connection pool statistics.
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Total connections.
    pub connections: u32,
    /// Idle connections.
    pub idle_connections: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_config() -> RedisConfig {
        RedisConfig::builder()
            .url("redis://localhost:6379")
            .pool_size(2)
            .build()
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_lease_primitives() {
        let redis = RedisService::new(service_config()).await.unwrap();
        let key = "leasehold:test:primitives";

        let _: i64 = redis.execute(redis::cmd("DEL").arg(key)).await.unwrap();

        assert!(redis.set_nx_ex(key, "node1", Duration::from_secs(30)).await.unwrap());
        assert!(!redis.set_nx_ex(key, "node2", Duration::from_secs(30)).await.unwrap());
        assert_eq!(redis.get_value(key).await.unwrap().as_deref(), Some("node1"));

        let ttl = redis.ttl(key).await.unwrap();
        assert!(ttl > 0 && ttl <= 30);

        assert!(redis.expire(key, Duration::from_secs(60)).await.unwrap());
        assert!(redis.ttl(key).await.unwrap() > 30);

        let _: i64 = redis.execute(redis::cmd("DEL").arg(key)).await.unwrap();
        assert_eq!(redis.ttl(key).await.unwrap(), -2);
        assert!(!redis.expire(key, Duration::from_secs(60)).await.unwrap());
    }

    fn single_connection_config() -> RedisConfig {
        RedisConfig::builder()
            .url("redis://localhost:6379")
            .pool_size(1)
            .build()
    }

    async fn client_id(redis: &RedisService) -> i64 {
        redis.execute(redis::cmd("CLIENT").arg("ID")).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_server_error_recycles_connection() {
        let redis = RedisService::new(single_connection_config()).await.unwrap();
        let key = "leasehold:test:wrongtype";

        let _: i64 = redis.execute(redis::cmd("DEL").arg(key)).await.unwrap();
        let _: i64 = redis.execute(redis::cmd("LPUSH").arg(key).arg("x")).await.unwrap();
        let before = client_id(&redis).await;

        let err = redis.get_value(key).await.unwrap_err();
        assert!(matches!(err, RedisError::Redis(_)));

        // Same socket after the error reply
        assert_eq!(redis.pool_stats().connections, 1);
        assert_eq!(client_id(&redis).await, before);

        let _: i64 = redis.execute(redis::cmd("DEL").arg(key)).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_killed_connection_is_discarded() {
        let redis = RedisService::new(single_connection_config()).await.unwrap();
        let victim = client_id(&redis).await;
        assert_eq!(redis.pool_stats().connections, 1);

        let admin = redis::Client::open("redis://localhost:6379").unwrap();
        let mut admin = admin.get_multiplexed_async_connection().await.unwrap();
        let _: () = redis::cmd("CLIENT")
            .arg("KILL")
            .arg("ID")
            .arg(victim)
            .query_async(&mut admin)
            .await
            .unwrap();

        let err = redis.health_check().await.unwrap_err();
        assert!(err.is_connection_error(), "unexpected error: {err}");
        assert_eq!(redis.pool_stats().connections, 0);

        // The pool opens a fresh connection on demand
        assert_ne!(client_id(&redis).await, victim);
        assert_eq!(redis.pool_stats().connections, 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_at_build() {
        let config = RedisConfig::builder()
            .url("redis://127.0.0.1:1")
            .min_idle(0)
            .connection_timeout(Duration::from_millis(200))
            .build();

        assert!(RedisService::new(config).await.is_err());
    }
}
