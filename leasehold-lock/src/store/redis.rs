//! Redis lease store
//!
//! Every primitive is a single command run through
//! [`RedisService::execute`], so broken connections are discarded by the pool
//! rather than handed to the next renewal step.

use crate::error::LeaseResult;
use crate::store::LeaseStore;
use async_trait::async_trait;
use leasehold_redis::RedisService;
use std::time::Duration;

#[async_trait]
impl LeaseStore for RedisService {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> LeaseResult<bool> {
        Ok(self.set_nx_ex(key, value, ttl).await?)
    }

    async fn get(&self, key: &str) -> LeaseResult<Option<String>> {
        Ok(self.get_value(key).await?)
    }

    async fn ttl(&self, key: &str) -> LeaseResult<i64> {
        Ok(RedisService::ttl(self, key).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> LeaseResult<bool> {
        Ok(RedisService::expire(self, key, ttl).await?)
    }

    fn store_type(&self) -> &'static str {
        "redis"
    }
}
