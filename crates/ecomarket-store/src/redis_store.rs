//! Redis-backed [`StateStore`] implementation.
//!
//! One Redis command per trait method. The `ConnectionManager` transparently
//! reconnects after broken connections, so callers only see transient
//! command errors, never a permanently dead handle.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use crate::error::StoreResult;
use crate::store::StateStore;

/// Production store: every primitive maps to a single Redis command.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis and waits for the initial handshake.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        info!("connected to redis state store");
        Ok(RedisStore { manager })
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.manager.clone();
        // SET key value NX EX ttl -> "OK" when created, nil when present.
        let created: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(created.is_some())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.manager.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.hset(key, field, value).await?;
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        Ok(value)
    }

    async fn hash_values(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.manager.clone();
        let values: Vec<String> = conn.hvals(key).await?;
        Ok(values)
    }

    async fn list_push_back(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.rpush(key, value).await?;
        Ok(())
    }

    async fn list_pop_front(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.lpop(key, None).await?;
        Ok(value)
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let mut conn = self.manager.clone();
        let values: Vec<String> = conn.lrange(key, start as isize, stop as isize).await?;
        Ok(values)
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> StoreResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.ltrim(key, start as isize, stop as isize).await?;
        Ok(())
    }

    async fn list_len(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.manager.clone();
        let len: u64 = conn.llen(key).await?;
        Ok(len)
    }
}
