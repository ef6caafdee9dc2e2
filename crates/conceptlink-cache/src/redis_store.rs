//! Redis-backed cache store.
//!
//! Values are stored as Redis lists; the empty marker is a separate key under
//! [`EMPTY_MARKER_PREFIX`](crate::EMPTY_MARKER_PREFIX). The store exposes the
//! synchronous [`CacheStore`] API by driving the async client on a tokio
//! runtime handle, so it must not be called from inside that runtime.

use crate::{CacheError, CacheStore, EMPTY_MARKER_PREFIX};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tokio::runtime::Handle;

#[derive(Clone)]
pub struct RedisCache {
    handle: Handle,
    conn: MultiplexedConnection,
}

impl RedisCache {
    pub fn connect(url: &str, handle: Handle) -> Result<Self, CacheError> {
        let client = Client::open(url)
            .map_err(|e| CacheError::Connect(format!("invalid Redis URL {url}: {e}")))?;
        let conn = handle
            .block_on(client.get_multiplexed_async_connection())
            .map_err(|e| CacheError::Connect(format!("failed to connect to Redis: {e}")))?;
        tracing::info!(url, "connected to Redis cache");
        Ok(Self { handle, conn })
    }

    fn marker(key: &str) -> String {
        format!("{EMPTY_MARKER_PREFIX}{key}")
    }
}

impl CacheStore for RedisCache {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheError> {
        let mut conn = self.conn.clone();
        let values: Vec<String> = self.handle.block_on(conn.lrange(key, 0, -1))?;
        Ok(if values.is_empty() { None } else { Some(values) })
    }

    fn put(&self, key: &str, values: &[String]) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.handle.block_on(
            redis::pipe()
                .atomic()
                .del(key)
                .ignore()
                .rpush(key, values.to_vec())
                .ignore()
                .query_async::<()>(&mut conn),
        )?;
        Ok(())
    }

    fn mark_empty(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        self.handle
            .block_on(conn.set::<_, _, ()>(Self::marker(key), 1))?;
        Ok(())
    }

    fn is_marked_empty(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        Ok(self
            .handle
            .block_on(conn.exists::<_, bool>(Self::marker(key)))?)
    }
}
