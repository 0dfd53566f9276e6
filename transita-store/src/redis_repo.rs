use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;
use uuid::Uuid;

use transita_core::{LeaseStore, StoreError};

/// Lua compare-and-delete: removes the key only when the stored value
/// matches, as one uninterruptible step. Guards against deleting a lease
/// that was re-issued to someone else after ours expired.
const CAS_DELETE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn seat_lock_key(trip_id: Uuid, seat_id: Uuid) -> String {
    format!("seat_lock:{}:{}", trip_id, seat_id)
}

fn event_marker_key(provider: &str, event_id: &str) -> String {
    format!("payment_webhook:{}:{}", provider, event_id)
}

fn unavailable(e: redis::RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LeaseStore for RedisClient {
    async fn acquire_seat_lock(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: &str,
        ttl_seconds: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let key = seat_lock_key(trip_id, seat_id);

        // SET NX: only set if the key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(token)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(result.is_some())
    }

    async fn consume_seat_lock(
        &self,
        trip_id: Uuid,
        seat_id: Uuid,
        token: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let key = seat_lock_key(trip_id, seat_id);

        let script = redis::Script::new(CAS_DELETE_SCRIPT);
        let removed: i64 = script
            .key(&key)
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(removed == 1)
    }

    async fn release_seat_lock(&self, trip_id: Uuid, seat_id: Uuid) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let key = seat_lock_key(trip_id, seat_id);
        conn.del::<_, ()>(&key).await.map_err(unavailable)?;
        debug!("Seat lock released: {}", key);
        Ok(())
    }

    async fn mark_event_processed(
        &self,
        provider: &str,
        event_id: &str,
        retention_seconds: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let key = event_marker_key(provider, event_id);

        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(retention_seconds)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(result.is_some())
    }
}
