use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use thiserror::Error;
use uuid::Uuid;

use crate::models::session::Session;

/// Errors from the session store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Session serialization failed: {0}")]
    Serialization(#[from] sonic_rs::Error),
}

/// Holds the signed-in user for one client.
///
/// Written when login completes and cleared when the credential goes stale;
/// nothing but the trip workflow touches it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the current session, if any.
    ///
    /// A store that cannot be read reports no session: the user is asked to
    /// sign in again rather than the workflow guessing.
    async fn load(&self) -> Option<Session>;

    /// Stores a session, replacing any previous one.
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Deletes the session.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Converts a session lifetime in days to a Redis TTL, at least one day.
fn session_ttl_seconds(session_duration_days: i64) -> u64 {
    u64::try_from(session_duration_days.max(1))
        .unwrap_or(1)
        .saturating_mul(86_400)
}

/// A session store backed by Redis, scoped to one browser client.
pub struct RedisSessionStore {
    redis: ConnectionManager,
    key: String,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// Creates a new `RedisSessionStore`.
    ///
    /// # Arguments
    ///
    /// * `redis` - The Redis connection manager.
    /// * `client_id` - The browser client the session belongs to.
    /// * `session_duration_days` - How long a stored session lives.
    pub fn new(redis: ConnectionManager, client_id: Uuid, session_duration_days: i64) -> Self {
        Self {
            redis,
            key: format!("session:{}", client_id),
            ttl_seconds: session_ttl_seconds(session_duration_days),
        }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self) -> Option<Session> {
        let mut redis = self.redis.clone();
        let session_json: Option<String> = match redis.get(&self.key).await {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("❌ Redis error reading {}: {}", self.key, e);
                return None;
            }
        };

        match sonic_rs::from_str::<Session>(&session_json?) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("❌ Invalid session JSON under {}: {}", self.key, e);
                None
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let session_json = sonic_rs::to_string(session)?;
        let mut redis = self.redis.clone();
        let _: () = redis.set_ex(&self.key, &session_json, self.ttl_seconds).await?;
        tracing::info!("✅ Session saved to Redis: {}", self.key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut redis = self.redis.clone();
        let _: () = redis.del(&self.key).await?;
        tracing::info!("✅ Session deleted from Redis: {}", self.key);
        Ok(())
    }
}

#[cfg(test)]
pub use memory::MemorySessionStore;
