use async_trait::async_trait;
use dashmap::DashMap;
use service_core::error::AppError;
use std::time::{Duration, Instant};

/// Ids of sessions that were logged out before they expired.
#[async_trait]
pub trait SessionRevocations: Send + Sync {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<(), AppError>;
    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError>;
}

/// Shared across instances; entries expire with the session they revoke.
pub struct RedisRevocations {
    client: redis::Client,
}

impl RedisRevocations {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url)?;
        let mut con = client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("PING").query_async(&mut con).await?;
        tracing::info!("Connected to Redis for session revocation");
        Ok(Self { client })
    }

    fn key(jti: &str) -> String {
        format!("marketplace:revoked:{}", jti)
    }
}

#[async_trait]
impl SessionRevocations for RedisRevocations {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<(), AppError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let _: () = redis::cmd("SET")
            .arg(Self::key(jti))
            .arg(1)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async(&mut con)
            .await?;
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let exists: bool = redis::cmd("EXISTS")
            .arg(Self::key(jti))
            .query_async(&mut con)
            .await?;
        Ok(exists)
    }
}

/// Single-instance fallback when no Redis is configured.
#[derive(Default)]
pub struct MemoryRevocations {
    entries: DashMap<String, Instant>,
}

impl MemoryRevocations {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRevocations for MemoryRevocations {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> Result<(), AppError> {
        let now = Instant::now();
        self.entries.retain(|_, expires| *expires > now);
        self.entries
            .insert(jti.to_string(), now + Duration::from_secs(ttl_secs.max(1)));
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, AppError> {
        Ok(self
            .entries
            .get(jti)
            .is_some_and(|expires| *expires > Instant::now()))
    }
}
