use async_trait::async_trait;
use chrono::Duration;
use uuid::Uuid;

use crate::errors::AppError;

/// Revoked refresh-token ids. Entries only need to outlive the token itself.
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Revokes `jti` for `ttl`. Returns false when it was already revoked,
    /// which lets a rotating refresh detect a concurrent use of the same token.
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<bool, AppError>;

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError>;
}

/// Redis-backed blacklist: `SET token_blacklist:<jti> 1 EX <ttl> NX`.
pub struct RedisBlacklist {
    client: redis::Client,
}

impl RedisBlacklist {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(jti: Uuid) -> String {
        format!("token_blacklist:{jti}")
    }
}

#[async_trait]
impl TokenBlacklist for RedisBlacklist {
    async fn revoke(&self, jti: Uuid, ttl: Duration) -> Result<bool, AppError> {
        // Redis rejects EX 0; an already-expired token still gets a short entry.
        let seconds = ttl.num_seconds().max(1);
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(jti))
            .arg(1)
            .arg("EX")
            .arg(seconds)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let exists: bool = redis::cmd("EXISTS")
            .arg(Self::key(jti))
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }
}
