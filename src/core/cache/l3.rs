//! Optional distributed (L3) cache tier, gated behind the `redis-tier`
//! feature. Generalized from the teacher's cache manager's remote-tier
//! trait object so the manager itself never depends on the `redis` crate
//! directly.

use async_trait::async_trait;

use crate::utils::error::Result;

#[async_trait]
pub trait DistributedTier: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;
}

#[cfg(feature = "redis-tier")]
pub mod redis_tier {
    use super::*;
    use crate::utils::error::OrchestratorError;
    use redis::aio::ConnectionManager;
    use redis::AsyncCommands;

    pub struct RedisTier {
        conn: ConnectionManager,
    }

    impl RedisTier {
        pub async fn connect(url: &str) -> Result<Self> {
            let client = redis::Client::open(url)
                .map_err(|e| OrchestratorError::Config(format!("invalid redis url: {e}")))?;
            let conn = client
                .get_connection_manager()
                .await
                .map_err(|e| OrchestratorError::Internal {
                    message: format!("redis connection failed: {e}"),
                })?;
            Ok(Self { conn })
        }
    }

    #[async_trait]
    impl DistributedTier for RedisTier {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            let mut conn = self.conn.clone();
            conn.get(key)
                .await
                .map_err(|e| OrchestratorError::Internal {
                    message: format!("redis get failed: {e}"),
                })
        }

        async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
            let mut conn = self.conn.clone();
            let _: () = conn
                .set_ex(key, value, ttl_secs)
                .await
                .map_err(|e| OrchestratorError::Internal {
                    message: format!("redis set failed: {e}"),
                })?;
            Ok(())
        }
    }
}

#[cfg(feature = "redis-tier")]
pub use redis_tier::RedisTier;
