use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::cache::CacheService;

const GENERATION_KEY: &str = "sessions:generation";

/// Ключ списка сеансов: поколение кеша + sha256 от канонического фильтра.
pub fn listing_key(generation: i64, fingerprint: &str) -> String {
    let digest = Sha256::digest(fingerprint.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("sessions:v{}:{}", generation, hex)
}

impl CacheService {
    pub async fn session_listing_key(&self, fingerprint: &str) -> Result<String, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let generation: Option<i64> = conn.get(GENERATION_KEY).await?;
        Ok(listing_key(generation.unwrap_or(0), fingerprint))
    }

    pub async fn get_session_listing(&self, key: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.get(key).await
    }

    pub async fn store_session_listing(&self, key: &str, json: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.set_ex(key, json, self.ttl_seconds).await
    }

    /// Новое поколение: все закешированные списки сеансов становятся недостижимы
    /// и доживают до своего TTL.
    pub async fn invalidate_sessions(&self) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let generation: i64 = conn.incr(GENERATION_KEY, 1).await?;
        info!("Session listings cache moved to generation {}", generation);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_depends_on_generation_and_filter() {
        let a = listing_key(0, "movie=1");
        assert!(a.starts_with("sessions:v0:"));
        assert_eq!(a.len(), "sessions:v0:".len() + 64);

        assert_eq!(a, listing_key(0, "movie=1"));
        assert_ne!(a, listing_key(1, "movie=1"));
        assert_ne!(a, listing_key(0, "movie=2"));
    }
}
