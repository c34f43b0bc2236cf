use crate::redis_client::RedisClient;

pub mod sessions;

/// Кеш ответов в Redis. Сбой кеша никогда не ломает запрос: вызывающий код
/// логирует ошибку и идёт в БД.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    pub async fn ping(&self) -> redis::RedisResult<()> {
        self.redis.ping().await
    }
}
