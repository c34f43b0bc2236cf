use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    /// `pretty` или `json`
    pub log_format: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

// Настройки Redis. Без url кеш выключен.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub cache_ttl_seconds: u64,
}

// Настройки JWT
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

impl AppConfig {
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Собирает конфигурацию: значения по умолчанию, затем `CINEMA__SECTION__KEY`,
    /// затем привычные переменные (`DATABASE_URL`, `REDIS_URL`, `JWT_SECRET`, `PORT`, `RUST_LOG`).
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "cinema_service=debug,tower_http=debug")?
            .set_default("app.log_format", "pretty")?
            .set_default("database.pool_size", 20)?
            .set_default("database.acquire_timeout_seconds", 5)?
            .set_default("redis.cache_ttl_seconds", 60)?
            .set_default("jwt.expires_in_hours", 24)?
            .add_source(
                config::Environment::with_prefix("CINEMA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .set_override_option("jwt.secret", env::var("JWT_SECRET").ok())?
            .set_override_option("app.port", env::var("PORT").ok())?
            .set_override_option("app.rust_log", env::var("RUST_LOG").ok())?
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_logs_is_case_insensitive() {
        let app = AppConfig {
            host: "127.0.0.1".into(),
            port: 8000,
            environment: "test".into(),
            rust_log: "info".into(),
            log_format: "JSON".into(),
        };
        assert!(app.json_logs());

        let pretty = AppConfig { log_format: "pretty".into(), ..app };
        assert!(!pretty.json_logs());
    }
}
