//! Redis datastore using deadpool-redis
//!
//! Stores every record as an opaque byte string under its namespaced key,
//! so a broker restart (or a second broker process) can reconstruct state
//! with `dump`. Compatible with Redis, Valkey, and Dragonfly.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::{Config, Pool, Runtime};

use super::backend::Datastore;
use super::error::StoreError;
use crate::core::config::RedisConfig;

/// Redis datastore implementation
///
/// Uses connection pooling via deadpool-redis for efficient connection
/// management.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Connect to Redis and validate the connection with a `PING`
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let redis_url = connection_url(config);
        let sanitized_url = sanitize_redis_url(&redis_url);

        let connect_timeout = Duration::from_secs(config.connect_timeout_secs.unwrap_or(5));
        let mut pool_config = Config::from_url(&redis_url);
        pool_config.pool = Some(deadpool_redis::PoolConfig {
            max_size: 32,
            timeouts: deadpool_redis::Timeouts {
                wait: Some(connect_timeout),
                create: Some(connect_timeout),
                recycle: Some(connect_timeout),
            },
            ..Default::default()
        });
        let pool = pool_config.create_pool(Some(Runtime::Tokio1)).map_err(|e| {
            StoreError::Connection(format!("Failed to create Redis pool for {sanitized_url}: {e}"))
        })?;

        // Validate connection on startup
        let mut conn = pool.get().await.map_err(|e| {
            StoreError::Connection(format!(
                "Failed to get Redis connection from pool for {sanitized_url}: {e}"
            ))
        })?;
        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| {
                StoreError::Connection(format!("Redis PING failed for {sanitized_url}: {e}"))
            })?;

        tracing::debug!(url = %sanitized_url, "Redis datastore connected");

        Ok(Self { pool })
    }
}

/// Build a connection URL from the addr/db/password configuration
fn connection_url(config: &RedisConfig) -> String {
    match &config.password {
        Some(password) => format!("redis://:{}@{}/{}", password, config.addr, config.db),
        None => format!("redis://{}/{}", config.addr, config.db),
    }
}

/// Sanitize a Redis URL for logging (removes password)
///
/// Uses `rfind('@')` so passwords containing `@` are handled.
fn sanitize_redis_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
        if let Some(colon_pos) = url[scheme_end..at_pos].find(':') {
            let abs_colon = scheme_end + colon_pos;
            let prefix = &url[..abs_colon + 1];
            let suffix = &url[at_pos..];
            return format!("{prefix}***{suffix}");
        }
    }
    url.to_string()
}

#[async_trait]
impl Datastore for RedisStore {
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut conn = self.pool.get().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        value.ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn dump(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("{prefix}*");
        let mut entries = Vec::new();
        let mut cursor: u64 = 0;

        // SCAN is O(1) per call, safe for large keyspaces
        loop {
            let (new_cursor, keys): (u64, Vec<String>) = deadpool_redis::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let values: Vec<Option<Vec<u8>>> = deadpool_redis::redis::cmd("MGET")
                    .arg(&keys)
                    .query_async(&mut conn)
                    .await?;
                for (key, value) in keys.into_iter().zip(values) {
                    // A key deleted between SCAN and MGET comes back nil
                    if let Some(value) = value {
                        entries.push((key, value));
                    }
                }
            }

            cursor = new_cursor;
            if cursor == 0 {
                break;
            }
        }

        Ok(entries)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        deadpool_redis::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url_without_password() {
        let config = RedisConfig {
            addr: "localhost:6379".to_string(),
            db: 0,
            password: None,
            connect_timeout_secs: None,
        };
        assert_eq!(connection_url(&config), "redis://localhost:6379/0");
    }

    #[test]
    fn test_connection_url_with_password() {
        let config = RedisConfig {
            addr: "redis.example.com:6379".to_string(),
            db: 2,
            password: Some("hunter2".to_string()),
            connect_timeout_secs: None,
        };
        assert_eq!(
            connection_url(&config),
            "redis://:hunter2@redis.example.com:6379/2"
        );
    }

    #[test]
    fn test_sanitize_redis_url_no_password() {
        let url = "redis://localhost:6379/0";
        assert_eq!(sanitize_redis_url(url), "redis://localhost:6379/0");
    }

    #[test]
    fn test_sanitize_redis_url_with_password() {
        let url = "redis://:secretpassword@localhost:6379/0";
        assert_eq!(sanitize_redis_url(url), "redis://:***@localhost:6379/0");
    }

    #[test]
    fn test_sanitize_redis_url_password_with_at() {
        // Password contains @ - the last @ is the separator
        let url = "redis://:p@ssword@redis.example.com:6379/1";
        assert_eq!(
            sanitize_redis_url(url),
            "redis://:***@redis.example.com:6379/1"
        );
    }
}
