//! Redis broker module for the housing backend
//!
//! This module provides the connection to Redis used as the task-queue
//! broker: producers push serialized jobs onto a list and the mail worker
//! moves them with a blocking read into a processing list, where they stay
//! until the worker acknowledges them.

use redis::{AsyncCommands, Client, RedisResult};
use std::time::Duration;
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
    /// Name of the list holding queued mail jobs
    pub mail_queue_key: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    /// - `MAIL_QUEUE_KEY`: List used for mail jobs (default: "housing:mail")
    pub fn from_env() -> Self {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let mail_queue_key =
            std::env::var("MAIL_QUEUE_KEY").unwrap_or_else(|_| "housing:mail".to_string());

        RedisConfig {
            url,
            mail_queue_key,
        }
    }
}

/// Redis connection handle
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Initialize a new Redis client
    pub fn new(config: &RedisConfig) -> RedisResult<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    /// Get a multiplexed connection
    async fn get_connection(&self) -> RedisResult<redis::aio::MultiplexedConnection> {
        self.client.get_multiplexed_async_connection().await
    }

    /// Push a value onto the head of a list
    pub async fn push(&self, key: &str, value: &str) -> RedisResult<()> {
        let mut conn = self.get_connection().await?;
        let _: i64 = conn.lpush(key, value).await?;
        Ok(())
    }

    /// Move a value from the tail of `key` to the head of `processing`,
    /// waiting up to `timeout`
    pub async fn pop_into(
        &self,
        key: &str,
        processing: &str,
        timeout: Duration,
    ) -> RedisResult<Option<String>> {
        let mut conn = self.get_connection().await?;
        redis::cmd("BLMOVE")
            .arg(key)
            .arg(processing)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await
    }

    /// Remove one occurrence of `value` from a list
    pub async fn remove(&self, key: &str, value: &str) -> RedisResult<()> {
        let mut conn = self.get_connection().await?;
        let _: i64 = conn.lrem(key, 1, value).await?;
        Ok(())
    }

    /// Move every entry of `from` back onto the tail of `to`, oldest first
    pub async fn move_all(&self, from: &str, to: &str) -> RedisResult<usize> {
        let mut conn = self.get_connection().await?;
        let mut moved = 0;
        loop {
            let value: Option<String> = redis::cmd("LMOVE")
                .arg(from)
                .arg(to)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;
            if value.is_none() {
                return Ok(moved);
            }
            moved += 1;
        }
    }

    /// Number of entries waiting in a list
    pub async fn len(&self, key: &str) -> RedisResult<usize> {
        let mut conn = self.get_connection().await?;
        conn.llen(key).await
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> RedisResult<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}
