//! Optional Redis mirror of cache documents
//!
//! Lets several server instances share one inventory snapshot. The file on
//! disk stays authoritative; the mirror is only read when the file is absent.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::config::RedisSettings;

/// Shared store of serialized cache documents, keyed by profile
#[async_trait]
pub trait DocumentMirror: Send + Sync {
    async fn publish(&self, profile: &str, payload: &str) -> Result<()>;

    async fn fetch(&self, profile: &str) -> Result<Option<String>>;
}

/// Redis connection wrapper using redis-rs
pub struct CacheMirror {
    connection: redis::aio::ConnectionManager,
    key_prefix: String,
    ttl: Option<Duration>,
}

impl CacheMirror {
    pub async fn connect(settings: &RedisSettings) -> Result<Self> {
        let client = redis::Client::open(settings.url.as_str())
            .context("Failed to create Redis client")?;

        let connection = redis::aio::ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!(url = %settings.url, prefix = %settings.key_prefix, "Connected to Redis cache mirror");
        Ok(Self {
            connection,
            key_prefix: settings.key_prefix.clone(),
            ttl: (settings.ttl_seconds > 0).then(|| Duration::from_secs(settings.ttl_seconds)),
        })
    }

    /// Connect when enabled, logging and continuing without a mirror on failure
    pub async fn from_settings(settings: &RedisSettings) -> Option<Self> {
        if !settings.enabled {
            return None;
        }
        match Self::connect(settings).await {
            Ok(mirror) => Some(mirror),
            Err(e) => {
                error!(error = %e, "Redis unavailable, cache mirror disabled");
                None
            }
        }
    }

    pub fn key(&self, profile: &str) -> String {
        mirror_key(&self.key_prefix, profile)
    }
}

#[async_trait]
impl DocumentMirror for CacheMirror {
    async fn publish(&self, profile: &str, payload: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let key = self.key(profile);

        if let Some(ttl) = self.ttl {
            redis::cmd("SETEX")
                .arg(&key)
                .arg(ttl.as_secs())
                .arg(payload)
                .query_async::<_, ()>(&mut conn)
                .await
                .context("Redis SETEX failed")?;
        } else {
            redis::cmd("SET")
                .arg(&key)
                .arg(payload)
                .query_async::<_, ()>(&mut conn)
                .await
                .context("Redis SET failed")?;
        }

        debug!(key = %key, bytes = payload.len(), "Published cache document");
        Ok(())
    }

    async fn fetch(&self, profile: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let key = self.key(profile);

        let value: Option<String> = redis::cmd("GET")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .context("Redis GET failed")?;

        debug!(key = %key, found = value.is_some(), "Fetched cache document");
        Ok(value)
    }
}

pub fn mirror_key(prefix: &str, profile: &str) -> String {
    format!("{}:{}", prefix.trim_end_matches(':'), profile)
}
