use redis::AsyncCommands;
use redis::Client;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Ingredient-search fingerprint mapping to the external ids it resolved to
    IngredientSearch(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::IngredientSearch(fingerprint) => {
                write!(f, "search:{}", fingerprint.to_lowercase())
            }
        }
    }
}

/// Creates a Redis client for caching
///
/// Establishes a connection to Redis for fast data caching.
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Where cached values live
#[derive(Clone)]
enum CacheBackend {
    Redis(Client),
    /// Process-local map, used when Redis is not configured and in tests
    Memory(Arc<RwLock<HashMap<String, MemoryEntry>>>),
}

/// Cache handler for storing and retrieving data from Redis
#[derive(Clone)]
pub struct Cache {
    backend: CacheBackend,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Initiates a graceful shutdown of the cache writer
    ///
    /// Sends a shutdown signal to the writer task and waits for it to flush
    /// all pending writes.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a Redis-backed cache with an async write background task
    ///
    /// This spawns a background task that processes cache writes asynchronously,
    /// preventing cache operations from blocking API responses.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        Self::with_backend(CacheBackend::Redis(redis_client))
    }

    /// Creates a process-local cache with the same write-behind behaviour
    pub fn in_memory() -> (Self, CacheWriterHandle) {
        Self::with_backend(CacheBackend::Memory(Arc::new(RwLock::new(HashMap::new()))))
    }

    fn with_backend(backend: CacheBackend) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        // Spawn background task to process cache writes
        let writer_backend = backend.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(writer_backend, write_rx, shutdown_rx).await;
        });

        let cache = Self { backend, write_tx };
        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// Background task that processes cache write messages
    ///
    /// Continuously receives cache write requests from the channel and applies them
    /// to the backend. On shutdown signal, flushes all remaining messages before exiting.
    async fn cache_writer_task(
        backend: CacheBackend,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");
        let mut failed_writes = 0;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_backend(&backend, msg).await {
                        failed_writes += 1;
                        tracing::error!(error = %e, failed_writes, "Failed to write to cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    tracing::info!(failed_writes, "Cache writer shutting down, flushing remaining writes");

                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_backend(&backend, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes a single message to the backend
    async fn write_to_backend(backend: &CacheBackend, msg: CacheWriteMessage) -> AppResult<()> {
        match backend {
            CacheBackend::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
            }
            CacheBackend::Memory(map) => {
                let mut map = map.write().await;
                let now = Instant::now();
                map.retain(|_, entry| entry.expires_at > now);
                map.insert(
                    msg.key,
                    MemoryEntry {
                        value: msg.value,
                        expires_at: now + Duration::from_secs(msg.ttl),
                    },
                );
            }
        }
        Ok(())
    }

    async fn read_raw(&self, key: &str) -> AppResult<Option<String>> {
        match &self.backend {
            CacheBackend::Redis(client) => {
                let mut conn = client.get_multiplexed_async_connection().await?;
                let cached: Option<String> = conn.get(key).await?;
                Ok(cached)
            }
            CacheBackend::Memory(map) => {
                let map = map.read().await;
                Ok(map
                    .get(key)
                    .filter(|entry| entry.expires_at > Instant::now())
                    .map(|entry| entry.value.clone()))
            }
        }
    }

    /// Retrieves a value from the cache by key
    ///
    /// If the key exists in the cache, the value is deserialized and returned.
    /// If the key does not exist or has expired, `None` is returned.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        match self.read_raw(&format!("{}", key)).await? {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Stores a value in the cache asynchronously without blocking
    ///
    /// This function serializes the value and sends it to a background worker
    /// via a channel. The actual write happens asynchronously, so this
    /// method returns immediately without waiting for the write to complete.
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: format!("{}", key),
            value: json,
            ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_ingredient_search() {
        let key = CacheKey::IngredientSearch("chicken,rice|{}|10".to_string());
        assert_eq!(format!("{}", key), "search:chicken,rice|{}|10");
    }

    #[test]
    fn test_cache_key_display_lowercase() {
        let key = CacheKey::IngredientSearch("EGG|{}|5".to_string());
        assert_eq!(format!("{}", key), "search:egg|{}|5");
    }

    #[tokio::test]
    async fn test_memory_cache_miss() {
        let (cache, _handle) = Cache::in_memory();
        let key = CacheKey::IngredientSearch("nonexistent_key_12345".to_string());
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_memory_set_in_background_writes_to_cache() {
        let (cache, _handle) = Cache::in_memory();
        let key = CacheKey::IngredientSearch("test_async_write".to_string());
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&key, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));
    }

    #[tokio::test]
    async fn test_memory_entry_expires() {
        let (cache, _handle) = Cache::in_memory();
        let key = CacheKey::IngredientSearch("short_lived".to_string());

        cache.set_in_background(&key, &vec![1, 2, 3], 0);
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;

        let retrieved: Option<Vec<i32>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_cache_writer_graceful_shutdown() {
        let (cache, handle) = Cache::in_memory();
        let key = CacheKey::IngredientSearch("test_shutdown".to_string());
        let value = vec!["shutdown_test".to_string()];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server"]
    async fn test_redis_set_in_background_writes_to_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, _handle) = Cache::new(client.clone());

        let key = CacheKey::IngredientSearch("redis_async_write".to_string());
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&key, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        // Clean up
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(format!("{}", key)).await.unwrap();
    }
}
