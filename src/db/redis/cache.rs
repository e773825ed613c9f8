use redis::{aio::ConnectionManager, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::error::AppResult;
use crate::models::{ItemId, MediaKind};

/// Pending writes beyond this are dropped rather than queued
const WRITE_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Raw catalog details of one item
    ItemDetails(MediaKind, ItemId),
    /// Certification of one item in one region
    Certification(MediaKind, ItemId, String),
    /// One discover page, keyed by its query fragment
    Discover(MediaKind, String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::ItemDetails(kind, id) => write!(f, "details:{}:{}", kind, id),
            CacheKey::Certification(kind, id, region) => {
                write!(f, "cert:{}:{}:{}", kind, id, region.to_uppercase())
            }
            CacheKey::Discover(kind, fragment) => write!(f, "discover:{}:{}", kind, fragment),
        }
    }
}

pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Ok(Client::open(redis_url)?)
}

/// A serialized value on its way to Redis
struct PendingWrite {
    key: String,
    json: String,
    ttl: u64,
}

#[derive(Clone)]
struct Backend {
    conn: ConnectionManager,
    writes: mpsc::Sender<PendingWrite>,
}

/// Read-through cache for catalog responses
///
/// Reads go straight to Redis; writes are queued for a background task so a
/// response never waits on one. A disabled cache always misses and drops
/// writes.
#[derive(Clone)]
pub struct Cache {
    backend: Option<Backend>,
}

/// Owns the background writer; stopping it flushes queued writes
pub struct CacheWriterHandle {
    writer: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
}

impl CacheWriterHandle {
    /// Stops the writer once every queued write has been attempted
    pub async fn shutdown(self) {
        let Some((stop, task)) = self.writer else {
            return;
        };

        let _ = stop.send(());
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Connects to Redis and starts the background writer
    pub async fn connect(client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(client).await?;
        let (writes, queue) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let (stop, stopped) = oneshot::channel();

        let task = tokio::spawn(run_writer(conn.clone(), queue, stopped));
        tracing::info!("Redis cache connected");

        Ok((
            Self {
                backend: Some(Backend { conn, writes }),
            },
            CacheWriterHandle {
                writer: Some((stop, task)),
            },
        ))
    }

    pub fn disabled() -> (Self, CacheWriterHandle) {
        (Self { backend: None }, CacheWriterHandle { writer: None })
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Looks `key` up, treating any Redis failure as a miss
    ///
    /// An entry that no longer decodes as `T` is evicted and reported as a miss,
    /// so the caller refetches and overwrites it.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<T>> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };

        let mut conn = backend.conn.clone();
        let raw: Option<String> = match conn.get(key.to_string()).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Redis read failed, treating as miss");
                return Ok(None);
            }
        };

        let Some(json) = raw else {
            return Ok(None);
        };

        match decode_entry(key, &json) {
            Some(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(Some(value))
            }
            None => {
                let evicted: redis::RedisResult<()> = conn.del(key.to_string()).await;
                if let Err(e) = evicted {
                    tracing::warn!(error = %e, key = %key, "Failed to evict unreadable cache entry");
                }
                Ok(None)
            }
        }
    }

    /// Queues `value` for storage under `key` with a TTL in seconds
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let Some(backend) = &self.backend else {
            return;
        };

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, key = %key, "Failed to serialize cache value");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_string(),
            json,
            ttl,
        };
        if let Err(e) = backend.writes.try_send(write) {
            tracing::warn!(error = %e, key = %key, "Cache write dropped");
        }
    }
}

async fn run_writer(
    mut conn: ConnectionManager,
    mut queue: mpsc::Receiver<PendingWrite>,
    mut stopped: oneshot::Receiver<()>,
) {
    let mut failures = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = &mut stopped => break,
            write = queue.recv() => match write {
                Some(write) => {
                    if let Err(e) = store(&mut conn, write).await {
                        failures += 1;
                        tracing::error!(error = %e, failures, "Cache write failed");
                    }
                }
                None => break,
            },
        }
    }

    queue.close();
    let mut flushed = 0usize;
    while let Ok(write) = queue.try_recv() {
        match store(&mut conn, write).await {
            Ok(()) => flushed += 1,
            Err(e) => tracing::error!(error = %e, "Cache write failed during shutdown"),
        }
    }

    tracing::info!(flushed, failures, "Cache writer stopped");
}

async fn store(conn: &mut ConnectionManager, write: PendingWrite) -> AppResult<()> {
    let _: () = conn.set_ex(write.key, write.json, write.ttl).await?;
    Ok(())
}

fn decode_entry<T: DeserializeOwned>(key: &CacheKey, json: &str) -> Option<T> {
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, key = %key, "Unreadable cache entry, evicting");
            None
        }
    }
}
