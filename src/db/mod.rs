pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory::MemoryProfileStore;
pub use postgres::{create_pool, PgProfileStore};
pub use redis::create_redis_client;
pub use redis::{Cache, CacheKey, CacheWriterHandle};
pub use store::ProfileStore;

#[cfg(test)]
pub use store::MockProfileStore;
