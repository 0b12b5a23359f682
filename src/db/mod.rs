pub mod catalog;
pub mod interactions;
pub mod likes;
pub mod postgres;
pub mod redis;

pub use catalog::PgCatalogStore;
pub use interactions::PgInteractionLog;
pub use likes::PgLikeStore;
pub use postgres::{create_pool, run_migrations};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
