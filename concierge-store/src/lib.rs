pub mod analytics_repo;
pub mod app_config;
pub mod backends;
pub mod database;
pub mod error;
pub mod insight_repo;
pub mod memory;
pub mod redis_repo;

pub use backends::Backends;
pub use database::DbClient;
pub use error::{StoreError, StoreResult};
pub use redis_repo::RedisClient;
