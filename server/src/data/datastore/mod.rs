//! Datastore module
//!
//! A single capability: a mapping from an opaque key to an opaque value,
//! with pluggable backends:
//! - In-memory (default) - mutex-guarded map
//! - Redis (optional) - uses deadpool-redis
//!
//! Values are self-describing records (see `broker::record`); keys follow
//! the namespacing convention in [`key`].

mod backend;
mod error;
pub mod key;
mod memory;
mod redis;

use std::sync::Arc;

pub use backend::Datastore;
pub use error::StoreError;
pub use memory::MemoryStore;

use crate::core::config::{DatastoreBackendType, DatastoreConfig};

/// Build a datastore from configuration
pub async fn from_config(config: &DatastoreConfig) -> Result<Arc<dyn Datastore>, StoreError> {
    let store: Arc<dyn Datastore> = match config.backend {
        DatastoreBackendType::Memory => {
            tracing::debug!("Initializing in-memory datastore");
            Arc::new(MemoryStore::new())
        }
        DatastoreBackendType::Redis => {
            let redis_config = config.redis.as_ref().ok_or_else(|| {
                StoreError::Config("redis configuration required for Redis backend".into())
            })?;
            // Note: RedisStore::connect logs sanitized URL internally
            Arc::new(redis::RedisStore::connect(redis_config).await?)
        }
    };

    Ok(store)
}
