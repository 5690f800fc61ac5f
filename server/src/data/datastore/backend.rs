//! Datastore trait definition

use async_trait::async_trait;

use super::error::StoreError;

/// Key/value datastore backing every broker entity.
///
/// Both the in-memory and Redis backends implement this trait. Keys are
/// opaque strings; the caller imposes the namespacing convention (see
/// [`super::key`]).
///
/// # Contracts
///
/// - `get` on a missing key fails with [`StoreError::NotFound`].
/// - `delete` on a missing key is a no-op, not an error.
/// - `set` overwrites; no compare-and-swap is exposed at this layer.
/// - `dump` returns a point-in-time snapshot; entries may be mutated
///   concurrently after the snapshot is taken.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Store a value under a key, overwriting any existing value
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Fetch the value under a key
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Remove a key; missing keys are ignored
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Snapshot all entries whose key starts with `prefix`
    async fn dump(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StoreError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
