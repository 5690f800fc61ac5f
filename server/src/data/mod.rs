//! Data storage layer
//!
//! Provides the key/value datastore backing every broker entity:
//! - `datastore` - pluggable key/value storage (in-memory or Redis)

pub mod datastore;

pub use datastore::{Datastore, MemoryStore, StoreError};
