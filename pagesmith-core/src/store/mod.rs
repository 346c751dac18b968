//! Abstract record store.
//!
//! The store is a black box holding JSON records in named collections,
//! keyed by [`Identifier`]. Every backend must enforce uniqueness of the
//! identifier within a collection and report a violation as
//! [`StoreError::DuplicateKey`]; identifier allocation relies on that
//! constraint rather than on any counter primitive.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::identifier::Identifier;

/// Errors reported by a store backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Another record already holds this identifier.
    #[error("Duplicate key {id} in collection {collection}")]
    DuplicateKey { collection: String, id: String },

    #[error("No record {id} in collection {collection}")]
    NotFound { collection: String, id: String },

    /// The backend could not be reached or failed to execute the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl StoreError {
    pub fn duplicate_key(collection: &str, id: &Identifier) -> Self {
        StoreError::DuplicateKey {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn not_found(collection: &str, id: &Identifier) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// A key/value document store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new record. Fails with `DuplicateKey` if `id` is taken.
    async fn insert(&self, collection: &str, id: &Identifier, record: &Value)
        -> Result<(), StoreError>;

    /// Replaces an existing record. Fails with `NotFound` if absent.
    async fn update(&self, collection: &str, id: &Identifier, record: &Value)
        -> Result<(), StoreError>;

    /// Fetches a record. Fails with `NotFound` if absent.
    async fn find_by_id(&self, collection: &str, id: &Identifier) -> Result<Value, StoreError>;

    /// Largest sequence identifier currently held in the collection.
    ///
    /// `Ok(None)` means the collection has no sequence-identified records.
    /// Any failure to answer is an error, never `Ok(None)`.
    async fn find_max_identifier(&self, collection: &str) -> Result<Option<u64>, StoreError>;

    async fn count(&self, collection: &str) -> Result<u64, StoreError>;

    /// Removes a record. Fails with `NotFound` if absent.
    async fn remove(&self, collection: &str, id: &Identifier) -> Result<(), StoreError>;

    /// Removes every record in a collection, returning how many were removed.
    async fn remove_all(&self, collection: &str) -> Result<u64, StoreError>;

    /// Discards every collection.
    async fn drop_all(&self) -> Result<(), StoreError>;
}
