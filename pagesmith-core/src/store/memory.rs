//! In-memory store.
//!
//! Collections are kept in a map behind an `RwLock`. Locks are never held
//! across an await point, so concurrent callers interleave between
//! operations exactly as they would against a remote store.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Store, StoreError};
use crate::identifier::Identifier;

type Collections = HashMap<String, HashMap<Identifier, Value>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, StoreError> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, StoreError> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        id: &Identifier,
        record: &Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        let records = collections.entry(collection.to_string()).or_default();
        if records.contains_key(id) {
            return Err(StoreError::duplicate_key(collection, id));
        }
        records.insert(id.clone(), record.clone());
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &Identifier,
        record: &Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        match collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(id))
        {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    async fn find_by_id(&self, collection: &str, id: &Identifier) -> Result<Value, StoreError> {
        let collections = self.read()?;
        collections
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn find_max_identifier(&self, collection: &str) -> Result<Option<u64>, StoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .and_then(|records| records.keys().filter_map(Identifier::as_sequence).max()))
    }

    async fn count(&self, collection: &str) -> Result<u64, StoreError> {
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map_or(0, |records| records.len() as u64))
    }

    async fn remove(&self, collection: &str, id: &Identifier) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        collections
            .get_mut(collection)
            .and_then(|records| records.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn remove_all(&self, collection: &str) -> Result<u64, StoreError> {
        let mut collections = self.write()?;
        Ok(collections
            .remove(collection)
            .map_or(0, |records| records.len() as u64))
    }

    async fn drop_all(&self) -> Result<(), StoreError> {
        self.write()?.clear();
        Ok(())
    }
}
