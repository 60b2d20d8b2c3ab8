//! In-memory repository backend
//!
//! Keeps records in a shared `Vec` behind a `RwLock`. Useful for unit tests
//! and prototyping, and as the reference implementation the conformance
//! suite trusts: it implements only the mandatory primitives, so every read
//! goes through the contract's default override chain.

use crate::core::error::{RepoError, RepoResult};
use crate::core::filter::Filter;
use crate::core::model::{self, Model};
use crate::core::repo::Repository;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// Repository over an in-memory collection.
///
/// `Clone` shares the backing collection (the standard `Arc` pattern), so
/// clones observe each other's writes. Insertion order is preserved and is
/// the store-native order of query results.
///
/// # Example
///
/// ```rust,ignore
/// let repo = MemoryRepo::<Car>::with_id_field("registration");
/// repo.insert(&car).await?;
/// ```
#[derive(Clone, Debug)]
pub struct MemoryRepo<T> {
    collection: Arc<RwLock<Vec<Value>>>,
    id_field: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MemoryRepo<T> {
    /// Create an empty repository without an id field.
    pub fn new() -> Self {
        Self {
            collection: Arc::new(RwLock::new(Vec::new())),
            id_field: None,
            _marker: PhantomData,
        }
    }

    /// Create an empty repository with the given id field.
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        Self {
            collection: Arc::new(RwLock::new(Vec::new())),
            id_field: Some(id_field.into()),
            _marker: PhantomData,
        }
    }

    /// Seed the repository with existing records.
    pub fn from_records(records: Vec<Value>, id_field: Option<String>) -> Self {
        Self {
            collection: Arc::new(RwLock::new(records)),
            id_field,
            _marker: PhantomData,
        }
    }

    fn read(&self) -> RepoResult<std::sync::RwLockReadGuard<'_, Vec<Value>>> {
        self.collection
            .read()
            .map_err(|e| RepoError::storage("memory", format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> RepoResult<std::sync::RwLockWriteGuard<'_, Vec<Value>>> {
        self.collection
            .write()
            .map_err(|e| RepoError::storage("memory", format!("lock poisoned: {}", e)))
    }
}

impl<T> Default for MemoryRepo<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Model> Repository<T> for MemoryRepo<T> {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }

    async fn insert(&self, item: &T) -> RepoResult<()> {
        let record = self.item_to_data(item)?;
        let mut collection = self.write()?;
        if let Some(field) = &self.id_field {
            let id = model::record_id(&record, field)?;
            if collection.iter().any(|row| row.get(field) == Some(&id)) {
                return Err(RepoError::DuplicateKey { id });
            }
        }
        collection.push(record);
        Ok(())
    }

    async fn query_data(&self, query: &Filter) -> RepoResult<Vec<Value>> {
        Ok(self
            .read()?
            .iter()
            .filter(|row| query.matches(row))
            .cloned()
            .collect())
    }

    async fn query_update(&self, query: &Filter, values: &Map<String, Value>) -> RepoResult<()> {
        for row in self.write()?.iter_mut() {
            if query.matches(row) {
                model::apply_values(row, values)?;
            }
        }
        Ok(())
    }

    async fn query_delete(&self, query: &Filter) -> RepoResult<()> {
        self.write()?.retain(|row| !query.matches(row));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oper::greater_than;
    use crate::core::repo::RepositoryExt;
    use crate::{filter, values};
    use serde_json::json;

    #[tokio::test]
    async fn test_clone_shares_collection() {
        let repo: MemoryRepo<Value> = MemoryRepo::new();
        let other = repo.clone();
        repo.insert(&json!({"name": "Jack"})).await.unwrap();
        assert_eq!(other.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insertion_order_is_query_order() {
        let repo: MemoryRepo<Value> = MemoryRepo::new();
        for name in ["a", "b", "c"] {
            repo.insert(&json!({"name": name})).await.unwrap();
        }
        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .iter()
            .map(|row| row["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_duplicate_check_requires_id_field() {
        // Without an id field, identical items may coexist.
        let repo: MemoryRepo<Value> = MemoryRepo::new();
        repo.insert(&json!({"id": "1"})).await.unwrap();
        repo.insert(&json!({"id": "1"})).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 2);

        let keyed: MemoryRepo<Value> = MemoryRepo::with_id_field("id");
        keyed.insert(&json!({"id": "1"})).await.unwrap();
        let err = keyed.insert(&json!({"id": "1"})).await.unwrap_err();
        assert!(matches!(err, RepoError::DuplicateKey { .. }));
    }

    #[tokio::test]
    async fn test_seeded_collection() {
        let repo: MemoryRepo<Value> = MemoryRepo::from_records(
            vec![
                json!({"car_type": "van", "milage": 100}),
                json!({"car_type": "truck", "milage": 4000}),
            ],
            None,
        );
        let heavy = repo
            .filter_by(filter!(milage: greater_than(1000)))
            .all()
            .await
            .unwrap();
        assert_eq!(heavy.len(), 1);
        assert_eq!(heavy[0]["car_type"], json!("truck"));
    }

    #[tokio::test]
    async fn test_update_adds_missing_fields() {
        // Schemaless collection: updating a field the record lacks adds it,
        // dict-style.
        let repo: MemoryRepo<Value> = MemoryRepo::new();
        repo.insert(&json!({"name": "Jack"})).await.unwrap();
        repo.filter_by(filter!(name: "Jack"))
            .update(&values!(age: 31))
            .await
            .unwrap();
        assert_eq!(repo.list().await.unwrap()[0]["age"], json!(31));
    }
}
