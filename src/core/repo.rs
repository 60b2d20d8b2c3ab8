//! The repository contract every backend implements
//!
//! [`Repository<T>`] is the template contract: four mandatory primitives
//! (`insert`, `query_data`, `query_update`, `query_delete`), a set of
//! optional performance overrides whose default bodies derive from the
//! primitives, and the codec hooks translating between items and native
//! records. A backend implements the primitives and overrides only what its
//! store can do better — `LIMIT` pushdown in SQL, `find_one` in a document
//! store.
//!
//! [`RepositoryExt<T>`] layers the convenience surface on top: the
//! [`filter_by`](RepositoryExt::filter_by) cursor entry point and the
//! id-based operations (`get`, `set`, `remove`, `upsert`, ...). It is
//! blanket-implemented, so every backend — including `dyn Repository<T>`
//! behind a `Box` or `Arc` — gets it for free.
//!
//! # Implementing a backend
//!
//! ```rust,ignore
//! struct MyRepo { /* connection handle */ }
//!
//! #[async_trait]
//! impl<T: Model> Repository<T> for MyRepo {
//!     fn backend_name(&self) -> &'static str { "my-store" }
//!
//!     async fn insert(&self, item: &T) -> RepoResult<()> { /* persist */ }
//!     async fn query_data(&self, query: &Filter) -> RepoResult<Vec<Value>> { /* fetch */ }
//!     async fn query_update(&self, query: &Filter, values: &Map<String, Value>) -> RepoResult<()> { /* mutate */ }
//!     async fn query_delete(&self, query: &Filter) -> RepoResult<()> { /* remove */ }
//! }
//! ```

use crate::core::cursor::QueryCursor;
use crate::core::error::{RepoError, RepoResult};
use crate::core::filter::Filter;
use crate::core::model::{self, Model};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// The template contract: a bound handle to one logical collection of items
/// in one backend.
///
/// Created once at configuration time and shared for the life of the
/// application. Connection handles held by implementations are reference
/// counted clones — dropping a repository never closes a handle the caller
/// still owns.
///
/// The contract is deliberately non-transactional: each call runs to
/// completion independently, and multi-step sequences built on top (such as
/// [`RepositoryExt::upsert`]) inherit only whatever guarantees the backend's
/// store gives. No isolation, locking or retry is provided here.
#[async_trait]
pub trait Repository<T: Model>: Send + Sync {
    /// Short backend name used in error wrapping and logs.
    fn backend_name(&self) -> &'static str;

    /// The field whose value uniquely identifies an item, when configured.
    ///
    /// Id-based operations require this; when it is set, every stored item
    /// must carry a unique, non-null value for it, and behavior is undefined
    /// if that invariant is violated.
    fn id_field(&self) -> Option<&str> {
        None
    }

    // =========================================================================
    // Mandatory primitives
    // =========================================================================

    /// Persist one item.
    ///
    /// Fails with [`RepoError::DuplicateKey`] when an id-field is configured
    /// and the item's id already exists.
    async fn insert(&self, item: &T) -> RepoResult<()>;

    /// Fetch the native records matching `query`, in store-native order.
    /// An empty result is not an error.
    async fn query_data(&self, query: &Filter) -> RepoResult<Vec<Value>>;

    /// Apply `values` to every record matching `query`.
    async fn query_update(&self, query: &Filter, values: &Map<String, Value>) -> RepoResult<()>;

    /// Delete every record matching `query`. Zero matches is a no-op.
    async fn query_delete(&self, query: &Filter) -> RepoResult<()>;

    // =========================================================================
    // Codec hooks
    // =========================================================================

    /// Convert an item into the backend's record representation.
    ///
    /// The default serializes through serde into a JSON object. Backends
    /// with a different native shape (documents, rows) convert further
    /// inside their primitives.
    fn item_to_data(&self, item: &T) -> RepoResult<Value> {
        model::to_record(item)
    }

    /// Convert a native record back into an item.
    ///
    /// Must round-trip with [`item_to_data`](Self::item_to_data) for every
    /// value the store can represent exactly; flat-file backends that
    /// stringify scalars document their lossiness.
    fn data_to_item(&self, data: Value) -> RepoResult<T> {
        model::from_record(data)
    }

    // =========================================================================
    // Optional performance overrides
    // =========================================================================

    /// Read the first matching item. Default: first record of
    /// [`query_data`](Self::query_data).
    async fn query_read_first(&self, query: &Filter) -> RepoResult<Option<T>> {
        let mut rows = self.query_data(query).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        self.data_to_item(rows.swap_remove(0)).map(Some)
    }

    /// Read the last matching item. Default: last record of
    /// [`query_data`](Self::query_data).
    async fn query_read_last(&self, query: &Filter) -> RepoResult<Option<T>> {
        match self.query_data(query).await?.pop() {
            Some(data) => self.data_to_item(data).map(Some),
            None => Ok(None),
        }
    }

    /// Read up to `n` matching items. Default: truncate
    /// [`query_data`](Self::query_data).
    async fn query_read_limit(&self, query: &Filter, n: usize) -> RepoResult<Vec<T>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        self.query_data(query)
            .await?
            .into_iter()
            .take(n)
            .map(|data| self.data_to_item(data))
            .collect()
    }

    /// Count matching items. Default: length of
    /// [`query_data`](Self::query_data).
    async fn query_count(&self, query: &Filter) -> RepoResult<usize> {
        Ok(self.query_data(query).await?.len())
    }

    /// Replace the match with `item`. Default: delete every match, then
    /// insert the replacement — multiple matches collapse into the one new
    /// item. Backends overriding this with a native atomic replace document
    /// their own multi-match behavior.
    async fn query_replace(&self, query: &Filter, item: &T) -> RepoResult<()> {
        self.query_delete(query).await?;
        self.insert(item).await
    }
}

/// Convenience operations layered on the contract.
///
/// Blanket-implemented for every `Repository<T>`, sized or not, so it works
/// through `Box<dyn Repository<T>>` and `Arc<dyn Repository<T>>` as well.
/// The id-based operations fail with [`RepoError::Configuration`] when the
/// repository has no id-field configured.
#[async_trait]
pub trait RepositoryExt<T: Model>: Repository<T> {
    /// Start a query: bind `filter` to this repository as a lazy cursor.
    fn filter_by(&self, filter: Filter) -> QueryCursor<'_, T, Self> {
        QueryCursor::new(self, filter)
    }

    /// Build the `{id_field: id}` filter used by the id-based operations.
    fn id_query(&self, id: &Value) -> RepoResult<Filter> {
        let field = self.id_field().ok_or_else(|| {
            RepoError::configuration(format!(
                "backend '{}' has no id field configured; id-based access is unavailable",
                self.backend_name()
            ))
        })?;
        Ok(Filter::new().field(field, id.clone()))
    }

    /// Fetch the item with the given id.
    ///
    /// Fails with [`RepoError::KeyNotFound`] when absent.
    async fn get(&self, id: Value) -> RepoResult<T> {
        let query = self.id_query(&id)?;
        match self.filter_by(query).first().await {
            Err(RepoError::ItemNotFound) => Err(RepoError::KeyNotFound { id }),
            other => other,
        }
    }

    /// Apply `values` to the item with the given id.
    ///
    /// Fetches first, so a missing id fails with
    /// [`RepoError::KeyNotFound`]. The fetch and the update are two store
    /// calls; atomicity is whatever the backend provides.
    async fn set(&self, id: Value, values: &Map<String, Value>) -> RepoResult<()> {
        let query = self.id_query(&id)?;
        let _ = self.get(id).await?;
        self.filter_by(query).update(values).await
    }

    /// Delete the item with the given id.
    ///
    /// Fails with [`RepoError::KeyNotFound`] when nothing matched. Count and
    /// delete are two store calls; atomicity is whatever the backend
    /// provides.
    async fn remove(&self, id: Value) -> RepoResult<()> {
        let query = self.id_query(&id)?;
        let cursor = self.filter_by(query);
        if cursor.count().await? == 0 {
            return Err(RepoError::KeyNotFound { id });
        }
        cursor.delete().await
    }

    /// Update the stored item matching `item`'s id with `item`'s non-id
    /// fields.
    async fn update_item(&self, item: &T) -> RepoResult<()> {
        let record = self.item_to_data(item)?;
        let id = model::record_id(
            &record,
            self.id_field().ok_or_else(|| {
                RepoError::configuration("update_item requires an id field")
            })?,
        )?;
        let query = self.id_query(&id)?;
        let mut values = record
            .as_object()
            .cloned()
            .unwrap_or_default();
        if let Some(field) = self.id_field() {
            // The id itself is never part of an update.
            values.remove(field);
        }
        self.filter_by(query).update(&values).await
    }

    /// Delete the stored item matching `item`'s id.
    async fn delete_item(&self, item: &T) -> RepoResult<()> {
        let record = self.item_to_data(item)?;
        let id = model::record_id(
            &record,
            self.id_field().ok_or_else(|| {
                RepoError::configuration("delete_item requires an id field")
            })?,
        )?;
        self.remove(id).await
    }

    /// Insert, falling back to [`update_item`](Self::update_item) when the
    /// id already exists. Not an atomic upsert — two store calls.
    async fn upsert(&self, item: &T) -> RepoResult<()> {
        match self.insert(item).await {
            Err(RepoError::DuplicateKey { .. }) => self.update_item(item).await,
            other => other,
        }
    }

    /// Every item in the repository, in store-native order.
    async fn list(&self) -> RepoResult<Vec<T>> {
        self.filter_by(Filter::new()).all().await
    }
}

#[async_trait]
impl<T: Model, R: Repository<T> + ?Sized> RepositoryExt<T> for R {}
