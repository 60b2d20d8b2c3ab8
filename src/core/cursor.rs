//! Lazy, re-executable query cursors
//!
//! A [`QueryCursor`] is the value produced by
//! [`filter_by`](crate::core::repo::RepositoryExt::filter_by): it captures a
//! repository reference and a [`Filter`] and defers all work until a terminal
//! operation is awaited. Nothing is cached — calling `all()` twice re-queries
//! the live store, so results always reflect external mutation.
//!
//! Read operations dispatch through the repository's optional performance
//! overrides (`query_read_first`, `query_count`, ...), whose default bodies
//! derive from the mandatory `query_data` primitive. Backends never need to
//! know a cursor exists.
//!
//! # Example
//!
//! ```rust,ignore
//! let seniors = repo.filter_by(filter!(age: greater_than(31)));
//! let n = seniors.count().await?;
//! let items = seniors.all().await?;   // same cursor, fresh query
//! ```

use crate::core::error::{RepoError, RepoResult};
use crate::core::filter::Filter;
use crate::core::model::Model;
use crate::core::repo::Repository;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// A deferred query over one repository.
///
/// The cursor borrows the repository, so it cannot outlive it; the filter is
/// owned and never mutated after construction. Operations are meant for
/// sequential use — each terminal call runs to completion on the caller's
/// task before the next begins.
pub struct QueryCursor<'r, T, R: ?Sized> {
    repo: &'r R,
    filter: Filter,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T, R> QueryCursor<'r, T, R>
where
    T: Model,
    R: Repository<T> + ?Sized,
{
    /// Bind a filter to a repository without executing anything.
    pub fn new(repo: &'r R, filter: Filter) -> Self {
        Self {
            repo,
            filter,
            _marker: PhantomData,
        }
    }

    /// The filter this cursor was built with.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Return every matching item, in store-native order.
    ///
    /// No ordering is guaranteed across backends beyond whatever the store
    /// itself yields; callers needing a stable order must sort.
    pub async fn all(&self) -> RepoResult<Vec<T>> {
        let rows = self.repo.query_data(&self.filter).await?;
        rows.into_iter()
            .map(|data| self.repo.data_to_item(data))
            .collect()
    }

    /// Return the first matching item.
    ///
    /// Fails with [`RepoError::ItemNotFound`] when nothing matches; callers
    /// wanting "maybe" semantics should catch it or pre-check with
    /// [`count`](Self::count).
    pub async fn first(&self) -> RepoResult<T> {
        self.repo
            .query_read_first(&self.filter)
            .await?
            .ok_or(RepoError::ItemNotFound)
    }

    /// Return the last matching item, symmetric with [`first`](Self::first).
    pub async fn last(&self) -> RepoResult<T> {
        self.repo
            .query_read_last(&self.filter)
            .await?
            .ok_or(RepoError::ItemNotFound)
    }

    /// Return up to `n` matching items. `n == 0` yields an empty vec
    /// without touching the store's error paths.
    pub async fn limit(&self, n: usize) -> RepoResult<Vec<T>> {
        self.repo.query_read_limit(&self.filter, n).await
    }

    /// Count the matching items.
    pub async fn count(&self) -> RepoResult<usize> {
        self.repo.query_count(&self.filter).await
    }

    /// Apply `values` to every matching item. Zero matches is a no-op, not
    /// an error.
    pub async fn update(&self, values: &Map<String, Value>) -> RepoResult<()> {
        self.repo.query_update(&self.filter, values).await
    }

    /// Delete every matching item. Zero matches is a no-op.
    pub async fn delete(&self) -> RepoResult<()> {
        self.repo.query_delete(&self.filter).await
    }

    /// Replace the matching item with `item`.
    ///
    /// Intended for filters matching at most one item. The default backend
    /// implementation deletes *every* match and inserts the single
    /// replacement, collapsing multiple matches into one item; backends with
    /// an atomic native replace document their own multi-match behavior.
    pub async fn replace(&self, item: &T) -> RepoResult<()> {
        self.repo.query_replace(&self.filter, item).await
    }
}
