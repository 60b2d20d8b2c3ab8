//! MongoDB repository backend using the official MongoDB async driver.
//!
//! # Feature flag
//!
//! This module is gated behind the `mongodb-backend` feature flag:
//! ```toml
//! [dependencies]
//! repokit = { version = "0.1", features = ["mongodb-backend"] }
//! ```
//!
//! # Storage model
//!
//! A repository binds one collection of a `mongodb::Database`. Records are
//! serialized via `serde_json::Value` as an intermediate format and converted
//! to BSON documents. When an id field is configured it is mapped to
//! MongoDB's `_id` convention on the way in and back on the way out; without
//! one, the driver-generated `_id` is stripped from returned records.
//!
//! # Query translation
//!
//! Every comparison kind has a native rendering: `$gt`, `$gte`, `$lt`,
//! `$lte`, `$ne`, `$in`, and `between` as `$gte` + `$lte` (inclusive on both
//! ends). Reads, counts and limits push down to the server instead of using
//! the contract's scan-based defaults.

use crate::core::error::{RepoError, RepoResult};
use crate::core::filter::Filter;
use crate::core::model::{self, Model};
use crate::core::oper::Oper;
use crate::core::repo::Repository;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use serde_json::{Map, Value};
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

/// Convert a JSON value into BSON, wrapping serializer failures.
fn to_bson(value: &Value) -> RepoResult<Bson> {
    mongodb::bson::to_bson(value).map_err(|e| RepoError::storage("mongodb", e))
}

/// Convert a JSON object record into a BSON document.
fn record_to_document(record: &Value) -> RepoResult<Document> {
    match to_bson(record)? {
        Bson::Document(doc) => Ok(doc),
        _ => Err(RepoError::validation(
            "record must convert to a BSON document",
        )),
    }
}

/// True when the write failed on a unique index (duplicate `_id`).
fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write)) if write.code == 11000
    )
}

// ---------------------------------------------------------------------------
// MongoRepo<T>
// ---------------------------------------------------------------------------

/// Repository backed by one MongoDB collection.
///
/// The `Database` handle is a cheap clone of a shared connection pool; the
/// repository never closes it.
///
/// # Example
///
/// ```rust,ignore
/// use mongodb::Client;
///
/// let client = Client::with_uri_str("mongodb://localhost:27017").await?;
/// let repo = MongoRepo::<Car>::new(client.database("garage"), "cars")
///     .with_id_field("registration");
/// ```
#[derive(Clone, Debug)]
pub struct MongoRepo<T> {
    database: Database,
    collection: String,
    id_field: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MongoRepo<T> {
    /// Create a repository over the given database and collection name.
    pub fn new(database: Database, collection: impl Into<String>) -> Self {
        Self {
            database,
            collection: collection.into(),
            id_field: None,
            _marker: PhantomData,
        }
    }

    /// Declare the id field. It is stored as the document `_id`, so MongoDB
    /// enforces uniqueness natively.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = Some(id_field.into());
        self
    }

    /// Get a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self) -> mongodb::Collection<Document> {
        self.database.collection(&self.collection)
    }

    /// The stored name for a queried field: the configured id field maps to
    /// `_id`, everything else passes through.
    fn storage_field<'a>(&self, field: &'a str) -> &'a str {
        match &self.id_field {
            Some(id) if id == field => "_id",
            _ => field,
        }
    }

    /// Convert a record to a document, renaming the id field to `_id`.
    fn record_to_stored(&self, record: &Value) -> RepoResult<Document> {
        let mut doc = record_to_document(record)?;
        if let Some(field) = &self.id_field
            && let Some(id) = doc.remove(field.as_str())
        {
            doc.insert("_id", id);
        }
        Ok(doc)
    }

    /// Convert a stored document back to a record, undoing the `_id`
    /// renaming (or dropping a driver-generated `_id` when no id field is
    /// configured).
    fn stored_to_record(&self, mut doc: Document) -> Value {
        match &self.id_field {
            Some(field) => {
                if let Some(id) = doc.remove("_id") {
                    doc.insert(field.as_str(), id);
                }
            }
            None => {
                doc.remove("_id");
            }
        }
        Bson::Document(doc).into_relaxed_extjson()
    }

    /// Translate a filter into a MongoDB filter document.
    fn format_query(&self, query: &Filter) -> RepoResult<Document> {
        let mut formatted = Document::new();
        for (field, oper) in query.iter() {
            let constraint = match oper {
                Oper::Equal(v) => to_bson(v)?,
                Oper::NotEqual(v) => Bson::Document(doc! { "$ne": to_bson(v)? }),
                Oper::GreaterThan(v) => Bson::Document(doc! { "$gt": to_bson(v)? }),
                Oper::GreaterEqual(v) => Bson::Document(doc! { "$gte": to_bson(v)? }),
                Oper::LessThan(v) => Bson::Document(doc! { "$lt": to_bson(v)? }),
                Oper::LessEqual(v) => Bson::Document(doc! { "$lte": to_bson(v)? }),
                Oper::Between(low, high) => {
                    Bson::Document(doc! { "$gte": to_bson(low)?, "$lte": to_bson(high)? })
                }
                Oper::In(candidates) => {
                    let values: Vec<Bson> =
                        candidates.iter().map(to_bson).collect::<RepoResult<_>>()?;
                    Bson::Document(doc! { "$in": Bson::Array(values) })
                }
            };
            formatted.insert(self.storage_field(field), constraint);
        }
        Ok(formatted)
    }

    /// Translate update values into a `$set` document with the id renaming
    /// applied.
    fn format_values(&self, values: &Map<String, Value>) -> RepoResult<Document> {
        let mut set = Document::new();
        for (field, value) in values {
            set.insert(self.storage_field(field), to_bson(value)?);
        }
        Ok(set)
    }
}

#[async_trait]
impl<T: Model> Repository<T> for MongoRepo<T> {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }

    async fn insert(&self, item: &T) -> RepoResult<()> {
        let record = self.item_to_data(item)?;
        let doc = self.record_to_stored(&record)?;
        match self.collection().insert_one(doc).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => {
                let id = match &self.id_field {
                    Some(field) => model::record_id(&record, field)?,
                    None => Value::Null,
                };
                Err(RepoError::DuplicateKey { id })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn query_data(&self, query: &Filter) -> RepoResult<Vec<Value>> {
        let filter = self.format_query(query)?;
        let cursor = self.collection().find(filter).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs
            .into_iter()
            .map(|doc| self.stored_to_record(doc))
            .collect())
    }

    async fn query_update(&self, query: &Filter, values: &Map<String, Value>) -> RepoResult<()> {
        let filter = self.format_query(query)?;
        let set = self.format_values(values)?;
        self.collection()
            .update_many(filter, doc! { "$set": set })
            .await?;
        Ok(())
    }

    async fn query_delete(&self, query: &Filter) -> RepoResult<()> {
        let filter = self.format_query(query)?;
        self.collection().delete_many(filter).await?;
        Ok(())
    }

    async fn query_read_first(&self, query: &Filter) -> RepoResult<Option<T>> {
        let filter = self.format_query(query)?;
        match self.collection().find_one(filter).await? {
            Some(doc) => self.data_to_item(self.stored_to_record(doc)).map(Some),
            None => Ok(None),
        }
    }

    async fn query_read_limit(&self, query: &Filter, n: usize) -> RepoResult<Vec<T>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let filter = self.format_query(query)?;
        let cursor = self.collection().find(filter).limit(n as i64).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        docs.into_iter()
            .map(|doc| self.data_to_item(self.stored_to_record(doc)))
            .collect()
    }

    async fn query_count(&self, query: &Filter) -> RepoResult<usize> {
        let filter = self.format_query(query)?;
        let count = self.collection().count_documents(filter).await?;
        Ok(count as usize)
    }

    /// Native replace: swaps the *first* matching document (MongoDB
    /// `replaceOne` semantics), inserting when nothing matches so the
    /// zero-match behavior agrees with the contract's default.
    async fn query_replace(&self, query: &Filter, item: &T) -> RepoResult<()> {
        let filter = self.format_query(query)?;
        let record = self.item_to_data(item)?;
        let doc = self.record_to_stored(&record)?;
        self.collection()
            .replace_one(filter, doc)
            .upsert(true)
            .await?;
        Ok(())
    }
}
