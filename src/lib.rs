//! # repokit
//!
//! A uniform repository abstraction for Rust: write application code against
//! one trait-based contract and bind it to an in-memory collection, a CSV or
//! JSON file store, a SQL table, a MongoDB collection or a REST endpoint
//! without changing a line of the calling code.
//!
//! ## Features
//!
//! - **One contract, many stores**: backends implement four mandatory
//!   primitives; everything else derives from them
//! - **Store-agnostic filters**: flat AND of field constraints with equality,
//!   ordering, range and membership operators, translated per backend
//! - **Lazy, re-executable cursors**: queries run when a terminal operation
//!   is awaited and always reflect the live store
//! - **Performance overrides**: backends opt into native `LIMIT`, `COUNT`,
//!   `find_one`-style shortcuts without changing callers
//! - **Typed errors**: a small taxonomy (`KeyNotFound`, `DuplicateKey`,
//!   `Unsupported`, ...) callers can match on
//! - **Queryable logs**: a `tracing` layer that writes events into any
//!   repository
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use repokit::prelude::*;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Person { id: String, name: String, age: i64 }
//!
//! let repo = MemoryRepo::<Person>::with_id_field("id");
//!
//! repo.insert(&Person { id: "1".into(), name: "Jack".into(), age: 30 }).await?;
//! repo.insert(&Person { id: "2".into(), name: "John".into(), age: 33 }).await?;
//!
//! // Comparison query
//! let seniors = repo.filter_by(filter!(age: greater_than(31))).all().await?;
//!
//! // Id-based access
//! let jack = repo.get(json!("1")).await?;
//!
//! // Bulk update through a filter
//! repo.filter_by(filter!(name: "Jack"))
//!     .update(&values!(age: 31))
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod logging;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        cursor::QueryCursor,
        error::{RepoError, RepoResult},
        filter::Filter,
        model::Model,
        oper::{
            Oper, between, equal, greater_equal, greater_than, in_, less_equal, less_than,
            not_equal,
        },
        repo::{Repository, RepositoryExt},
    };

    // === Macros ===
    pub use crate::{filter, values};

    // === Storage ===
    pub use crate::storage::{CsvFileRepo, JsonDirRepo, MemoryRepo};
    #[cfg(feature = "mongodb-backend")]
    pub use crate::storage::MongoRepo;
    #[cfg(feature = "postgres")]
    pub use crate::storage::SqlRepo;
    #[cfg(feature = "rest")]
    pub use crate::storage::RestRepo;

    // === Config ===
    pub use crate::config::StoreConfig;

    // === Logging ===
    pub use crate::logging::{LogRecord, RepoLayer};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Map, Value, json};
}
