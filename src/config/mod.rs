//! Configuration loading and repository construction
//!
//! A [`StoreConfig`] describes which backend to bind and how, and is usually
//! loaded from YAML at application startup:
//!
//! ```yaml
//! backend: csv_file
//! path: data/cars.csv
//! fieldnames: [registration, color, milage]
//! id_field: registration
//! ```
//!
//! [`StoreConfig::build`] then connects (owning whatever connections it
//! opens) and returns the chosen backend behind `Box<dyn Repository<T>>`, so
//! application code stays backend-agnostic end to end.

use crate::core::error::{RepoError, RepoResult};
use crate::core::model::Model;
use crate::core::repo::Repository;
use crate::storage::{CsvFileRepo, JsonDirRepo, MemoryRepo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Declarative description of one repository binding.
///
/// The `backend` tag selects the variant; the remaining keys are that
/// backend's settings. Variants for optional backends only exist when their
/// feature is enabled — a config naming a compiled-out backend fails to
/// parse with a `Configuration` error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory collection (tests, prototyping)
    Memory {
        #[serde(default)]
        id_field: Option<String>,
    },

    /// CSV file with declared columns
    CsvFile {
        path: PathBuf,
        fieldnames: Vec<String>,
        #[serde(default)]
        id_field: Option<String>,
    },

    /// Directory of `{id}.json` files
    JsonDir {
        path: PathBuf,
        id_field: String,
    },

    /// PostgreSQL table (`postgres` feature)
    #[cfg(feature = "postgres")]
    Postgres {
        url: String,
        table: String,
        #[serde(default)]
        id_field: Option<String>,
        /// Issue `CREATE TABLE IF NOT EXISTS` on build
        #[serde(default)]
        create_table: bool,
    },

    /// MongoDB collection (`mongodb-backend` feature)
    #[cfg(feature = "mongodb-backend")]
    Mongodb {
        uri: String,
        database: String,
        collection: String,
        #[serde(default)]
        id_field: Option<String>,
    },

    /// Remote REST endpoint (`rest` feature)
    #[cfg(feature = "rest")]
    Rest {
        url: String,
        #[serde(default)]
        id_field: Option<String>,
        #[serde(default)]
        result_key: Option<String>,
    },
}

impl StoreConfig {
    /// Parse a config from YAML text.
    pub fn from_yaml_str(yaml: &str) -> RepoResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RepoError::configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Connect and box the configured backend.
    ///
    /// Connections opened here (pools, clients) are owned by the returned
    /// repository and close when it is dropped; nothing external is touched.
    pub async fn build<T: Model>(&self) -> RepoResult<Box<dyn Repository<T>>> {
        match self {
            StoreConfig::Memory { id_field } => {
                let repo = match id_field {
                    Some(field) => MemoryRepo::with_id_field(field.clone()),
                    None => MemoryRepo::new(),
                };
                Ok(Box::new(repo))
            }

            StoreConfig::CsvFile {
                path,
                fieldnames,
                id_field,
            } => {
                let mut repo = CsvFileRepo::new(path.clone(), fieldnames.clone());
                if let Some(field) = id_field {
                    repo = repo.with_id_field(field.clone());
                }
                Ok(Box::new(repo))
            }

            StoreConfig::JsonDir { path, id_field } => {
                Ok(Box::new(JsonDirRepo::new(path.clone(), id_field.clone())))
            }

            #[cfg(feature = "postgres")]
            StoreConfig::Postgres {
                url,
                table,
                id_field,
                create_table,
            } => {
                let pool = sqlx::PgPool::connect(url).await?;
                let mut repo = crate::storage::SqlRepo::new(pool, table.clone());
                if let Some(field) = id_field {
                    repo = repo.with_id_field(field.clone());
                }
                if *create_table {
                    repo.create_table().await?;
                }
                Ok(Box::new(repo))
            }

            #[cfg(feature = "mongodb-backend")]
            StoreConfig::Mongodb {
                uri,
                database,
                collection,
                id_field,
            } => {
                let client = mongodb::Client::with_uri_str(uri).await?;
                let mut repo =
                    crate::storage::MongoRepo::new(client.database(database), collection.clone());
                if let Some(field) = id_field {
                    repo = repo.with_id_field(field.clone());
                }
                Ok(Box::new(repo))
            }

            #[cfg(feature = "rest")]
            StoreConfig::Rest {
                url,
                id_field,
                result_key,
            } => {
                let mut repo = crate::storage::RestRepo::new(url.clone());
                if let Some(field) = id_field {
                    repo = repo.with_id_field(field.clone());
                }
                if let Some(key) = result_key {
                    repo = repo.with_result_key(key.clone());
                }
                Ok(Box::new(repo))
            }
        }
    }
}
