//! JSON directory repository backend
//!
//! Each item is one `{id}.json` file inside the repository directory, so an
//! id field is required at construction. Queries constraining the id field
//! by equality read exactly one file; every other query scans the directory.
//!
//! Records round-trip with full JSON fidelity, unlike the CSV backend. The
//! store-native order of scan results is the lexicographic order of file
//! names.

use crate::core::error::{RepoError, RepoResult};
use crate::core::filter::Filter;
use crate::core::model::{self, Model};
use crate::core::oper::Oper;
use crate::core::repo::Repository;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Repository over a directory of JSON files.
///
/// ```rust,ignore
/// let repo = JsonDirRepo::<Car>::new("data/cars", "registration");
/// ```
#[derive(Clone, Debug)]
pub struct JsonDirRepo<T> {
    path: PathBuf,
    id_field: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDirRepo<T> {
    /// Create a repository over `path`, keyed by `id_field`.
    ///
    /// The directory is created lazily on the first write.
    pub fn new(path: impl Into<PathBuf>, id_field: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id_field: id_field.into(),
            _marker: PhantomData,
        }
    }

    /// The repository directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the repository directory (and parents).
    pub fn create(&self) -> RepoResult<()> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }

    /// The file holding the item with the given id. Ids are used verbatim as
    /// file stems; non-string ids use their JSON rendering.
    fn file_path(&self, id: &Value) -> PathBuf {
        let stem = match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.path.join(format!("{}.json", stem))
    }

    fn read_file(&self, path: &Path) -> RepoResult<Value> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)
            .map_err(|e| RepoError::storage("json", format!("{}: {}", path.display(), e)))?)
    }

    fn write_file(&self, record: &Value) -> RepoResult<()> {
        self.create()?;
        let id = model::record_id(record, &self.id_field)?;
        let contents = serde_json::to_string(record)?;
        fs::write(self.file_path(&id), contents)?;
        Ok(())
    }

    /// Read the records the query can touch: one file when the query pins
    /// the id by equality, otherwise the whole directory in file-name order.
    fn read_data(&self, query: &Filter) -> RepoResult<Vec<Value>> {
        if let Some(Oper::Equal(id)) = query.get(&self.id_field) {
            let path = self.file_path(id);
            if !path.is_file() {
                return Ok(Vec::new());
            }
            return Ok(vec![self.read_file(&path)?]);
        }

        let entries = match fs::read_dir(&self.path) {
            Ok(entries) => entries,
            // A repository nobody has written to yet is simply empty.
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths.iter().map(|path| self.read_file(path)).collect()
    }
}

#[async_trait]
impl<T: Model> Repository<T> for JsonDirRepo<T> {
    fn backend_name(&self) -> &'static str {
        "json"
    }

    fn id_field(&self) -> Option<&str> {
        Some(&self.id_field)
    }

    async fn insert(&self, item: &T) -> RepoResult<()> {
        let record = self.item_to_data(item)?;
        let id = model::record_id(&record, &self.id_field)?;
        self.create()?;
        if self.file_path(&id).exists() {
            return Err(RepoError::DuplicateKey { id });
        }
        self.write_file(&record)
    }

    async fn query_data(&self, query: &Filter) -> RepoResult<Vec<Value>> {
        Ok(self
            .read_data(query)?
            .into_iter()
            .filter(|row| query.matches(row))
            .collect())
    }

    /// Updating the id field is rejected: the id is the file name, and a
    /// rename-on-update is more surprising than useful here.
    async fn query_update(&self, query: &Filter, values: &Map<String, Value>) -> RepoResult<()> {
        if values.contains_key(&self.id_field) {
            return Err(RepoError::validation(format!(
                "cannot update id field '{}' of a JSON directory repository",
                self.id_field
            )));
        }
        for mut record in self.read_data(query)? {
            if query.matches(&record) {
                model::apply_values(&mut record, values)?;
                self.write_file(&record)?;
            }
        }
        Ok(())
    }

    async fn query_delete(&self, query: &Filter) -> RepoResult<()> {
        for record in self.read_data(query)? {
            if query.matches(&record) {
                let id = model::record_id(&record, &self.id_field)?;
                match fs::remove_file(self.file_path(&id)) {
                    Ok(()) => {}
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(())
    }
}
