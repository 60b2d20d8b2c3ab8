//! CSV file repository backend
//!
//! Each item is one row in a comma-separated file whose columns are declared
//! at construction. The file is created with a header row on first use;
//! inserts append, while updates and deletes rewrite the whole file.
//!
//! # Codec fidelity
//!
//! CSV cells are text. On write every scalar is stringified; on read cells
//! are parsed back with scalar inference (integer, then float, then boolean,
//! empty cell → null, anything else stays a string). This round-trips
//! typical typed items, but it is lossy by nature — a string `"30"` comes
//! back as the number `30`, and `"007"` as `7`. That is a documented
//! limitation of this backend, not of the repository contract.

use crate::core::error::{RepoError, RepoResult};
use crate::core::filter::Filter;
use crate::core::model::{self, Model};
use crate::core::repo::Repository;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Repository over a single CSV file.
///
/// ```rust,ignore
/// let repo = CsvFileRepo::<Car>::new("cars.csv", ["registration", "color", "milage"])
///     .with_id_field("registration");
/// ```
#[derive(Clone, Debug)]
pub struct CsvFileRepo<T> {
    path: PathBuf,
    fieldnames: Vec<String>,
    id_field: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CsvFileRepo<T> {
    /// Create a repository over `path` with the given column names.
    ///
    /// The file is not touched until the first operation.
    pub fn new<I, S>(path: impl Into<PathBuf>, fieldnames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            fieldnames: fieldnames.into_iter().map(Into::into).collect(),
            id_field: None,
            _marker: PhantomData,
        }
    }

    /// Declare the id field. Must be one of the column names.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = Some(id_field.into());
        self
    }

    /// The repository file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the repository file with its header row.
    ///
    /// Fails if the file already exists; normal operations create the file
    /// lazily instead.
    pub fn create(&self) -> RepoResult<()> {
        if self.path.exists() {
            return Err(RepoError::storage(
                "csv",
                format!("repository file {} already exists", self.path.display()),
            ));
        }
        self.write_header()
    }

    fn write_header(&self) -> RepoResult<()> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(&self.fieldnames)?;
        writer.flush()?;
        Ok(())
    }

    /// Make sure the file exists and starts with the header row.
    fn ensure_file(&self) -> RepoResult<()> {
        let populated = self
            .path
            .metadata()
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if !populated {
            self.write_header()?;
        }
        Ok(())
    }

    /// Read every row back as a record, applying scalar inference per cell.
    fn read_records(&self) -> RepoResult<Vec<Value>> {
        if !self.path.is_file() {
            self.ensure_file()?;
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = Map::new();
            for (name, cell) in self.fieldnames.iter().zip(row.iter()) {
                record.insert(name.clone(), parse_cell(cell));
            }
            records.push(Value::Object(record));
        }
        Ok(records)
    }

    /// Rewrite the whole file from the given records.
    fn write_records(&self, records: &[Value]) -> RepoResult<()> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(&self.fieldnames)?;
        for record in records {
            writer.write_record(self.render_row(record)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Append a single record at the end of the file.
    fn append_record(&self, record: &Value) -> RepoResult<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(self.render_row(record)?)?;
        writer.flush()?;
        Ok(())
    }

    /// Render one record as a row of cells in column order.
    ///
    /// Fields outside the declared columns are rejected rather than silently
    /// dropped.
    fn render_row(&self, record: &Value) -> RepoResult<Vec<String>> {
        let fields = record
            .as_object()
            .ok_or_else(|| RepoError::validation("CSV rows must come from object records"))?;
        if let Some(unknown) = fields.keys().find(|key| !self.fieldnames.contains(key)) {
            return Err(RepoError::validation(format!(
                "field '{}' is not a declared CSV column",
                unknown
            )));
        }
        Ok(self
            .fieldnames
            .iter()
            .map(|name| render_cell(fields.get(name)))
            .collect())
    }
}

/// Parse a CSV cell back into a JSON scalar.
fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = cell.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = cell.parse::<f64>() {
        return Value::from(float);
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

/// Render a JSON scalar as a CSV cell. Null and missing become the empty
/// string, mirroring `parse_cell`.
fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl<T: Model> Repository<T> for CsvFileRepo<T> {
    fn backend_name(&self) -> &'static str {
        "csv"
    }

    fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }

    async fn insert(&self, item: &T) -> RepoResult<()> {
        self.ensure_file()?;
        let record = self.item_to_data(item)?;
        if let Some(field) = &self.id_field {
            let id = model::record_id(&record, field)?;
            let taken = self
                .read_records()?
                .iter()
                .any(|row| row.get(field) == Some(&id));
            if taken {
                return Err(RepoError::DuplicateKey { id });
            }
        }
        self.append_record(&record)
    }

    async fn query_data(&self, query: &Filter) -> RepoResult<Vec<Value>> {
        Ok(self
            .read_records()?
            .into_iter()
            .filter(|row| query.matches(row))
            .collect())
    }

    async fn query_update(&self, query: &Filter, values: &Map<String, Value>) -> RepoResult<()> {
        let mut records = self.read_records()?;
        for row in records.iter_mut() {
            if query.matches(row) {
                model::apply_values(row, values)?;
            }
        }
        self.write_records(&records)
    }

    async fn query_delete(&self, query: &Filter) -> RepoResult<()> {
        let records: Vec<Value> = self
            .read_records()?
            .into_iter()
            .filter(|row| !query.matches(row))
            .collect();
        self.write_records(&records)
    }
}
