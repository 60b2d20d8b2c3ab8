//! PostgreSQL repository backend using sqlx.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! repokit = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Storage model
//!
//! Items live in a shared table with a JSONB `data` column, plus a TEXT `id`
//! primary-key column when an id field is configured — uniqueness is then
//! enforced by the database, and duplicate inserts surface as
//! `DuplicateKey`.
//!
//! # Query translation
//!
//! Filters become WHERE clauses over `data->>'field'` with type-directed
//! casts: numeric operands compare as `double precision`, booleans as
//! `boolean`, strings as text. Values are always bound parameters, never
//! interpolated. `between` renders as an inclusive pair of comparisons and
//! membership as a chain of equalities. Ordering comparisons against null or
//! structured operands have no meaningful SQL rendering and fail with
//! `Unsupported`.

use crate::core::error::{RepoError, RepoResult};
use crate::core::filter::Filter;
use crate::core::model::{self, Model};
use crate::core::oper::Oper;
use crate::core::repo::Repository;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::marker::PhantomData;

/// Repository backed by one PostgreSQL table.
///
/// The `PgPool` is a cheap clone of a shared connection pool; the repository
/// never closes it.
///
/// # Example
///
/// ```rust,ignore
/// let pool = PgPool::connect("postgres://localhost/garage").await?;
/// let repo = SqlRepo::<Car>::new(pool, "cars").with_id_field("registration");
/// repo.create_table().await?;
/// ```
#[derive(Clone, Debug)]
pub struct SqlRepo<T> {
    pool: PgPool,
    table: String,
    id_field: Option<String>,
    _marker: PhantomData<fn() -> T>,
}

/// Render an id value as its TEXT column form.
fn id_text(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape a field name for use inside a `->>'...'` accessor.
fn escape_field(field: &str) -> String {
    field.replace('\'', "''")
}

impl<T> SqlRepo<T> {
    /// Create a repository over the given pool and table name.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
            id_field: None,
            _marker: PhantomData,
        }
    }

    /// Declare the id field, stored in the TEXT primary-key column.
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = Some(id_field.into());
        self
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the backing table if it does not exist.
    pub async fn create_table(&self) -> RepoResult<()> {
        let sql = if self.id_field.is_some() {
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{}" (id TEXT PRIMARY KEY, data JSONB NOT NULL)"#,
                self.table
            )
        } else {
            format!(
                r#"CREATE TABLE IF NOT EXISTS "{}" (data JSONB NOT NULL)"#,
                self.table
            )
        };
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    fn is_id(&self, field: &str) -> bool {
        self.id_field.as_deref() == Some(field)
    }

    /// Append one `expr op $bind` comparison for a field/value pair,
    /// choosing the column expression and cast from the operand type.
    fn push_cmp(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        field: &str,
        op: &str,
        value: &Value,
    ) -> RepoResult<()> {
        if self.is_id(field) {
            qb.push("id ");
            qb.push(op);
            qb.push(" ");
            qb.push_bind(id_text(value));
            return Ok(());
        }
        let field_sql = escape_field(field);
        match value {
            Value::Number(n) => {
                qb.push(format!("(data->>'{}')::double precision ", field_sql));
                qb.push(op);
                qb.push(" ");
                qb.push_bind(n.as_f64().unwrap_or(f64::MAX));
            }
            Value::Bool(b) => {
                qb.push(format!("(data->>'{}')::boolean ", field_sql));
                qb.push(op);
                qb.push(" ");
                qb.push_bind(*b);
            }
            Value::String(s) => {
                qb.push(format!("data->>'{}' ", field_sql));
                qb.push(op);
                qb.push(" ");
                qb.push_bind(s.clone());
            }
            // `data->'f'` is SQL NULL when the field is missing, so both
            // renderings below are false for absent fields, matching the
            // reference matcher.
            Value::Null => match op {
                "=" | "<>" => {
                    qb.push(format!("data->'{}' ", field_sql));
                    qb.push(op);
                    qb.push(" 'null'::jsonb");
                }
                _ => {
                    return Err(RepoError::unsupported(
                        "postgres",
                        format!("ordering comparison against null for field '{}'", field),
                    ));
                }
            },
            Value::Array(_) | Value::Object(_) => match op {
                "=" | "<>" => {
                    qb.push(format!("data->'{}' ", field_sql));
                    qb.push(op);
                    qb.push(" ");
                    qb.push_bind(value.clone());
                }
                _ => {
                    return Err(RepoError::unsupported(
                        "postgres",
                        format!(
                            "ordering comparison against a structured value for field '{}'",
                            field
                        ),
                    ));
                }
            },
        }
        Ok(())
    }

    /// Append one predicate for a field constraint.
    fn push_predicate(
        &self,
        qb: &mut QueryBuilder<'_, Postgres>,
        field: &str,
        oper: &Oper,
    ) -> RepoResult<()> {
        match oper {
            Oper::Equal(v) => self.push_cmp(qb, field, "=", v),
            Oper::NotEqual(v) => self.push_cmp(qb, field, "<>", v),
            Oper::GreaterThan(v) => self.push_cmp(qb, field, ">", v),
            Oper::GreaterEqual(v) => self.push_cmp(qb, field, ">=", v),
            Oper::LessThan(v) => self.push_cmp(qb, field, "<", v),
            Oper::LessEqual(v) => self.push_cmp(qb, field, "<=", v),
            Oper::Between(low, high) => {
                qb.push("(");
                self.push_cmp(qb, field, ">=", low)?;
                qb.push(" AND ");
                self.push_cmp(qb, field, "<=", high)?;
                qb.push(")");
                Ok(())
            }
            Oper::In(candidates) => {
                qb.push("(");
                for (i, candidate) in candidates.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    self.push_cmp(qb, field, "=", candidate)?;
                }
                qb.push(")");
                Ok(())
            }
        }
    }

    /// Append the WHERE clause for a filter. An empty filter appends
    /// nothing and therefore matches the whole table.
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, query: &Filter) -> RepoResult<()> {
        if query.is_empty() {
            return Ok(());
        }
        qb.push(" WHERE ");
        for (i, (field, oper)) in query.iter().enumerate() {
            if i > 0 {
                qb.push(" AND ");
            }
            self.push_predicate(qb, field, oper)?;
        }
        Ok(())
    }

    fn select(&self) -> QueryBuilder<'_, Postgres> {
        QueryBuilder::new(format!(r#"SELECT data FROM "{}""#, self.table))
    }
}

#[async_trait]
impl<T: Model> Repository<T> for SqlRepo<T> {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }

    async fn insert(&self, item: &T) -> RepoResult<()> {
        let record = self.item_to_data(item)?;
        let result = match &self.id_field {
            Some(field) => {
                let id = model::record_id(&record, field)?;
                let sql = format!(r#"INSERT INTO "{}" (id, data) VALUES ($1, $2)"#, self.table);
                let query = sqlx::query(&sql).bind(id_text(&id)).bind(record.clone());
                match query.execute(&self.pool).await {
                    Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                        return Err(RepoError::DuplicateKey { id });
                    }
                    other => other,
                }
            }
            None => {
                let sql = format!(r#"INSERT INTO "{}" (data) VALUES ($1)"#, self.table);
                sqlx::query(&sql).bind(record).execute(&self.pool).await
            }
        };
        result?;
        Ok(())
    }

    async fn query_data(&self, query: &Filter) -> RepoResult<Vec<Value>> {
        let mut qb = self.select();
        self.push_where(&mut qb, query)?;
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| Ok(row.try_get::<Value, _>("data")?))
            .collect()
    }

    async fn query_update(&self, query: &Filter, values: &Map<String, Value>) -> RepoResult<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            r#"UPDATE "{}" SET data = data || "#,
            self.table
        ));
        qb.push_bind(Value::Object(values.clone()));
        if let Some(field) = &self.id_field
            && let Some(new_id) = values.get(field)
        {
            // Keep the key column in sync when the update rewrites the id.
            qb.push(", id = ");
            qb.push_bind(id_text(new_id));
        }
        self.push_where(&mut qb, query)?;
        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn query_delete(&self, query: &Filter) -> RepoResult<()> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(r#"DELETE FROM "{}""#, self.table));
        self.push_where(&mut qb, query)?;
        qb.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn query_read_first(&self, query: &Filter) -> RepoResult<Option<T>> {
        let mut qb = self.select();
        self.push_where(&mut qb, query)?;
        qb.push(" LIMIT 1");
        match qb.build().fetch_optional(&self.pool).await? {
            Some(row) => self.data_to_item(row.try_get::<Value, _>("data")?).map(Some),
            None => Ok(None),
        }
    }

    async fn query_read_limit(&self, query: &Filter, n: usize) -> RepoResult<Vec<T>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut qb = self.select();
        self.push_where(&mut qb, query)?;
        qb.push(" LIMIT ");
        qb.push_bind(n as i64);
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| self.data_to_item(row.try_get::<Value, _>("data")?))
            .collect()
    }

    async fn query_count(&self, query: &Filter) -> RepoResult<usize> {
        let mut qb =
            QueryBuilder::<Postgres>::new(format!(r#"SELECT COUNT(*) AS n FROM "{}""#, self.table));
        self.push_where(&mut qb, query)?;
        let row = qb.build().fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("n")?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oper::{between, greater_than, in_, less_equal};
    use crate::filter;
    use sqlx::postgres::PgPoolOptions;

    // connect_lazy never touches the network, so the SQL rendering can be
    // unit tested without a server.
    fn repo() -> SqlRepo<Value> {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        SqlRepo::new(pool, "cars").with_id_field("registration")
    }

    fn rendered(repo: &SqlRepo<Value>, filter: &Filter) -> String {
        let mut qb = repo.select();
        repo.push_where(&mut qb, filter).unwrap();
        qb.sql().to_string()
    }

    #[test]
    fn test_empty_filter_has_no_where_clause() {
        let repo = repo();
        assert_eq!(rendered(&repo, &filter!()), r#"SELECT data FROM "cars""#);
    }

    #[test]
    fn test_numeric_comparison_casts() {
        let repo = repo();
        let sql = rendered(&repo, &filter!(milage: greater_than(2000)));
        assert!(sql.contains("(data->>'milage')::double precision > $1"));
    }

    #[test]
    fn test_string_equality_is_text() {
        let repo = repo();
        let sql = rendered(&repo, &filter!(color: "red"));
        assert!(sql.contains("data->>'color' = $1"));
    }

    #[test]
    fn test_conjunction_between_and_membership() {
        let repo = repo();
        let query = filter!(
            milage: between(100, 200),
            color: in_(vec!["red", "blue"]).unwrap(),
        );
        let sql = rendered(&repo, &query);
        assert!(sql.contains(
            "((data->>'milage')::double precision >= $1 AND (data->>'milage')::double precision <= $2)"
        ));
        assert!(sql.contains("AND (data->>'color' = $3 OR data->>'color' = $4)"));
    }

    #[test]
    fn test_id_field_targets_key_column() {
        let repo = repo();
        let sql = rendered(&repo, &filter!(registration: "ABC-123"));
        assert!(sql.contains("WHERE id = $1"));
    }

    #[test]
    fn test_ordering_against_null_is_unsupported() {
        let repo = repo();
        let mut qb = repo.select();
        let err = repo
            .push_where(&mut qb, &filter!(color: less_equal(Value::Null)))
            .unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_OPERATION");
    }
}
