//! Repository-backed log capture
//!
//! [`RepoLayer`] is a `tracing_subscriber` layer that writes every emitted
//! event into a repository as a [`LogRecord`], making logs queryable with
//! the same filter language as any other data:
//!
//! ```rust,ignore
//! let log_repo = MemoryRepo::<LogRecord>::with_id_field("id");
//! let layer = RepoLayer::new(log_repo.clone());
//! tracing_subscriber::registry().with(layer).init();
//!
//! tracing::warn!(code = 17, "disk almost full");
//!
//! let warnings = log_repo.filter_by(filter!(level: "WARN")).count().await?;
//! ```
//!
//! The layer callback is synchronous while repositories are async, so
//! records travel over an unbounded channel to a writer task spawned on the
//! current tokio runtime ([`RepoLayer::new`] must therefore be called from
//! within one). A failing or closed sink drops records silently — the
//! logging path never panics and never blocks.

use crate::core::model::Model;
use crate::core::repo::Repository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use uuid::Uuid;

/// One captured log event, shaped as an ordinary repository item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Generated per event, so id-keyed repositories work out of the box
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Level name as emitted by tracing: "TRACE" .. "ERROR"
    pub level: String,
    /// Module path / target of the event
    pub target: String,
    pub message: String,
    /// Remaining structured fields of the event
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// A `tracing_subscriber` layer writing events into a repository.
pub struct RepoLayer {
    sender: mpsc::UnboundedSender<LogRecord>,
}

impl RepoLayer {
    /// Build the layer and spawn its writer task on the current runtime.
    ///
    /// The repository is moved into the writer; pass a clone when the
    /// records should stay queryable elsewhere (the shipped backends all
    /// share state across clones).
    pub fn new<R>(repo: R) -> Self
    where
        R: Repository<LogRecord> + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<LogRecord>();
        tokio::spawn(async move {
            while let Some(record) = receiver.recv().await {
                // A broken log sink must not take the logging path down
                // with it, and reporting through tracing would recurse.
                let _ = repo.insert(&record).await;
            }
        });
        Self { sender }
    }
}

impl<S: Subscriber> Layer<S> for RepoLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        let record = LogRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        };
        let _ = self.sender.send(record);
    }
}

/// Collects event fields into JSON values, keeping `message` separate.
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.insert(field, Value::String(rendered));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_record_round_trips_as_item() {
        let record = LogRecord {
            id: "e1".to_string(),
            timestamp: Utc::now(),
            level: "INFO".to_string(),
            target: "app::startup".to_string(),
            message: "ready".to_string(),
            fields: Map::new(),
        };
        let value = crate::core::model::to_record(&record).unwrap();
        assert_eq!(value["level"], json!("INFO"));
        let back: LogRecord = crate::core::model::from_record(value).unwrap();
        assert_eq!(back, record);
    }
}
