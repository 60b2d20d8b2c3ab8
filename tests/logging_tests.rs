//! Integration tests for the repository-backed tracing layer.

use repokit::prelude::*;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;

/// The writer task drains the channel asynchronously; poll until the
/// expected number of records landed (bounded, so a regression fails fast).
async fn wait_for_records(repo: &MemoryRepo<LogRecord>, expected: usize) {
    for _ in 0..100 {
        if repo.list().await.unwrap().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} log records, got {}",
        expected,
        repo.list().await.unwrap().len()
    );
}

#[tokio::test]
async fn test_events_become_queryable_items() {
    let log_repo: MemoryRepo<LogRecord> = MemoryRepo::with_id_field("id");
    let layer = RepoLayer::new(log_repo.clone());
    let subscriber = tracing_subscriber::registry().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(user = "jack", "login ok");
        tracing::warn!(code = 17, "disk almost full");
        tracing::warn!("another warning");
    });

    wait_for_records(&log_repo, 3).await;

    // Captured events are ordinary items: filterable, countable.
    assert_eq!(
        log_repo
            .filter_by(filter!(level: "WARN"))
            .count()
            .await
            .unwrap(),
        2
    );

    let info = log_repo
        .filter_by(filter!(level: "INFO"))
        .first()
        .await
        .unwrap();
    assert_eq!(info.message, "login ok");
    assert_eq!(info.fields.get("user"), Some(&json!("jack")));
    assert!(!info.id.is_empty());
}

#[tokio::test]
async fn test_structured_fields_survive_capture() {
    let log_repo: MemoryRepo<LogRecord> = MemoryRepo::with_id_field("id");
    let layer = RepoLayer::new(log_repo.clone());
    let subscriber = tracing_subscriber::registry().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::error!(code = 500, fatal = true, "boom");
    });

    wait_for_records(&log_repo, 1).await;

    let record = log_repo
        .filter_by(filter!(level: "ERROR"))
        .first()
        .await
        .unwrap();
    assert_eq!(record.fields.get("code"), Some(&json!(500)));
    assert_eq!(record.fields.get("fatal"), Some(&json!(true)));
    assert_eq!(record.message, "boom");
}
