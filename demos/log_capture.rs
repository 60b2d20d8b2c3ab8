//! Capture tracing events into a repository and query them back.
//!
//! Run with:
//! ```sh
//! cargo run --example log_capture
//! ```

use repokit::prelude::*;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let log_repo: MemoryRepo<LogRecord> = MemoryRepo::with_id_field("id");
    tracing_subscriber::registry()
        .with(RepoLayer::new(log_repo.clone()))
        .init();

    tracing::info!(task = "import", "starting up");
    tracing::warn!(disk_free_mb = 412, "disk space low");
    tracing::error!(code = 500, "import failed");

    // The writer task drains the channel asynchronously.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let problems = log_repo.filter_by(filter!(level: not_equal("INFO")));
    println!("captured {} problem(s):", problems.count().await?);
    for record in problems.all().await? {
        println!("  [{}] {} {:?}", record.level, record.message, record.fields);
    }

    Ok(())
}
