use anyhow::{Context, Result};
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::time::Duration;
use tracing::info;

use crate::config::DbConfig;

/// Open a client for the configured deployment and verify it answers a ping.
///
/// The driver pools connections internally; callers keep the returned
/// client for the life of the process.
pub async fn connect(db: &DbConfig) -> Result<Client> {
    let mut options = ClientOptions::parse(&db.uri)
        .await
        .with_context(|| "Failed to parse db.uri")?;
    options.app_name = Some("stuckmon".to_string());
    if let Some(secs) = db.server_selection_timeout_secs {
        options.server_selection_timeout = Some(Duration::from_secs(secs));
    }

    let client = Client::with_options(options)?;
    client
        .database(&db.database)
        .run_command(doc! { "ping": 1 })
        .await
        .with_context(|| format!("Failed to reach database '{}'", db.database))?;

    info!(database = %db.database, "connected to document store");
    Ok(client)
}
