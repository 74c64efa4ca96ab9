//! Stuck report core: count plus bounded sample for one stage.
//!
//! Used by the HTTP handlers and by the server-side summary. Two sequential
//! point-in-time reads, no retry, nothing cached or written back.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::models::StuckReport;
use crate::stage::{Stage, StageQuery};
use crate::store::LinkStore;

/// Count the stage's matching records, then fetch a sample of at most `limit`.
pub async fn stuck_report(
    store: &dyn LinkStore,
    query: &StageQuery,
    limit: i64,
) -> Result<StuckReport> {
    let total = store.count(query).await?;
    let results = store.sample(query, limit).await?;
    Ok(StuckReport { total, results })
}

/// Anything that can produce a stage's report: the store directly, or a
/// running server over HTTP.
#[async_trait]
pub trait ReportSource: Send + Sync {
    async fn fetch(&self, stage: Stage) -> Result<StuckReport>;
}

/// [`ReportSource`] that queries a [`LinkStore`] in-process.
#[derive(Clone)]
pub struct StoreReportSource {
    store: Arc<dyn LinkStore>,
    collection: String,
    limit: i64,
}

impl StoreReportSource {
    pub fn new(store: Arc<dyn LinkStore>, collection: impl Into<String>, limit: i64) -> Self {
        Self {
            store,
            collection: collection.into(),
            limit,
        }
    }

    pub fn query(&self, stage: Stage) -> StageQuery {
        stage.query(&self.collection)
    }
}

#[async_trait]
impl ReportSource for StoreReportSource {
    async fn fetch(&self, stage: Stage) -> Result<StuckReport> {
        stuck_report(self.store.as_ref(), &self.query(stage), self.limit).await
    }
}
