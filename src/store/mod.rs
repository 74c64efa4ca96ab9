//! Storage abstraction for the `links` collection.
//!
//! The [`LinkStore`] trait covers the two read-only operations a stuck check
//! needs, so the HTTP layer and the report core do not care whether the
//! records live in MongoDB or in memory.
//!
//! Implementations must be `Send + Sync` to be shared across handlers.

pub mod memory;
pub mod mongo;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::LinkProjection;
use crate::stage::StageQuery;

pub use memory::InMemoryLinkStore;
pub use mongo::MongoLinkStore;

/// Read-only access to link records.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`count`](LinkStore::count) | Number of records matching the stage predicate |
/// | [`sample`](LinkStore::sample) | Up to `limit` projected records, natural order |
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Count records matching the query's predicate.
    async fn count(&self, query: &StageQuery) -> Result<u64>;

    /// Fetch at most `limit` matching records, projected to the query's fields.
    ///
    /// No sort is applied; records come back in the store's natural order.
    async fn sample(&self, query: &StageQuery, limit: i64) -> Result<Vec<LinkProjection>>;
}
