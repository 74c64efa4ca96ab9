//! In-memory [`LinkStore`] for tests and local demos.
//!
//! Records are kept as JSON documents per collection, in insertion order,
//! which stands in for the document store's natural order. Timestamps are
//! expected as RFC 3339 strings.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::LinkStore;
use crate::models::{LinkProjection, SourceChannel};
use crate::stage::{lookup, StageQuery, CREATED_AT_FIELD, LINK_YID_FIELD, URL_FIELD};

pub struct InMemoryLinkStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Append a record to `collection`.
    pub fn insert(&self, collection: &str, doc: Value) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow!("link store lock poisoned"))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        Ok(())
    }

    /// Apply `f` to every matching record in natural order.
    fn with_matches<T>(
        &self,
        query: &StageQuery,
        f: impl FnOnce(&mut dyn Iterator<Item = &Value>) -> T,
    ) -> Result<T> {
        let collections = self
            .collections
            .read()
            .map_err(|_| anyhow!("link store lock poisoned"))?;
        let docs = collections
            .get(&query.collection)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let mut matching = docs.iter().filter(|doc| query.matches(doc));
        Ok(f(&mut matching))
    }
}

impl Default for InMemoryLinkStore {
    fn default() -> Self {
        Self::new()
    }
}

fn string_field(doc: &Value, path: &str) -> String {
    lookup(doc, path)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Project a JSON record the way the document store projects it: the
/// `source_channel` object is present only when the record has one, and the
/// country code only when the query asks for it.
fn project(query: &StageQuery, doc: &Value) -> LinkProjection {
    let source_channel = if query.projects_country() {
        doc.get("source_channel")
            .filter(|sc| sc.is_object())
            .map(|sc| SourceChannel {
                country_code: sc
                    .get("country_code")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
    } else {
        None
    };

    let created_at = lookup(doc, CREATED_AT_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    LinkProjection {
        link_yid: string_field(doc, LINK_YID_FIELD),
        url: string_field(doc, URL_FIELD),
        source_channel,
        created_at,
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn count(&self, query: &StageQuery) -> Result<u64> {
        self.with_matches(query, |docs| docs.count() as u64)
    }

    async fn sample(&self, query: &StageQuery, limit: i64) -> Result<Vec<LinkProjection>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        self.with_matches(query, |docs| {
            docs.take(limit).map(|doc| project(query, doc)).collect()
        })
    }
}
