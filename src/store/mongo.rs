//! MongoDB-backed [`LinkStore`].
//!
//! The client is created on first use and reused for every later request;
//! if connecting fails the next request tries again.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::{Client, Collection};
use tokio::sync::OnceCell;

use super::LinkStore;
use crate::config::DbConfig;
use crate::db;
use crate::models::{LinkProjection, SourceChannel};
use crate::stage::{
    ExtraFilter, StageQuery, CREATED_AT_FIELD, EXCLUDE_LINK_FIELD, LINK_YID_FIELD, URL_FIELD,
};

pub struct MongoLinkStore {
    db: DbConfig,
    client: OnceCell<Client>,
}

impl MongoLinkStore {
    pub fn new(db: DbConfig) -> Self {
        Self {
            db,
            client: OnceCell::new(),
        }
    }

    async fn collection(&self, name: &str) -> Result<Collection<Document>> {
        let client = self
            .client
            .get_or_try_init(|| db::connect(&self.db))
            .await?;
        Ok(client.database(&self.db.database).collection(name))
    }
}

/// `{<done_field>: false}`, plus `{exclude_link: {$ne: true}}` when asked.
pub fn filter_document(query: &StageQuery) -> Document {
    let mut filter = Document::new();
    filter.insert(query.done_field.clone(), false);
    if query.extra_filter == ExtraFilter::NotExcluded {
        filter.insert(EXCLUDE_LINK_FIELD, doc! { "$ne": true });
    }
    filter
}

pub fn projection_document(query: &StageQuery) -> Document {
    let mut projection = Document::new();
    for field in query.projection {
        projection.insert(*field, 1);
    }
    projection
}

fn created_at(value: Option<&Bson>) -> Option<DateTime<Utc>> {
    match value? {
        Bson::DateTime(dt) => Some(dt.to_chrono()),
        Bson::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn link_from_document(query: &StageQuery, doc: &Document) -> LinkProjection {
    let source_channel = if query.projects_country() {
        doc.get_document("source_channel")
            .ok()
            .map(|sc| SourceChannel {
                country_code: sc.get_str("country_code").ok().map(str::to_string),
            })
    } else {
        None
    };

    LinkProjection {
        link_yid: doc.get_str(LINK_YID_FIELD).unwrap_or_default().to_string(),
        url: doc.get_str(URL_FIELD).unwrap_or_default().to_string(),
        source_channel,
        created_at: created_at(doc.get(CREATED_AT_FIELD)),
    }
}

#[async_trait]
impl LinkStore for MongoLinkStore {
    async fn count(&self, query: &StageQuery) -> Result<u64> {
        let collection = self.collection(&query.collection).await?;
        let total = collection.count_documents(filter_document(query)).await?;
        Ok(total)
    }

    async fn sample(&self, query: &StageQuery, limit: i64) -> Result<Vec<LinkProjection>> {
        let collection = self.collection(&query.collection).await?;
        let mut cursor = collection
            .find(filter_document(query))
            .projection(projection_document(query))
            .limit(limit)
            .await?;

        let mut links = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            links.push(link_from_document(query, &doc));
        }
        Ok(links)
    }
}
