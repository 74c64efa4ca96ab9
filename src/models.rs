//! Core data models: link projections and stuck reports.
//!
//! These are the shapes returned by the `/checks/*` endpoints and consumed by
//! the client, the dashboard aggregator, and the CSV exporter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin channel of a link. Only the country code is ever projected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceChannel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

/// Lightweight projection of a `links` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkProjection {
    pub link_yid: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_channel: Option<SourceChannel>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LinkProjection {
    pub fn country_code(&self) -> Option<&str> {
        self.source_channel
            .as_ref()
            .and_then(|sc| sc.country_code.as_deref())
    }
}

/// Count plus bounded sample for one pipeline stage.
///
/// `total` is the true number of matching records; `results` holds at most
/// the configured sample limit, in natural store order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StuckReport {
    pub total: u64,
    pub results: Vec<LinkProjection>,
}

impl StuckReport {
    /// True when more records match than the sample carries.
    pub fn is_sampled(&self) -> bool {
        (self.results.len() as u64) < self.total
    }
}
