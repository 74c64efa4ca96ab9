//! Client-side country filter and status classification.
//!
//! The filter runs over the sample a report already carries; it never
//! re-queries. When a report is sampled, a filtered total only counts the
//! matching rows inside the sample and can understate the real number.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{LinkProjection, StuckReport};

/// What a stage page displays after the country filter is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportView {
    /// True total when unfiltered; number of matching sample rows when filtered.
    pub total: u64,
    pub results: Vec<LinkProjection>,
    /// Country code the view was filtered by, if any.
    pub country: Option<String>,
}

impl ReportView {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Restrict a report to rows whose source channel has the given country code.
///
/// `None` or an empty code returns the report unchanged. Filtering an already-filtered view by
/// the same code yields the same view.
pub fn filter_by_country(report: &StuckReport, country: Option<&str>) -> ReportView {
    match country.filter(|code| !code.is_empty()) {
        None => ReportView {
            total: report.total,
            results: report.results.clone(),
            country: None,
        },
        Some(code) => {
            let results: Vec<LinkProjection> = report
                .results
                .iter()
                .filter(|link| link.country_code() == Some(code))
                .cloned()
                .collect();
            ReportView {
                total: results.len() as u64,
                results,
                country: Some(code.to_string()),
            }
        }
    }
}

/// Distinct country codes in a sample with their row counts, ordered by code.
/// Rows without a code are not listed.
pub fn country_breakdown(results: &[LinkProjection]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for code in results.iter().filter_map(LinkProjection::country_code) {
        *counts.entry(code).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(code, n)| (code.to_string(), n))
        .collect()
}

/// Badge tier for a stuck count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Warning,
    Critical,
}

pub const CRITICAL_THRESHOLD: u64 = 10;

impl Health {
    /// `0` is healthy, `1..=9` warning, `10` and above critical.
    pub fn classify(total: u64) -> Self {
        match total {
            0 => Health::Healthy,
            n if n < CRITICAL_THRESHOLD => Health::Warning,
            _ => Health::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Health::Healthy => "healthy",
            Health::Warning => "warning",
            Health::Critical => "critical",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
