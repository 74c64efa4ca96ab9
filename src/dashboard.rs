//! Dashboard aggregation and per-stage view state.
//!
//! [`aggregate`] fans out one fetch per stage concurrently and never fails as
//! a whole: a stage whose fetch fails is recorded as absent and contributes
//! nothing to the [`HealthSummary`].
//!
//! [`StageView`] holds what a single stage page shows. Refreshes are not
//! de-duplicated or cancelled; whichever response is applied last is what
//! the view displays, even if it was requested first.

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::filter::{filter_by_country, Health, ReportView};
use crate::models::StuckReport;
use crate::report::ReportSource;
use crate::stage::Stage;

/// Result of one stage fetch inside a snapshot. `report` is `None` when the
/// fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub stage: Stage,
    pub report: Option<StuckReport>,
}

impl StageResult {
    pub fn status(&self) -> Option<Health> {
        self.report.as_ref().map(|r| Health::classify(r.total))
    }
}

/// Rolled-up counts across the stages that reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total_stuck: u64,
    pub healthy: u32,
    pub warning: u32,
    pub critical: u32,
}

impl HealthSummary {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = Option<&'a StuckReport>>) -> Self {
        let mut summary = HealthSummary::default();
        for report in reports.into_iter().flatten() {
            summary.total_stuck += report.total;
            match Health::classify(report.total) {
                Health::Healthy => summary.healthy += 1,
                Health::Warning => summary.warning += 1,
                Health::Critical => summary.critical += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub stages: Vec<StageResult>,
}

impl DashboardSnapshot {
    pub fn summary(&self) -> HealthSummary {
        HealthSummary::from_reports(self.stages.iter().map(|s| s.report.as_ref()))
    }

    pub fn get(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Fetch every stage concurrently; failed fetches become absent stages.
pub async fn aggregate(source: &dyn ReportSource) -> DashboardSnapshot {
    let fetches = Stage::ALL.iter().map(|&stage| async move {
        let report = match source.fetch(stage).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(stage = %stage, error = ?e, "stage fetch failed; treating as absent");
                None
            }
        };
        StageResult { stage, report }
    });

    DashboardSnapshot {
        stages: join_all(fetches).await,
    }
}

/// JSON body of `GET /checks/summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub stages: Vec<StageSummary>,
    pub summary: HealthSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage: Stage,
    /// `None` when the stage could not be queried.
    pub total: Option<u64>,
    pub status: Option<Health>,
}

impl From<&DashboardSnapshot> for SummaryResponse {
    fn from(snapshot: &DashboardSnapshot) -> Self {
        let stages = snapshot
            .stages
            .iter()
            .map(|s| StageSummary {
                stage: s.stage,
                total: s.report.as_ref().map(|r| r.total),
                status: s.status(),
            })
            .collect();
        Self {
            stages,
            summary: snapshot.summary(),
        }
    }
}

/// State behind a single stage page, scoped to the page's lifetime.
#[derive(Debug, Clone)]
pub struct StageView {
    stage: Stage,
    loading: bool,
    data: Option<StuckReport>,
    last_updated: Option<DateTime<Utc>>,
    selected_country: Option<String>,
}

impl StageView {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            loading: false,
            data: None,
            last_updated: None,
            selected_country: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn data(&self) -> Option<&StuckReport> {
        self.data.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn selected_country(&self) -> Option<&str> {
        self.selected_country.as_deref()
    }

    pub fn begin_refresh(&mut self) {
        self.loading = true;
    }

    /// Apply a fetch outcome. Success replaces the data and stamps
    /// `last_updated`; failure leaves the stage with no data.
    pub fn finish_refresh(&mut self, result: Result<StuckReport>, now: DateTime<Utc>) {
        self.loading = false;
        match result {
            Ok(report) => {
                self.data = Some(report);
                self.last_updated = Some(now);
            }
            Err(e) => {
                warn!(stage = %self.stage, error = ?e, "refresh failed");
                self.data = None;
            }
        }
    }

    pub async fn refresh(&mut self, source: &dyn ReportSource) {
        self.begin_refresh();
        let result = source.fetch(self.stage).await;
        self.finish_refresh(result, Utc::now());
    }

    /// Select `code`, or clear the filter when `code` is already selected or
    /// empty.
    pub fn toggle_country(&mut self, code: &str) {
        if code.is_empty() || self.selected_country.as_deref() == Some(code) {
            self.selected_country = None;
        } else {
            self.selected_country = Some(code.to_string());
        }
    }

    pub fn clear_country(&mut self) {
        self.selected_country = None;
    }

    /// The filtered view, or `None` before any successful fetch.
    pub fn display(&self) -> Option<ReportView> {
        self.data
            .as_ref()
            .map(|report| filter_by_country(report, self.selected_country.as_deref()))
    }

    /// Badge for the displayed total; a stage without data shows as healthy zero.
    pub fn status(&self) -> Health {
        Health::classify(self.display().map(|v| v.total).unwrap_or(0))
    }
}
