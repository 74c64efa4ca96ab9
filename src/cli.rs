//! Terminal front-end for the checks API: `report`, `export`, `dashboard`.
//!
//! Human output goes to stdout; diagnostics go through `tracing` on stderr.

use anyhow::{bail, Result};
use chrono::{Local, Utc};
use std::path::Path;
use std::time::Duration;

use crate::client::ChecksClient;
use crate::dashboard::{aggregate, DashboardSnapshot, StageView};
use crate::export::{export_bulk, export_single, NO_DATA_MESSAGE};
use crate::filter::{country_breakdown, ReportView};
use crate::stage::Stage;

const URL_DISPLAY_WIDTH: usize = 60;

/// Fetch one stage and print its (optionally country-filtered) rows.
pub async fn run_report(client: &ChecksClient, stage: Stage, country: Option<&str>) -> Result<()> {
    let view = load_view(client, stage, country).await;

    println!("Stuck in {}", stage.label());
    println!("{}", "=".repeat(9 + stage.label().len()));
    println!();

    let (display, data) = match (view.display(), view.data()) {
        (Some(display), Some(data)) => (display, data),
        _ => {
            println!("  No data (could not fetch {}{}).", client.base_url(), stage.route());
            println!();
            return Ok(());
        }
    };

    println!("  Status:    {}", view.status());
    println!("  Total:     {}", display.total);
    if let Some(code) = &display.country {
        println!(
            "  Country:   {} ({} of {} sampled rows; true total {})",
            code,
            display.results.len(),
            data.results.len(),
            data.total
        );
        if data.is_sampled() {
            println!("             filtered totals only cover the sample and may undercount");
        }
    } else if data.is_sampled() {
        println!(
            "  Showing:   {} of {} (sampled)",
            data.results.len(),
            data.total
        );
    }
    if let Some(ts) = view.last_updated() {
        println!(
            "  Updated:   {}",
            ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
    if country.is_some() && !stage.projects_country() {
        println!("  Note:      country codes are not reported for this stage");
    }

    let breakdown = country_breakdown(&data.results);
    if !breakdown.is_empty() && display.country.is_none() {
        let parts: Vec<String> = breakdown
            .iter()
            .map(|(code, n)| format!("{} {}", code, n))
            .collect();
        println!("  Countries: {}", parts.join(", "));
    }

    print_rows(&display);
    Ok(())
}

/// Export the displayed rows (or a single row) to CSV.
pub async fn run_export(
    client: &ChecksClient,
    stage: Stage,
    country: Option<&str>,
    link_yid: Option<&str>,
    out_dir: &Path,
) -> Result<()> {
    let view = load_view(client, stage, country).await;
    let display = match view.display() {
        Some(display) if !display.is_empty() => display,
        _ => bail!(NO_DATA_MESSAGE),
    };

    let path = match link_yid {
        Some(yid) => {
            let link = match display.results.iter().find(|l| l.link_yid == yid) {
                Some(link) => link,
                None => bail!("link {} is not among the displayed rows", yid),
            };
            export_single(link, &stage.csv_prefix(), out_dir, &Local, Utc::now())?
        }
        None => export_bulk(&display, &stage.csv_prefix(), out_dir, &Local, Utc::now())?,
    };

    let rows = if link_yid.is_some() {
        1
    } else {
        display.results.len()
    };
    println!("Exported {} row(s) to {}", rows, path.display());
    Ok(())
}

/// Print the all-stage overview once, or every `watch` interval until Ctrl-C.
pub async fn run_dashboard(client: &ChecksClient, watch: Option<u64>) -> Result<()> {
    let Some(secs) = watch else {
        print_dashboard(&aggregate(client).await);
        return Ok(());
    };

    let mut interval = tokio::time::interval(Duration::from_secs(secs.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => print_dashboard(&aggregate(client).await),
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn load_view(client: &ChecksClient, stage: Stage, country: Option<&str>) -> StageView {
    let mut view = StageView::new(stage);
    view.refresh(client).await;
    if let Some(code) = country {
        view.toggle_country(code);
    }
    view
}

fn print_rows(view: &ReportView) {
    if view.results.is_empty() {
        println!();
        println!("  No stuck links.");
        println!();
        return;
    }

    println!();
    println!(
        "  {:<24} {:<8} {:<20} URL",
        "LINK YID", "COUNTRY", "CREATED AT"
    );
    println!("  {}", "-".repeat(60 + URL_DISPLAY_WIDTH / 2));
    for link in &view.results {
        let created = link
            .created_at
            .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:<8} {:<20} {}",
            link.link_yid,
            link.country_code().unwrap_or("N/A"),
            created,
            truncate(&link.url, URL_DISPLAY_WIDTH)
        );
    }
    println!();
}

fn print_dashboard(snapshot: &DashboardSnapshot) {
    let summary = snapshot.summary();

    println!("Pipeline Check Dashboard");
    println!("========================");
    println!();
    println!("  {:<26} {:>8}   STATUS", "STAGE", "STUCK");
    println!("  {}", "-".repeat(46));
    for result in &snapshot.stages {
        let (total, status) = match (&result.report, result.status()) {
            (Some(report), Some(status)) => (report.total.to_string(), status.to_string()),
            _ => ("-".to_string(), "unavailable".to_string()),
        };
        println!("  {:<26} {:>8}   {}", result.stage.label(), total, status);
    }
    println!();
    println!("  Total stuck: {}", summary.total_stuck);
    println!(
        "  Healthy: {}   Warning: {}   Critical: {}",
        summary.healthy, summary.warning, summary.critical
    );
    println!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", head)
}
