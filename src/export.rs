//! CSV export of stuck links.
//!
//! Produces the same file a dashboard user downloads: a fixed header, every
//! field double-quoted with embedded quotes doubled, rows separated by `\n`
//! with no trailing newline. Filenames carry the stage prefix, the row count
//! for bulk exports (or the link id for single rows), and a second-resolution
//! UTC timestamp.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::filter::ReportView;
use crate::models::LinkProjection;

pub const CSV_HEADER: [&str; 4] = ["Link YID", "URL", "Country Code", "Created At"];
pub const MISSING_COUNTRY: &str = "N/A";
pub const MISSING_DATE: &str = "Invalid Date";
pub const NO_DATA_MESSAGE: &str = "No data available to download";

/// en-US locale rendering, e.g. `5/1/2024, 8:30:00 AM`.
const LOCALE_DATE_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// One exported line, already rendered to display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub link_yid: String,
    pub url: String,
    pub country_code: String,
    pub created_at: String,
}

impl CsvRow {
    /// Render a link for export, formatting `createdAt` in `tz`.
    pub fn from_link<Tz>(link: &LinkProjection, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let created_at = match link.created_at {
            Some(dt) => dt
                .with_timezone(tz)
                .format(LOCALE_DATE_FORMAT)
                .to_string(),
            None => MISSING_DATE.to_string(),
        };
        Self {
            link_yid: link.link_yid.clone(),
            url: link.url.clone(),
            country_code: link
                .country_code()
                .unwrap_or(MISSING_COUNTRY)
                .to_string(),
            created_at,
        }
    }

    fn fields(&self) -> [&str; 4] {
        [
            self.link_yid.as_str(),
            self.url.as_str(),
            self.country_code.as_str(),
            self.created_at.as_str(),
        ]
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Serialize rows with the header line first.
///
/// An empty slice yields just the header followed by a newline.
pub fn to_csv(rows: &[CsvRow]) -> String {
    let header = CSV_HEADER.join(",");
    if rows.is_empty() {
        return format!("{}\n", header);
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(header);
    for row in rows {
        let quoted: Vec<String> = row.fields().iter().map(|f| quote(f)).collect();
        lines.push(quoted.join(","));
    }
    lines.join("\n")
}

/// Split CSV text into records, honoring quotes, doubled quotes, and
/// separators inside quoted fields.
fn parse_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            '\r' => {}
            _ => field.push(c),
        }
    }

    if in_quotes {
        bail!("unterminated quoted field");
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// Parse CSV produced by [`to_csv`] back into rows.
pub fn parse_csv(text: &str) -> Result<Vec<CsvRow>> {
    let mut records = parse_records(text)?.into_iter();

    match records.next() {
        Some(header) if header == CSV_HEADER => {}
        _ => bail!("missing CSV header"),
    }

    records
        .enumerate()
        .map(|(i, record)| match <[String; 4]>::try_from(record) {
            Ok([link_yid, url, country_code, created_at]) => Ok(CsvRow {
                link_yid,
                url,
                country_code,
                created_at,
            }),
            Err(record) => bail!(
                "row {}: expected {} fields, found {}",
                i + 1,
                CSV_HEADER.len(),
                record.len()
            ),
        })
        .collect()
}

/// `<prefix>[-<count>-items]-<YYYY-MM-DDTHH-MM-SS>.csv`
pub fn generate_filename(prefix: &str, count: Option<u64>, now: DateTime<Utc>) -> String {
    let timestamp = now.format("%Y-%m-%dT%H-%M-%S");
    match count {
        Some(n) => format!("{}-{}-items-{}.csv", prefix, n, timestamp),
        None => format!("{}-{}.csv", prefix, timestamp),
    }
}

/// `<prefix>-<link_yid>-<timestamp>.csv`, with `link_yid` made safe to use
/// as a single path component.
pub fn single_row_filename(prefix: &str, link_yid: &str, now: DateTime<Utc>) -> String {
    generate_filename(&format!("{}-{}", prefix, filename_safe(link_yid)), None, now)
}

/// Replace path separators and other characters filesystems reject with `_`.
/// Leading dots are replaced too so the result can never be `.` or `..`.
fn filename_safe(s: &str) -> String {
    let mut out: String = s
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let dots = out.len() - out.trim_start_matches('.').len();
    out.replace_range(..dots, &"_".repeat(dots));
    out
}

fn write_csv(dir: &Path, filename: &str, rows: &[CsvRow]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;
    let path = dir.join(filename);
    std::fs::write(&path, to_csv(rows))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Export every row of a view. Refuses an empty view without touching disk.
pub fn export_bulk<Tz>(
    view: &ReportView,
    prefix: &str,
    dir: &Path,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Result<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if view.is_empty() {
        bail!(NO_DATA_MESSAGE);
    }
    let rows: Vec<CsvRow> = view
        .results
        .iter()
        .map(|link| CsvRow::from_link(link, tz))
        .collect();
    write_csv(dir, &generate_filename(prefix, Some(view.total), now), &rows)
}

/// Export a single link.
pub fn export_single<Tz>(
    link: &LinkProjection,
    prefix: &str,
    dir: &Path,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Result<PathBuf>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let row = CsvRow::from_link(link, tz);
    write_csv(dir, &single_row_filename(prefix, &link.link_yid, now), &[row])
}
