// Report rendering and export

use hrefhound_scanner::{BrokenPage, CrawlSummary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CSV_HEADER: &str = "URL con Error,Encontrado en";
pub const DEFAULT_REPORT_FILE: &str = "errores_404.csv";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Csv,
    Json,
    Text,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(ReportFormat::Csv),
            "json" => Some(ReportFormat::Json),
            "text" | "txt" => Some(ReportFormat::Text),
            _ => None,
        }
    }
}

/// Quotes a CSV field, doubling embedded quotes.
pub fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Header plus one `"<url>","<referrer>"` record per broken page, newline separated.
pub fn render_csv(broken: &[BrokenPage]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    let rows: Vec<String> = broken
        .iter()
        .map(|page| {
            format!(
                "{},{}",
                csv_field(&page.url),
                csv_field(&page.referrer.to_string())
            )
        })
        .collect();
    out.push_str(&rows.join("\n"));
    out
}

/// Reads back the `(url, referrer)` pairs of a CSV report, skipping the header.
pub fn read_broken_pages(input: &str) -> Result<Vec<(String, String)>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(input.as_bytes());

    reader
        .records()
        .map(|record| -> Result<(String, String), ReportError> {
            let record = record?;
            let url = record.get(0).unwrap_or_default().to_string();
            let referrer = record.get(1).unwrap_or_default().to_string();
            Ok((url, referrer))
        })
        .collect()
}

/// Plain text summary, suitable for a file.
pub fn render_text(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str(&format!("Start URL: {}\n", summary.start_url));
    report.push_str(&format!("URLs visited: {}\n", summary.visited));
    report.push_str(&format!("Broken pages: {}\n", summary.broken.len()));
    report.push_str(&format!("Failed navigations: {}\n", summary.failed.len()));

    if !summary.broken.is_empty() {
        report.push_str("\nBroken pages:\n");
        for page in &summary.broken {
            report.push_str(&format!(
                "  [{}] {}\n      found on {}\n",
                page.reason, page.url, page.referrer
            ));
        }
    }

    if !summary.failed.is_empty() {
        report.push_str("\nFailed navigations:\n");
        for page in &summary.failed {
            report.push_str(&format!(
                "  {}\n      found on {}\n      {}\n",
                page.url, page.referrer, page.error
            ));
        }
    }

    report
}

pub fn render_report(summary: &CrawlSummary, format: ReportFormat) -> Result<String, ReportError> {
    match format {
        ReportFormat::Csv => Ok(render_csv(&summary.broken)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        ReportFormat::Text => Ok(render_text(summary)),
    }
}

/// Writes the report to `path`, replacing any existing file.
pub fn write_report(
    path: &Path,
    summary: &CrawlSummary,
    format: ReportFormat,
) -> Result<(), ReportError> {
    let contents = render_report(summary, format)?;
    fs::write(path, contents)?;
    Ok(())
}
