//! Report rendering.
//!
//! Turns one collection run's [`ResultSet`] into a static HTML page, one
//! table per device kind. Failed devices stay visible: their rows render
//! with every field as the placeholder string and the failure reason in the
//! status column.

use std::path::{Path, PathBuf};

use askama::Template;
use thiserror::Error;

use crate::model::{DeviceKind, NormalizedRecord, PLACEHOLDER, ResultSet};

/// Report generation error types.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to write the report file.
    #[error("failed to write report: {0}")]
    IoError(#[from] std::io::Error),

    /// Template rendering failed.
    #[error("failed to render report: {0}")]
    RenderError(#[from] askama::Error),
}

/// Sink for one collection run's results.
///
/// Returns the path the report landed at, for logging and chaining.
pub trait ReportSink {
    fn write(&self, results: &ResultSet) -> Result<PathBuf, ReportError>;
}

/// One table row: the source address, its field values in column order, and
/// the probe status.
struct ReportRow {
    address: String,
    cells: Vec<String>,
    ok: bool,
    status: String,
}

/// One table: all records of a kind, in collection order.
struct ReportSection {
    heading: &'static str,
    columns: &'static [&'static str],
    rows: Vec<ReportRow>,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    title: String,
    generated_at: String,
    record_count: usize,
    failure_count: usize,
    sections: Vec<ReportSection>,
}

fn section_heading(kind: DeviceKind) -> &'static str {
    match kind {
        DeviceKind::SwitchCli => "CLI Switches",
        DeviceKind::ServerBmc => "Server BMCs",
        DeviceKind::Hypervisor => "Hypervisor Hosts",
    }
}

fn to_row(record: &NormalizedRecord) -> ReportRow {
    // Records carry exactly their kind's label set; should a label ever be
    // absent, it still renders as the placeholder, never an empty cell.
    let cells = record
        .kind
        .field_labels()
        .iter()
        .map(|label| {
            record
                .fields
                .get(*label)
                .cloned()
                .unwrap_or_else(|| PLACEHOLDER.to_string())
        })
        .collect();

    ReportRow {
        address: record.address.clone(),
        cells,
        ok: record.ok,
        status: match &record.error {
            Some(error) => error.to_string(),
            None => "ok".to_string(),
        },
    }
}

/// Group records into per-kind sections, kinds in a fixed order, records in
/// collection order within each. Kinds without records render no section.
fn build_sections(results: &ResultSet) -> Vec<ReportSection> {
    [
        DeviceKind::SwitchCli,
        DeviceKind::ServerBmc,
        DeviceKind::Hypervisor,
    ]
    .into_iter()
    .filter_map(|kind| {
        let rows: Vec<ReportRow> = results
            .iter()
            .filter(|record| record.kind == kind)
            .map(to_row)
            .collect();

        (!rows.is_empty()).then(|| ReportSection {
            heading: section_heading(kind),
            columns: kind.field_labels(),
            rows,
        })
    })
    .collect()
}

/// Renders the result set to a standalone HTML file.
#[derive(Debug, Clone)]
pub struct HtmlReport {
    output_path: PathBuf,
    title: String,
}

impl HtmlReport {
    pub fn new(output_path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            title: title.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl ReportSink for HtmlReport {
    fn write(&self, results: &ResultSet) -> Result<PathBuf, ReportError> {
        let template = ReportTemplate {
            title: self.title.clone(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            record_count: results.len(),
            failure_count: results.failure_count(),
            sections: build_sections(results),
        };
        let rendered = template.render()?;

        if let Some(parent) = self.output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.output_path, rendered)?;

        tracing::info!(
            path = %self.output_path.display(),
            records = results.len(),
            "Report written"
        );
        Ok(self.output_path.clone())
    }
}
