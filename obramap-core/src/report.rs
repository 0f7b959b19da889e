// Report generation from fetched construction records

use crate::filter::categories;
use crate::model::Construction;
use crate::status::StatusKind;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub source: String,
    pub total: usize,
    /// Records carrying usable coordinates.
    pub mappable: usize,
    pub status_counts: Vec<StatusCount>,
    pub records: Vec<Construction>,
}

pub fn gather_report_data(source: &str, records: &[Construction]) -> ReportData {
    let status_counts = categories(records)
        .into_iter()
        .map(|category| StatusCount {
            label: status_label(&category.status),
            status: category.status,
            count: category.count,
        })
        .collect();

    ReportData {
        source: source.to_string(),
        total: records.len(),
        mappable: records.iter().filter(|r| r.has_coordinates()).count(),
        status_counts,
        records: records.to_vec(),
    }
}

/// Friendly label for known statuses; anything else is shown as stored.
fn status_label(status: &str) -> String {
    match StatusKind::from_status(status) {
        StatusKind::Other => status.to_string(),
        kind => kind.label().to_string(),
    }
}

pub fn render_report(data: &ReportData, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Csv => Ok(generate_csv_report(data)),
        ReportFormat::Markdown => Ok(generate_markdown_report(data)),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str("                      OBRAMAP CONSTRUCTION PERMITS REPORT\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    report.push_str(&format!("Source:       {}\n", data.source));
    report.push_str(&format!("Generated:    {}\n", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")));
    report.push_str(&format!("Records:      {}\n", data.total));
    report.push_str(&format!("On the map:   {}\n\n", data.mappable));

    report.push_str(RULE);
    report.push_str("\nSUMMARY BY STATUS\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    if data.status_counts.is_empty() {
        report.push_str("  (no records)\n");
    }
    for entry in &data.status_counts {
        report.push_str(&format!("  {:<24} {}\n", entry.label, entry.count));
    }
    report.push('\n');

    if !data.records.is_empty() {
        report.push_str(RULE);
        report.push_str("\nRECORDS\n");
        report.push_str(RULE);
        report.push_str("\n\n");

        for (idx, record) in data.records.iter().enumerate() {
            let title = record
                .display_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Construction {}", record.id));
            report.push_str(&format!("[{}] {}\n", idx + 1, title));
            report.push_str(&format!("ID:           {}\n", record.id));
            report.push_str(&format!("Status:       {}\n", record.status));
            push_field(&mut report, "License:", &record.license_type);
            push_field(&mut report, "CNPJ:", &record.cnpj);
            push_field(&mut report, "Address:", &record.address);
            push_field(&mut report, "City:", &record.city);
            push_field(&mut report, "Date:", &record.date);
            if record.built_area > 0.0 {
                report.push_str(&format!("Built area:   {} m²\n", record.built_area));
            }
            if record.land_area > 0.0 {
                report.push_str(&format!("Land area:    {} m²\n", record.land_area));
            }
            match record.position() {
                Some(pos) => report.push_str(&format!("Location:     {:.5}, {:.5}\n", pos.lat, pos.lng)),
                None => report.push_str("Location:     not mappable\n"),
            }
            report.push('\n');
            report.push_str(THIN_RULE);
            report.push_str("\n\n");
        }
    }

    report.push_str(RULE);
    report.push_str("\n                          End of Report\n");
    report.push_str(RULE);
    report.push_str("\n\nGenerated by obramap\n");

    report
}

fn push_field(report: &mut String, label: &str, value: &str) {
    if !value.trim().is_empty() {
        report.push_str(&format!("{:<14}{}\n", label, value));
    }
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "obramap",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json",
                "source": data.source
            },
            "summary": {
                "total": data.total,
                "mappable": data.mappable,
                "by_status": data.status_counts
            },
            "records": data.records
        }
    });

    serde_json::to_string_pretty(&json_report)
}

const CSV_HEADER: [&str; 13] = [
    "id",
    "file_name",
    "date",
    "license_type",
    "cnpj",
    "address",
    "company_name",
    "city",
    "built_area",
    "land_area",
    "latitude",
    "longitude",
    "status",
];

pub fn generate_csv_report(data: &ReportData) -> String {
    let mut csv = CSV_HEADER.join(",");
    csv.push('\n');

    for r in &data.records {
        let row = [
            csv_field(&r.id),
            csv_field(&r.file_name),
            csv_field(&r.date),
            csv_field(&r.license_type),
            csv_field(&r.cnpj),
            csv_field(&r.address),
            csv_field(&r.company_name),
            csv_field(&r.city),
            r.built_area.to_string(),
            r.land_area.to_string(),
            r.latitude.to_string(),
            r.longitude.to_string(),
            csv_field(&r.status),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

/// Quote a field when it contains a separator, quote or line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let mut md = String::new();

    md.push_str("# Construction Permits Report\n\n");
    md.push_str(&format!("- **Source:** {}\n", data.source));
    md.push_str(&format!("- **Records:** {}\n", data.total));
    md.push_str(&format!("- **On the map:** {}\n\n", data.mappable));

    md.push_str("## Summary by status\n\n");
    md.push_str("| Status | Count |\n|---|---:|\n");
    for entry in &data.status_counts {
        md.push_str(&format!("| {} | {} |\n", md_cell(&entry.label), entry.count));
    }
    md.push('\n');

    if !data.records.is_empty() {
        md.push_str("## Records\n\n");
        md.push_str("| ID | Name | Status | City | Address |\n|---|---|---|---|---|\n");
        for r in &data.records {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                md_cell(&r.id),
                md_cell(r.display_name().unwrap_or("")),
                md_cell(&r.status),
                md_cell(&r.city),
                md_cell(&r.address),
            ));
        }
    }

    md
}

fn md_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
