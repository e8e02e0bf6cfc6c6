//! CSV exports of the daily summary
//!
//! UTF-8, comma separated, header first. Money is printed in major units
//! with two decimals. Reports go through the strict aggregation path, so a
//! load failure is an error instead of a misleading file.

use chrono::NaiveDate;

use crate::aggregation::{AggregationEngine, Summary};
use crate::error::Result;

pub const SUMMARY_HEADER: &str =
    "date,orders_today,revenue_kw,tax_kw,active_orders,avg_prep_minutes";
pub const VENDOR_HEADER: &str = "date,vendor_id,vendor_name,revenue_kw";

/// Which report to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Summary,
    Vendors,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Summary => "summary",
            ReportKind::Vendors => "vendors",
        }
    }

    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}-{}.csv", self.as_str(), date)
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(ReportKind::Summary),
            "vendors" | "vendor" => Ok(ReportKind::Vendors),
            other => Err(format!("unknown report kind: {}", other)),
        }
    }
}

/// Quote a field when it contains a separator, quote or line break
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_row(out: &mut String, fields: &[&str]) {
    let row: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&row.join(","));
    out.push('\n');
}

/// One header row and one data row
pub fn summary_csv(summary: &Summary) -> String {
    let avg = summary
        .avg_prep_minutes
        .map(|m| format!("{:.1}", m))
        .unwrap_or_default();

    let mut out = String::new();
    out.push_str(SUMMARY_HEADER);
    out.push('\n');
    push_row(
        &mut out,
        &[
            &summary.date.to_string(),
            &summary.orders_count.to_string(),
            &summary.revenue.format_major(),
            &summary.tax.format_major(),
            &summary.active_orders.to_string(),
            &avg,
        ],
    );
    out
}

/// One row per vendor with sales that day
pub fn vendor_csv(summary: &Summary) -> String {
    let date = summary.date.to_string();
    let mut out = String::new();
    out.push_str(VENDOR_HEADER);
    out.push('\n');

    for sales in summary.vendor_sales.iter().filter(|v| !v.total.is_zero()) {
        push_row(
            &mut out,
            &[
                &date,
                &sales.vendor_id.to_string(),
                sales.vendor_name.as_deref().unwrap_or(""),
                &sales.total.format_major(),
            ],
        );
    }
    out
}

/// Produces report files from the aggregation engine
#[derive(Clone)]
pub struct ReportService {
    aggregation: AggregationEngine,
}

impl ReportService {
    pub fn new(aggregation: AggregationEngine) -> Self {
        Self { aggregation }
    }

    /// Render `kind` for `date` (today by default), returning the date used
    pub async fn render(&self, kind: ReportKind, date: Option<NaiveDate>) -> Result<(NaiveDate, String)> {
        let summary = self.aggregation.summarize_strict(date).await?;
        let body = match kind {
            ReportKind::Summary => summary_csv(&summary),
            ReportKind::Vendors => vendor_csv(&summary),
        };
        Ok((summary.date, body))
    }
}
