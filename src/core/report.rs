//! Report workbook: one delimited sheet per view, zipped together.

use crate::domain::model::{ReconciledLine, ReconciliationReport};
use crate::utils::error::{ReconError, Result};
use std::io::Write;
use std::str::FromStr;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const REPORT_JSON: &str = "report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    fn delimiter(self) -> Option<u8> {
        match self {
            OutputFormat::Csv => Some(b','),
            OutputFormat::Tsv => Some(b'\t'),
            OutputFormat::Json => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }

    pub fn parse_list(formats: &[String]) -> Result<Vec<OutputFormat>> {
        let mut parsed = Vec::with_capacity(formats.len());
        for format in formats {
            let format = format.parse()?;
            if !parsed.contains(&format) {
                parsed.push(format);
            }
        }
        Ok(parsed)
    }
}

impl FromStr for OutputFormat {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            other => Err(ReconError::InvalidConfigValueError {
                field: "formats".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: csv, tsv, json".to_string(),
            }),
        }
    }
}

/// Round to `places` decimals and drop trailing zeros; never prints `-0`.
pub fn format_decimal(value: f64, places: usize) -> String {
    let text = format!("{:.*}", places, value);
    let trimmed = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

pub fn format_quantity(value: f64) -> String {
    format_decimal(value, 4)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: &'static str,
    pub headers: &'static [&'static str],
    pub rows: Vec<Vec<String>>,
}

const LINE_HEADERS: &[&str] = &[
    "sku",
    "description",
    "status",
    "erp_qty",
    "adjustment_qty",
    "expected_qty",
    "wms_qty",
    "variance",
    "variance_pct",
    "erp_locations",
    "wms_locations",
];

fn line_row(line: &ReconciledLine) -> Vec<String> {
    vec![
        line.sku.clone(),
        line.description.clone().unwrap_or_default(),
        line.status.to_string(),
        format_quantity(line.erp_quantity),
        format_quantity(line.adjustment_quantity),
        format_quantity(line.expected_quantity),
        format_quantity(line.wms_quantity),
        format_quantity(line.variance),
        line.variance_pct
            .map(|pct| format_decimal(pct, 2))
            .unwrap_or_default(),
        line.erp_locations.join("; "),
        line.wms_locations.join("; "),
    ]
}

fn summary_rows(report: &ReconciliationReport) -> Vec<Vec<String>> {
    let s = &report.summary;
    let pairs: Vec<(&str, String)> = vec![
        ("generated_at", s.generated_at.to_rfc3339()),
        ("erp_source", s.erp_source.clone()),
        ("wms_source", s.wms_source.clone()),
        (
            "adjustments_source",
            s.adjustments_source.clone().unwrap_or_default(),
        ),
        ("total_skus", s.total_skus.to_string()),
        ("matched", s.matched.to_string()),
        ("over", s.over.to_string()),
        ("short", s.short.to_string()),
        ("missing_in_wms", s.missing_in_wms.to_string()),
        ("missing_in_erp", s.missing_in_erp.to_string()),
        ("discrepancies", s.discrepancies.to_string()),
        ("match_rate_pct", format_decimal(s.match_rate, 2)),
        ("erp_total", format_quantity(s.erp_total)),
        ("adjustment_total", format_quantity(s.adjustment_total)),
        ("expected_total", format_quantity(s.expected_total)),
        ("wms_total", format_quantity(s.wms_total)),
        ("net_variance", format_quantity(s.net_variance)),
        ("absolute_variance", format_quantity(s.absolute_variance)),
        ("erp_rows", s.erp_rows.to_string()),
        ("wms_rows", s.wms_rows.to_string()),
        ("adjustment_rows", s.adjustment_rows.to_string()),
        ("deferred_adjustments", s.deferred_adjustments.to_string()),
        ("row_issues", s.row_issues.to_string()),
    ];

    pairs
        .into_iter()
        .map(|(metric, value)| vec![metric.to_string(), value])
        .collect()
}

/// Build every sheet for the report. Adjustment and issue sheets are only
/// present when there is something to show.
pub fn build_sheets(report: &ReconciliationReport) -> Vec<Sheet> {
    let mut sheets = vec![
        Sheet {
            name: "discrepancies",
            headers: LINE_HEADERS,
            rows: report.discrepancies().map(line_row).collect(),
        },
        Sheet {
            name: "reconciliation",
            headers: LINE_HEADERS,
            rows: report.lines.iter().map(line_row).collect(),
        },
        Sheet {
            name: "summary",
            headers: &["metric", "value"],
            rows: summary_rows(report),
        },
        Sheet {
            name: "locations",
            headers: &[
                "location", "erp_qty", "wms_qty", "variance", "erp_skus", "wms_skus",
            ],
            rows: report
                .locations
                .iter()
                .map(|loc| {
                    vec![
                        loc.location.clone(),
                        format_quantity(loc.erp_quantity),
                        format_quantity(loc.wms_quantity),
                        format_quantity(loc.variance),
                        loc.erp_skus.to_string(),
                        loc.wms_skus.to_string(),
                    ]
                })
                .collect(),
        },
        Sheet {
            name: "top_discrepancies",
            headers: LINE_HEADERS,
            rows: report.top.iter().map(line_row).collect(),
        },
    ];

    if report.summary.adjustments_source.is_some() {
        sheets.push(Sheet {
            name: "adjustments_by_reason",
            headers: &["reason", "entries", "net_qty"],
            rows: report
                .reasons
                .iter()
                .map(|r| {
                    vec![
                        r.reason.clone(),
                        r.entries.to_string(),
                        format_quantity(r.net_quantity),
                    ]
                })
                .collect(),
        });
    }

    if !report.issues.is_empty() {
        sheets.push(Sheet {
            name: "row_issues",
            headers: &["source", "line", "column", "value", "message"],
            rows: report
                .issues
                .iter()
                .map(|issue| {
                    vec![
                        issue.source.to_string(),
                        issue.line_number.to_string(),
                        issue.column.clone().unwrap_or_default(),
                        issue.value.clone().unwrap_or_default(),
                        issue.message.clone(),
                    ]
                })
                .collect(),
        });
    }

    sheets
}

pub fn write_sheet(sheet: &Sheet, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(sheet.headers)?;
    for row in &sheet.rows {
        writer.write_record(row)?;
    }

    writer.into_inner().map_err(|e| ReconError::ProcessingError {
        message: format!("Failed to finish {} sheet: {}", sheet.name, e),
    })
}

/// Serialize the report into an in-memory ZIP archive.
pub fn build_workbook(report: &ReconciliationReport, formats: &[OutputFormat]) -> Result<Vec<u8>> {
    let sheets = build_sheets(report);
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for format in formats {
        match format.delimiter() {
            Some(delimiter) => {
                for sheet in &sheets {
                    let name = format!("{}.{}", sheet.name, format.extension());
                    tracing::debug!("Adding sheet {} ({} rows)", name, sheet.rows.len());
                    zip.start_file(name, options)?;
                    zip.write_all(&write_sheet(sheet, delimiter)?)?;
                }
            }
            None => {
                zip.start_file(REPORT_JSON, options)?;
                let json_data = serde_json::to_string_pretty(report)?;
                zip.write_all(json_data.as_bytes())?;
            }
        }
    }

    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
