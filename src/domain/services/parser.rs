//! Delimited-text parsing for the three inventory sources.
//!
//! Row-level problems (blank SKU, unparseable quantity or date) never fail the
//! file: they are collected as [`RowIssue`]s and the row is skipped.

use crate::domain::model::{
    AdjustmentRow, ColumnMap, Field, ParsedExtract, RowIssue, SourceKind, StockRow,
};
use crate::domain::services::headers::{resolve_columns, HeaderSynonyms};
use crate::utils::error::{ReconError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

const STOCK_REQUIRED: &[Field] = &[Field::Sku, Field::Quantity];
const STOCK_OPTIONAL: &[Field] = &[Field::Location, Field::Description];
const ADJUSTMENT_REQUIRED: &[Field] = &[Field::Sku, Field::Quantity];
const ADJUSTMENT_OPTIONAL: &[Field] = &[Field::Location, Field::Reason, Field::Date];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// 1,234 / 1,234,567.89
static THOUSANDS_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(,\d{3})+(\.\d+)?$").expect("valid regex"));

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

/// Pick the delimiter that occurs most often in the header line, ignoring
/// quoted text. Falls back to a comma.
pub fn detect_delimiter(data: &[u8]) -> u8 {
    let header_line = data.split(|&b| b == b'\n').next().unwrap_or_default();

    let mut counts = [0usize; CANDIDATE_DELIMITERS.len()];
    let mut in_quotes = false;
    for &byte in header_line {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(pos) = CANDIDATE_DELIMITERS.iter().position(|&d| d == byte) {
            counts[pos] += 1;
        }
    }

    let mut best = b',';
    let mut best_count = 0;
    for (pos, &count) in counts.iter().enumerate() {
        if count > best_count {
            best = CANDIDATE_DELIMITERS[pos];
            best_count = count;
        }
    }
    best
}

/// Parse a quantity cell.
///
/// Accepts a sign, thousands commas, a decimal comma, grouping spaces,
/// accounting negatives `(12)` and trailing-minus negatives `12-`.
pub fn parse_quantity(raw: &str) -> std::result::Result<f64, String> {
    let mut text: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if text.is_empty() {
        return Err("quantity is empty".to_string());
    }

    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') && text.len() > 2 {
        negative = true;
        text = text[1..text.len() - 1].to_string();
    } else if text.len() > 1 && text.ends_with('-') {
        negative = true;
        text.pop();
    }

    if negative && text.starts_with(['+', '-']) {
        return Err(format!("'{}' has conflicting signs", raw.trim()));
    }

    let unsigned = text.trim_start_matches(['+', '-']);
    if THOUSANDS_COMMA.is_match(unsigned) {
        text = text.replace(',', "");
    } else if text.matches(',').count() == 1 && !text.contains('.') {
        text = text.replace(',', ".");
    }

    let value: f64 = text
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw.trim()))?;
    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", raw.trim()));
    }

    Ok(if negative { -value } else { value })
}

/// Parse an adjustment date. `Ok(None)` for an empty cell.
pub fn parse_date(raw: &str) -> std::result::Result<Option<NaiveDate>, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
    {
        return Ok(Some(date));
    }
    if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Ok(Some(datetime.date()));
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(datetime.date_naive()));
    }

    Err(format!("'{}' is not a recognised date", text))
}

/// Cells that are not valid UTF-8 (Latin-1 exports) are decoded lossily.
fn decode_lossy(record: &csv::ByteRecord) -> csv::StringRecord {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

/// 1-based line of the byte at `offset`.
fn line_at(data: &[u8], offset: usize) -> usize {
    let end = offset.min(data.len());
    data[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Header-resolved table with 1-based line numbers for each non-blank row.
struct Table {
    delimiter: u8,
    columns: ColumnMap,
    records: Vec<(usize, csv::StringRecord)>,
}

impl Table {
    fn read(
        data: &[u8],
        source: SourceKind,
        synonyms: &HeaderSynonyms,
        required: &[Field],
        optional: &[Field],
    ) -> Result<Self> {
        let data = strip_utf8_bom(data);
        if data.iter().all(u8::is_ascii_whitespace) {
            return Err(ReconError::EmptyFile { input: source });
        }

        let delimiter = detect_delimiter(data);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(delimiter)
            .from_reader(data);

        let headers: Vec<String> = decode_lossy(reader.byte_headers()?)
            .iter()
            .map(str::to_string)
            .collect();
        let columns = resolve_columns(&headers, synonyms, required, optional, source)?;

        let mut records = Vec::new();
        for result in reader.byte_records() {
            let raw = result?;
            let record = decode_lossy(&raw);
            if record.iter().all(str::is_empty) {
                continue;
            }
            // csv 的 line() 不計空白行，改由位元組位置推算
            let line_number = raw
                .position()
                .map(|pos| line_at(data, pos.byte() as usize))
                .unwrap_or(records.len() + 2);
            records.push((line_number, record));
        }

        if records.is_empty() {
            return Err(ReconError::NoDataRows { input: source });
        }

        Ok(Self {
            delimiter,
            columns,
            records,
        })
    }

    fn into_extract<T>(
        self,
        source: SourceKind,
        location: &str,
        rows: Vec<T>,
        issues: Vec<RowIssue>,
    ) -> ParsedExtract<T> {
        ParsedExtract {
            source,
            location: location.to_string(),
            delimiter: self.delimiter as char,
            total_rows: self.records.len(),
            columns: self.columns,
            rows,
            issues,
        }
    }
}

fn cell<'r>(record: &'r csv::StringRecord, columns: &ColumnMap, field: Field) -> Option<&'r str> {
    columns
        .index(field)
        .and_then(|idx| record.get(idx))
        .filter(|value| !value.is_empty())
}

fn issue(
    source: SourceKind,
    line_number: usize,
    columns: &ColumnMap,
    field: Field,
    value: Option<&str>,
    message: String,
) -> RowIssue {
    RowIssue {
        source,
        line_number,
        column: columns.header(field).map(str::to_string),
        value: value.map(str::to_string),
        message,
    }
}

/// Shared SKU + quantity extraction; `Err` carries the issue for the row.
fn sku_and_quantity(
    source: SourceKind,
    line_number: usize,
    record: &csv::StringRecord,
    columns: &ColumnMap,
) -> std::result::Result<(String, f64), RowIssue> {
    let sku = cell(record, columns, Field::Sku).ok_or_else(|| {
        issue(
            source,
            line_number,
            columns,
            Field::Sku,
            None,
            "SKU is empty".to_string(),
        )
    })?;

    let raw_quantity = cell(record, columns, Field::Quantity).unwrap_or_default();
    let quantity = parse_quantity(raw_quantity).map_err(|message| {
        issue(
            source,
            line_number,
            columns,
            Field::Quantity,
            Some(raw_quantity),
            message,
        )
    })?;

    Ok((sku.to_string(), quantity))
}

/// Parse an ERP or WMS stock extract.
pub fn parse_stock_extract(
    data: &[u8],
    source: SourceKind,
    location: &str,
    synonyms: &HeaderSynonyms,
) -> Result<ParsedExtract<StockRow>> {
    let table = Table::read(data, source, synonyms, STOCK_REQUIRED, STOCK_OPTIONAL)?;

    let mut rows = Vec::with_capacity(table.records.len());
    let mut issues = Vec::new();

    for (line_number, record) in &table.records {
        match sku_and_quantity(source, *line_number, record, &table.columns) {
            Ok((sku, quantity)) => rows.push(StockRow {
                line_number: *line_number,
                sku,
                quantity,
                location: cell(record, &table.columns, Field::Location).map(str::to_string),
                description: cell(record, &table.columns, Field::Description)
                    .map(str::to_string),
            }),
            Err(row_issue) => {
                tracing::warn!(
                    "{} line {}: {}",
                    source,
                    row_issue.line_number,
                    row_issue.message
                );
                issues.push(row_issue);
            }
        }
    }

    tracing::debug!(
        "Parsed {} {} rows ({} issues) from {}",
        rows.len(),
        source,
        issues.len(),
        location
    );
    Ok(table.into_extract(source, location, rows, issues))
}

/// Parse an adjustments log.
pub fn parse_adjustments(
    data: &[u8],
    location: &str,
    synonyms: &HeaderSynonyms,
) -> Result<ParsedExtract<AdjustmentRow>> {
    let source = SourceKind::Adjustments;
    let table = Table::read(data, source, synonyms, ADJUSTMENT_REQUIRED, ADJUSTMENT_OPTIONAL)?;

    let mut rows = Vec::with_capacity(table.records.len());
    let mut issues = Vec::new();

    for (line_number, record) in &table.records {
        let parsed = sku_and_quantity(source, *line_number, record, &table.columns).and_then(
            |(sku, quantity)| {
                let raw_date = cell(record, &table.columns, Field::Date).unwrap_or_default();
                let date = parse_date(raw_date).map_err(|message| {
                    issue(
                        source,
                        *line_number,
                        &table.columns,
                        Field::Date,
                        Some(raw_date),
                        message,
                    )
                })?;
                Ok(AdjustmentRow {
                    line_number: *line_number,
                    sku,
                    quantity,
                    location: cell(record, &table.columns, Field::Location).map(str::to_string),
                    reason: cell(record, &table.columns, Field::Reason).map(str::to_string),
                    date,
                })
            },
        );

        match parsed {
            Ok(row) => rows.push(row),
            Err(row_issue) => {
                tracing::warn!(
                    "{} line {}: {}",
                    source,
                    row_issue.line_number,
                    row_issue.message
                );
                issues.push(row_issue);
            }
        }
    }

    tracing::debug!(
        "Parsed {} adjustment rows ({} issues) from {}",
        rows.len(),
        issues.len(),
        location
    );
    Ok(table.into_extract(source, location, rows, issues))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(data: &str) -> Result<ParsedExtract<StockRow>> {
        parse_stock_extract(
            data.as_bytes(),
            SourceKind::Erp,
            "erp.csv",
            &HeaderSynonyms::default(),
        )
    }

    #[test]
    fn test_parse_quantity_formats() {
        assert_eq!(parse_quantity("42"), Ok(42.0));
        assert_eq!(parse_quantity(" +7 "), Ok(7.0));
        assert_eq!(parse_quantity("-3.5"), Ok(-3.5));
        assert_eq!(parse_quantity("1,234.50"), Ok(1234.5));
        assert_eq!(parse_quantity("1,234,567"), Ok(1_234_567.0));
        assert_eq!(parse_quantity("12,5"), Ok(12.5));
        assert_eq!(parse_quantity("1 234"), Ok(1234.0));
        assert_eq!(parse_quantity("(12)"), Ok(-12.0));
        assert_eq!(parse_quantity("12-"), Ok(-12.0));
    }

    #[test]
    fn test_parse_quantity_rejects_garbage() {
        assert!(parse_quantity("").is_err());
        assert!(parse_quantity("   ").is_err());
        assert!(parse_quantity("abc").is_err());
        assert!(parse_quantity("1,2,3").is_err());
        assert!(parse_quantity("NaN").is_err());
        assert!(parse_quantity("inf").is_err());
        assert!(parse_quantity("-").is_err());
        assert!(parse_quantity("(-12)").is_err());
        assert!(parse_quantity("(+12)").is_err());
        assert!(parse_quantity("-12-").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 14);
        assert_eq!(parse_date("2026-03-14"), Ok(expected));
        assert_eq!(parse_date("2026/03/14"), Ok(expected));
        assert_eq!(parse_date("14.03.2026"), Ok(expected));
        assert_eq!(parse_date("03/14/2026"), Ok(expected));
        assert_eq!(parse_date("2026-03-14 08:30:00"), Ok(expected));
        assert_eq!(parse_date("2026-03-14T08:30:00Z"), Ok(expected));
        assert_eq!(parse_date(""), Ok(None));
        assert!(parse_date("last tuesday").is_err());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter(b"sku,qty\nA,1"), b',');
        assert_eq!(detect_delimiter(b"sku;qty;bin\nA;1;X"), b';');
        assert_eq!(detect_delimiter(b"sku\tqty\nA\t1"), b'\t');
        assert_eq!(detect_delimiter(b"sku|qty\nA|1"), b'|');
        assert_eq!(detect_delimiter(b"\"a;b\",qty\n"), b',');
        assert_eq!(detect_delimiter(b"sku\n"), b',');
    }

    #[test]
    fn test_parse_stock_extract() {
        let extract = stock(
            "\u{feff}Item Code,Description,Qty On Hand,Bin\n\
             A-100,Widget,10,B1\n\
             A-200,Gadget,\"1,250\",B2\n\
             \n\
             A-300,,5,\n",
        )
        .unwrap();

        assert_eq!(extract.total_rows, 3);
        assert_eq!(extract.rows.len(), 3);
        assert!(extract.issues.is_empty());
        assert_eq!(extract.delimiter, ',');
        assert_eq!(extract.rows[0].sku, "A-100");
        assert_eq!(extract.rows[0].line_number, 2);
        assert_eq!(extract.rows[0].location.as_deref(), Some("B1"));
        assert_eq!(extract.rows[1].quantity, 1250.0);
        assert_eq!(extract.rows[2].line_number, 5);
        assert_eq!(extract.rows[2].location, None);
        assert_eq!(extract.rows[2].description, None);
    }

    #[test]
    fn test_row_issues_do_not_fail_file() {
        let extract = stock("sku;qty\nA;1\n;4\nB;many\nC;\nD;2\n").unwrap();

        assert_eq!(extract.total_rows, 5);
        assert_eq!(extract.rows.len(), 2);
        assert_eq!(extract.issues.len(), 3);

        assert_eq!(extract.issues[0].line_number, 3);
        assert_eq!(extract.issues[0].message, "SKU is empty");
        assert_eq!(extract.issues[1].line_number, 4);
        assert_eq!(extract.issues[1].column.as_deref(), Some("qty"));
        assert_eq!(extract.issues[1].value.as_deref(), Some("many"));
        assert_eq!(extract.issues[2].message, "quantity is empty");
    }

    #[test]
    fn test_line_numbers_count_blank_lines() {
        let extract = stock("SKU,Qty\n\n\nB,x\n").unwrap();
        assert_eq!(extract.issues.len(), 1);
        assert_eq!(extract.issues[0].line_number, 4);

        let extract = stock("SKU,Qty\r\n\r\nB,x\r\nC,2\r\n").unwrap();
        assert_eq!(extract.issues[0].line_number, 3);
        assert_eq!(extract.rows[0].line_number, 4);

        let extract = stock("\u{feff}SKU,Qty\nA,1\n\nB,x\n").unwrap();
        assert_eq!(extract.rows[0].line_number, 2);
        assert_eq!(extract.issues[0].line_number, 4);
    }

    #[test]
    fn test_non_utf8_cells_are_decoded_lossily() {
        let data = b"sku,description,qty\nA-1,Widget,2\nB-2,Cami\xF3n,3\n";
        let extract = parse_stock_extract(
            data,
            SourceKind::Wms,
            "wms.csv",
            &HeaderSynonyms::default(),
        )
        .unwrap();

        assert!(extract.issues.is_empty());
        assert_eq!(extract.rows.len(), 2);
        assert_eq!(extract.rows[1].sku, "B-2");
        assert_eq!(extract.rows[1].quantity, 3.0);
        assert_eq!(extract.rows[1].description.as_deref(), Some("Cami\u{FFFD}n"));
        assert_eq!(extract.rows[1].line_number, 3);
    }

    #[test]
    fn test_empty_file() {
        assert!(matches!(
            stock(""),
            Err(ReconError::EmptyFile {
                input: SourceKind::Erp
            })
        ));
        assert!(matches!(
            stock("\u{feff} \n\n"),
            Err(ReconError::EmptyFile { .. })
        ));
    }

    #[test]
    fn test_header_only_file() {
        assert!(matches!(
            stock("sku,qty\n,\n"),
            Err(ReconError::NoDataRows {
                input: SourceKind::Erp
            })
        ));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        assert!(matches!(
            stock("sku,bin\nA,X\n"),
            Err(ReconError::MissingColumn {
                field: Field::Quantity,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_adjustments() {
        let extract = parse_adjustments(
            b"Date,SKU,Adjustment,Reason\n\
              2026-01-05,A-100,-2,Damaged\n\
              2026-01-06,A-200,+5,\n\
              someday,A-300,1,Found\n\
              ,A-400,(3),Shrinkage\n",
            "adjustments.csv",
            &HeaderSynonyms::default(),
        )
        .unwrap();

        assert_eq!(extract.rows.len(), 3);
        assert_eq!(extract.issues.len(), 1);
        assert_eq!(extract.issues[0].source, SourceKind::Adjustments);
        assert_eq!(extract.issues[0].column.as_deref(), Some("Date"));

        assert_eq!(extract.rows[0].quantity, -2.0);
        assert_eq!(extract.rows[0].reason.as_deref(), Some("Damaged"));
        assert_eq!(extract.rows[0].date, NaiveDate::from_ymd_opt(2026, 1, 5));
        assert_eq!(extract.rows[1].reason, None);
        assert_eq!(extract.rows[2].sku, "A-400");
        assert_eq!(extract.rows[2].quantity, -3.0);
        assert_eq!(extract.rows[2].date, None);
    }
}
