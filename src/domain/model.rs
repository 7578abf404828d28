use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which of the three inputs a row or error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Erp,
    Wms,
    Adjustments,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceKind::Erp => "ERP",
            SourceKind::Wms => "WMS",
            SourceKind::Adjustments => "adjustments",
        };
        f.write_str(label)
    }
}

/// Logical columns the header resolver looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Sku,
    Quantity,
    Location,
    Description,
    Reason,
    Date,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Sku,
        Field::Quantity,
        Field::Location,
        Field::Description,
        Field::Reason,
        Field::Date,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Field::Sku => "SKU",
            Field::Quantity => "quantity",
            Field::Location => "location",
            Field::Description => "description",
            Field::Reason => "reason",
            Field::Date => "date",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    pub line_number: usize,
    pub sku: String,
    pub quantity: f64,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentRow {
    pub line_number: usize,
    pub sku: String,
    /// Signed delta applied to the ERP book quantity.
    pub quantity: f64,
    pub location: Option<String>,
    pub reason: Option<String>,
    pub date: Option<NaiveDate>,
}

/// A row that was skipped because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowIssue {
    pub source: SourceKind,
    pub line_number: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

/// Header name chosen for each resolved field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub headers: Vec<String>,
    pub resolved: BTreeMap<Field, usize>,
}

impl ColumnMap {
    pub fn index(&self, field: Field) -> Option<usize> {
        self.resolved.get(&field).copied()
    }

    pub fn header(&self, field: Field) -> Option<&str> {
        self.index(field)
            .and_then(|idx| self.headers.get(idx))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedExtract<T> {
    pub source: SourceKind,
    pub location: String,
    pub delimiter: char,
    pub columns: ColumnMap,
    pub rows: Vec<T>,
    pub issues: Vec<RowIssue>,
    /// Non-blank data rows, including the ones that became issues.
    pub total_rows: usize,
}

#[derive(Debug, Clone)]
pub struct InventoryExtracts {
    pub erp: ParsedExtract<StockRow>,
    pub wms: ParsedExtract<StockRow>,
    pub adjustments: Option<ParsedExtract<AdjustmentRow>>,
}

impl InventoryExtracts {
    pub fn issues(&self) -> Vec<RowIssue> {
        let mut issues = self.erp.issues.clone();
        issues.extend(self.wms.issues.iter().cloned());
        if let Some(adjustments) = &self.adjustments {
            issues.extend(adjustments.issues.iter().cloned());
        }
        issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Match,
    Over,
    Short,
    MissingInWms,
    MissingInErp,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Match => "match",
            LineStatus::Over => "over",
            LineStatus::Short => "short",
            LineStatus::MissingInWms => "missing_in_wms",
            LineStatus::MissingInErp => "missing_in_erp",
        }
    }
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One SKU after comparing book and floor quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledLine {
    pub sku: String,
    pub description: Option<String>,
    pub erp_quantity: f64,
    pub adjustment_quantity: f64,
    pub expected_quantity: f64,
    pub wms_quantity: f64,
    pub variance: f64,
    pub variance_pct: Option<f64>,
    pub status: LineStatus,
    pub erp_locations: Vec<String>,
    pub wms_locations: Vec<String>,
}

impl ReconciledLine {
    pub fn is_discrepancy(&self) -> bool {
        self.status != LineStatus::Match
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub generated_at: DateTime<Utc>,
    pub erp_source: String,
    pub wms_source: String,
    pub adjustments_source: Option<String>,
    pub total_skus: usize,
    pub matched: usize,
    pub over: usize,
    pub short: usize,
    pub missing_in_wms: usize,
    pub missing_in_erp: usize,
    pub discrepancies: usize,
    pub match_rate: f64,
    pub erp_total: f64,
    pub adjustment_total: f64,
    pub expected_total: f64,
    pub wms_total: f64,
    pub net_variance: f64,
    pub absolute_variance: f64,
    pub erp_rows: usize,
    pub wms_rows: usize,
    pub adjustment_rows: usize,
    pub deferred_adjustments: usize,
    pub row_issues: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub location: String,
    pub erp_quantity: f64,
    pub wms_quantity: f64,
    pub variance: f64,
    pub erp_skus: usize,
    pub wms_skus: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonSummary {
    pub reason: String,
    pub entries: usize,
    pub net_quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub summary: ReconciliationSummary,
    pub lines: Vec<ReconciledLine>,
    pub locations: Vec<LocationSummary>,
    pub reasons: Vec<ReasonSummary>,
    pub top: Vec<ReconciledLine>,
    pub issues: Vec<RowIssue>,
}

impl ReconciliationReport {
    pub fn discrepancies(&self) -> impl Iterator<Item = &ReconciledLine> {
        self.lines.iter().filter(|line| line.is_discrepancy())
    }

    pub fn has_discrepancies(&self) -> bool {
        self.summary.discrepancies > 0
    }
}

/// Extra header synonyms supplied by the user, tried before the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderOverrides {
    #[serde(default)]
    pub sku: Vec<String>,
    #[serde(default)]
    pub quantity: Vec<String>,
    #[serde(default)]
    pub location: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub reason: Vec<String>,
    #[serde(default)]
    pub date: Vec<String>,
}

impl HeaderOverrides {
    pub fn for_field(&self, field: Field) -> &[String] {
        match field {
            Field::Sku => &self.sku,
            Field::Quantity => &self.quantity,
            Field::Location => &self.location,
            Field::Description => &self.description,
            Field::Reason => &self.reason,
            Field::Date => &self.date,
        }
    }
}

pub const DEFAULT_TOP_N: usize = 10;

/// Knobs that change how rows are keyed and compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    pub tolerance: f64,
    pub tolerance_pct: Option<f64>,
    pub case_sensitive_sku: bool,
    /// Adjustments dated after this day are left out of the expected quantity.
    pub as_of: Option<NaiveDate>,
    pub top_n: usize,
    pub fail_on_row_errors: bool,
    pub headers: HeaderOverrides,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.0,
            tolerance_pct: None,
            case_sensitive_sku: false,
            as_of: None,
            top_n: DEFAULT_TOP_N,
            fail_on_row_errors: false,
            headers: HeaderOverrides::default(),
        }
    }
}
