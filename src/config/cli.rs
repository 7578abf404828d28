use crate::config::{default_output_formats, DEFAULT_OUTPUT_PATH, DEFAULT_REPORT_NAME};
use crate::domain::model::{ReconcileSettings, DEFAULT_TOP_N};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "inventory-recon")]
#[command(about = "Reconcile ERP and WMS inventory extracts into a discrepancy report")]
pub struct CliConfig {
    /// ERP stock export (path or http(s) URL)
    #[arg(long)]
    pub erp: Option<String>,

    /// WMS stock export (path or http(s) URL)
    #[arg(long)]
    pub wms: Option<String>,

    /// Optional adjustments log (path or http(s) URL)
    #[arg(long)]
    pub adjustments: Option<String>,

    /// TOML configuration file; flags given on the command line override it
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub output_path: Option<String>,

    #[arg(long)]
    pub report_name: Option<String>,

    /// Output formats: csv, tsv, json
    #[arg(long, value_delimiter = ',')]
    pub formats: Vec<String>,

    /// Absolute quantity difference still treated as a match
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Percentage difference still treated as a match
    #[arg(long)]
    pub tolerance_pct: Option<f64>,

    #[arg(long)]
    pub case_sensitive_sku: bool,

    /// Ignore adjustments dated after this day (YYYY-MM-DD)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Number of rows in the top discrepancies sheet
    #[arg(long)]
    pub top_n: Option<usize>,

    #[arg(long, help = "Fail when any row cannot be parsed")]
    pub strict: bool,

    #[arg(long, help = "Exit with status 4 when discrepancies are found")]
    pub fail_on_discrepancy: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(long, help = "Resolve columns and parse sources without writing a report")]
    pub dry_run: bool,
}

impl CliConfig {
    /// Fill in defaults for values that were not given on the command line.
    pub fn apply_defaults(&mut self) {
        if self.formats.is_empty() {
            self.formats = default_output_formats();
        }
        if self.output_path.is_none() {
            self.output_path = Some(DEFAULT_OUTPUT_PATH.to_string());
        }
        if self.report_name.is_none() {
            self.report_name = Some(DEFAULT_REPORT_NAME.to_string());
        }
    }
}

impl ConfigProvider for CliConfig {
    fn erp_source(&self) -> &str {
        self.erp.as_deref().unwrap_or_default()
    }

    fn wms_source(&self) -> &str {
        self.wms.as_deref().unwrap_or_default()
    }

    fn adjustments_source(&self) -> Option<&str> {
        self.adjustments.as_deref()
    }

    fn output_path(&self) -> &str {
        self.output_path.as_deref().unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    fn report_name(&self) -> &str {
        self.report_name.as_deref().unwrap_or(DEFAULT_REPORT_NAME)
    }

    fn output_formats(&self) -> &[String] {
        &self.formats
    }

    fn settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            tolerance: self.tolerance.unwrap_or(0.0),
            tolerance_pct: self.tolerance_pct,
            case_sensitive_sku: self.case_sensitive_sku,
            as_of: self.as_of,
            top_n: self.top_n.unwrap_or(DEFAULT_TOP_N),
            fail_on_row_errors: self.strict,
            ..Default::default()
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_required_field("--erp", &self.erp)?;
        validation::validate_required_field("--wms", &self.wms)?;
        validation::validate_provider(self)
    }
}
