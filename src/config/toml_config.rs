use crate::config::{default_output_formats, DEFAULT_OUTPUT_PATH, DEFAULT_REPORT_NAME};
use crate::domain::model::{HeaderOverrides, ReconcileSettings, DEFAULT_TOP_N};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ReconError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

#[cfg(feature = "cli")]
use crate::config::CliConfig;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub headers: HeaderOverrides,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub erp: String,
    pub wms: String,
    pub adjustments: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub tolerance: Option<f64>,
    pub tolerance_pct: Option<f64>,
    pub case_sensitive_sku: Option<bool>,
    pub as_of: Option<NaiveDate>,
    pub top_n: Option<usize>,
    pub fail_on_row_errors: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default = "default_report_name")]
    pub report_name: String,
    #[serde(default = "default_output_formats")]
    pub formats: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            report_name: default_report_name(),
            formats: default_output_formats(),
        }
    }
}

fn default_output_path() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}

fn default_report_name() -> String {
    DEFAULT_REPORT_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReconError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ReconError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ERP_EXPORT_URL})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 命令列參數優先於檔案設定
    #[cfg(feature = "cli")]
    pub fn apply_overrides(&mut self, cli: &CliConfig) {
        if let Some(erp) = &cli.erp {
            self.sources.erp = erp.clone();
        }
        if let Some(wms) = &cli.wms {
            self.sources.wms = wms.clone();
        }
        if let Some(adjustments) = &cli.adjustments {
            self.sources.adjustments = Some(adjustments.clone());
        }
        if let Some(path) = &cli.output_path {
            self.output.path = path.clone();
        }
        if let Some(name) = &cli.report_name {
            self.output.report_name = name.clone();
        }
        if !cli.formats.is_empty() {
            self.output.formats = cli.formats.clone();
        }
        if cli.tolerance.is_some() {
            self.reconcile.tolerance = cli.tolerance;
        }
        if cli.tolerance_pct.is_some() {
            self.reconcile.tolerance_pct = cli.tolerance_pct;
        }
        if cli.case_sensitive_sku {
            self.reconcile.case_sensitive_sku = Some(true);
        }
        if cli.as_of.is_some() {
            self.reconcile.as_of = cli.as_of;
        }
        if cli.top_n.is_some() {
            self.reconcile.top_n = cli.top_n;
        }
        if cli.strict {
            self.reconcile.fail_on_row_errors = Some(true);
        }
        if cli.monitor {
            self.monitoring = Some(MonitoringConfig {
                enabled: true,
                log_level: self.monitoring.as_ref().and_then(|m| m.log_level.clone()),
            });
        }
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn erp_source(&self) -> &str {
        &self.sources.erp
    }

    fn wms_source(&self) -> &str {
        &self.sources.wms
    }

    fn adjustments_source(&self) -> Option<&str> {
        self.sources.adjustments.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn report_name(&self) -> &str {
        &self.output.report_name
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            tolerance: self.reconcile.tolerance.unwrap_or(0.0),
            tolerance_pct: self.reconcile.tolerance_pct,
            case_sensitive_sku: self.reconcile.case_sensitive_sku.unwrap_or(false),
            as_of: self.reconcile.as_of,
            top_n: self.reconcile.top_n.unwrap_or(DEFAULT_TOP_N),
            fail_on_row_errors: self.reconcile.fail_on_row_errors.unwrap_or(false),
            headers: self.headers.clone(),
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("sources.erp", &self.sources.erp)?;
        validation::validate_non_empty_string("sources.wms", &self.sources.wms)?;
        validation::validate_provider(self)
    }
}
