#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_REPORT_NAME: &str = "reconciliation_report.zip";
pub const DEFAULT_OUTPUT_FORMATS: &[&str] = &["csv", "json"];

pub fn default_output_formats() -> Vec<String> {
    DEFAULT_OUTPUT_FORMATS.iter().map(|s| s.to_string()).collect()
}
