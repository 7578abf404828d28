use crate::domain::model::{Field, SourceKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to fetch {location}: HTTP {status}")]
    SourceFetchError { location: String, status: u16 },

    #[error("{input} file is empty")]
    EmptyFile { input: SourceKind },

    #[error("{input} file contains no data rows")]
    NoDataRows { input: SourceKind },

    #[error(
        "{input} file has no {field} column (looked for: {tried}; found: {present})",
        tried = .looked_for.join(", "),
        present = .found.join(", ")
    )]
    MissingColumn {
        input: SourceKind,
        field: Field,
        looked_for: Vec<String>,
        found: Vec<String>,
    },

    #[error("{count} row(s) failed validation")]
    RowErrors { count: usize },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit status for a failed run; never zero.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,   // 重試錯誤
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl ReconError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReconError::ConfigValidationError { .. }
            | ReconError::InvalidConfigValueError { .. }
            | ReconError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ReconError::EmptyFile { .. }
            | ReconError::NoDataRows { .. }
            | ReconError::MissingColumn { .. }
            | ReconError::RowErrors { .. }
            | ReconError::CsvError(_) => ErrorCategory::Input,
            ReconError::ApiError(_) | ReconError::SourceFetchError { .. } => {
                ErrorCategory::Network
            }
            ReconError::ProcessingError { .. } | ReconError::SerializationError(_) => {
                ErrorCategory::Processing
            }
            ReconError::IoError(_) | ReconError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Processing => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            ReconError::MissingColumn {
                input,
                field,
                found,
                ..
            } => format!(
                "Could not find a {} column in the {} file. Columns present: {}",
                field,
                input,
                found.join(", ")
            ),
            ReconError::EmptyFile { input } => format!("The {} file is empty", input),
            ReconError::NoDataRows { input } => {
                format!("The {} file has a header but no data rows", input)
            }
            ReconError::RowErrors { count } => {
                format!("{} row(s) could not be parsed and strict mode is on", count)
            }
            ReconError::SourceFetchError { location, status } => {
                format!("Download of {} failed with HTTP status {}", location, status)
            }
            ReconError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("File not found: {}", e)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ReconError::MissingColumn { .. } => {
                "Rename the column or add its header to the [headers] section of the config file"
            }
            ReconError::EmptyFile { .. } | ReconError::NoDataRows { .. } => {
                "Re-export the file and check that it contains stock lines"
            }
            ReconError::RowErrors { .. } => {
                "Fix the rows listed in the log or rerun without --strict to report them instead"
            }
            ReconError::ApiError(_) | ReconError::SourceFetchError { .. } => {
                "Check the source URL and network access, then retry"
            }
            ReconError::CsvError(_) => "Check that the file is valid delimited text",
            ReconError::ConfigValidationError { .. }
            | ReconError::InvalidConfigValueError { .. }
            | ReconError::MissingConfigError { .. } => {
                "Review the command-line flags and configuration file"
            }
            ReconError::IoError(_) => "Check file paths and permissions",
            ReconError::ZipError(_) | ReconError::SerializationError(_) => {
                "Check free disk space and the output directory"
            }
            ReconError::ProcessingError { .. } => "Rerun with --verbose for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message_lists_headers() {
        let err = ReconError::MissingColumn {
            input: SourceKind::Wms,
            field: Field::Quantity,
            looked_for: vec!["qty".to_string(), "quantity".to_string()],
            found: vec!["Item".to_string(), "Bin".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "WMS file has no quantity column (looked for: qty, quantity; found: Item, Bin)"
        );
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("Item, Bin"));
    }

    #[test]
    fn test_severity_by_category() {
        let io = ReconError::IoError(std::io::Error::other("disk"));
        assert_eq!(io.severity(), ErrorSeverity::Critical);

        let fetch = ReconError::SourceFetchError {
            location: "https://erp.example.com/stock.csv".to_string(),
            status: 503,
        };
        assert_eq!(fetch.category(), ErrorCategory::Network);
        assert_eq!(fetch.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_failed_runs_never_exit_zero() {
        let errors = [
            ReconError::RowErrors { count: 2 },
            ReconError::SourceFetchError {
                location: "https://wms.example.com/stock.csv".to_string(),
                status: 500,
            },
            ReconError::IoError(std::io::Error::other("disk")),
            ReconError::MissingConfigError {
                field: "--erp".to_string(),
            },
        ];
        let codes: Vec<i32> = errors.iter().map(|e| e.severity().exit_code()).collect();
        assert_eq!(codes, vec![1, 2, 3, 1]);
    }
}
