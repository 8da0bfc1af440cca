use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("API returned {status} (code {code:?}): {message}")]
    ApiResponseError {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Bulk job {job_id} failed with status '{status}'")]
    BulkJobError { job_id: String, status: String },

    #[error("Invalid {entity} operation '{mode}': {reason}")]
    InvalidOperation {
        entity: String,
        mode: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Authentication,
    Configuration,
    DataFormat,
    Storage,
    Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) | EtlError::ApiResponseError { .. } | EtlError::BulkJobError { .. } => {
                ErrorCategory::Network
            }
            EtlError::AuthError { .. } => ErrorCategory::Authentication,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            EtlError::ZipError(_)
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::DataFormat,
            EtlError::IoError(_) => ErrorCategory::Storage,
            EtlError::InvalidOperation { .. } => ErrorCategory::Usage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::DataFormat | ErrorCategory::Usage => ErrorSeverity::High,
            ErrorCategory::Authentication | ErrorCategory::Configuration | ErrorCategory::Storage => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::AuthError { .. } => {
                "Check client_id, client_secret and refresh_token of the connection, or re-export the stored token"
            }
            EtlError::ApiError(_) => "Check network connectivity and the API endpoint, then retry",
            EtlError::ApiResponseError { .. } => "Inspect the API response message; the request parameters may be invalid",
            EtlError::BulkJobError { .. } => "Re-run the export; raise polling.max_polls if the job is slow",
            EtlError::InvalidOperation { .. } => "Use a supported mode and pass the record id where required",
            EtlError::ZipError(_) | EtlError::CsvError(_) => "The export file could not be read; re-run the export",
            EtlError::IoError(_) => "Check that the output path exists and is writable",
            EtlError::SerializationError(_) => "The API returned an unexpected payload",
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => "Fix the configuration file and run with --dry-run to verify",
            EtlError::ProcessingError { .. } => "Run with --verbose to see the offending data",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not talk to Zoho: {}", self),
            ErrorCategory::Authentication => format!("Zoho rejected our credentials: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::DataFormat => format!("Could not process exported data: {}", self),
            ErrorCategory::Storage => format!("Could not write output: {}", self),
            ErrorCategory::Usage => format!("Invalid request: {}", self),
        }
    }

    pub(crate) fn invalid_operation(entity: &str, mode: &str, reason: impl Into<String>) -> Self {
        EtlError::InvalidOperation {
            entity: entity.to_string(),
            mode: mode.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_critical() {
        let err = EtlError::AuthError {
            message: "code 57".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("credentials"));
    }

    #[test]
    fn test_bulk_job_error_is_retryable_severity() {
        let err = EtlError::BulkJobError {
            job_id: "42".to_string(),
            status: "Failed".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.to_string(), "Bulk job 42 failed with status 'Failed'");
    }

    #[test]
    fn test_invalid_operation_message() {
        let err = EtlError::invalid_operation("invoice", "approve", "invoice id is required");
        assert_eq!(err.category(), ErrorCategory::Usage);
        assert_eq!(
            err.to_string(),
            "Invalid invoice operation 'approve': invoice id is required"
        );
    }
}
