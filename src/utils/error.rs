use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to parse stop file '{file}': {reason}")]
    FileParseFailed { file: String, reason: String },

    #[error("No region selected")]
    RegionNotSelected,

    #[error("Unknown region code: {code}")]
    UnknownRegion { code: String },

    #[error("Population mesh for region '{region}' is unavailable: {reason}")]
    MeshFetchFailed { region: String, reason: String },

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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    UserAction,
    Network,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::FileParseFailed { .. } => ErrorCategory::Input,
            AppError::RegionNotSelected | AppError::UnknownRegion { .. } => {
                ErrorCategory::UserAction
            }
            AppError::MeshFetchFailed { .. } => ErrorCategory::Network,
            AppError::ConfigValidationError { .. } | AppError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            AppError::IoError(_) | AppError::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// Every action-level failure leaves the session usable, so only
    /// configuration and internal faults rank above `Medium`.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::UserAction => ErrorSeverity::Low,
            ErrorCategory::Input | ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::FileParseFailed { file, .. } => {
                format!("An error occurred while parsing the file '{}'.", file)
            }
            AppError::RegionNotSelected => "Please select a prefecture first.".to_string(),
            AppError::UnknownRegion { code } => {
                format!("'{}' is not a known prefecture code.", code)
            }
            AppError::MeshFetchFailed { region, .. } => format!(
                "Population mesh data is not available for the selected prefecture ({}).",
                region
            ),
            AppError::ConfigValidationError { field, message } => {
                format!("Configuration problem in '{}': {}", field, message)
            }
            AppError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration value '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Input => {
                "Check that the file is UTF-8 delimited text with a header row (e.g. GTFS stops.txt)."
                    .to_string()
            }
            ErrorCategory::UserAction => {
                "Pick a prefecture from the list and try again.".to_string()
            }
            ErrorCategory::Network => {
                "Try another prefecture, or check the mesh data location and retry.".to_string()
            }
            ErrorCategory::Configuration => {
                "Fix the configuration file or command line flags and restart.".to_string()
            }
            ErrorCategory::System => "Re-run with --verbose and inspect the logs.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
