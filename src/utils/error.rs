use thiserror::Error;

#[derive(Error, Debug)]
pub enum UartError {
    #[error("Invalid matrix size: {size} (must be between 2 and 10)")]
    InvalidSize { size: i64 },

    #[error("Invalid input: '{input}' is not an integer")]
    InvalidInput { input: String },

    #[error("Serial port '{port}' unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },

    #[error("Incomplete transfer: received {received}, expected {expected}")]
    IncompleteTransfer { received: usize, expected: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Device,
    Transfer,
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

impl UartError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            UartError::InvalidSize { .. } | UartError::InvalidInput { .. } => ErrorCategory::Input,
            UartError::PortUnavailable { .. } => ErrorCategory::Device,
            UartError::IncompleteTransfer { .. } => ErrorCategory::Transfer,
            UartError::ConfigValidationError { .. }
            | UartError::InvalidConfigValueError { .. }
            | UartError::MissingConfigError { .. } => ErrorCategory::Configuration,
            UartError::IoError(_) | UartError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            // 重新執行整個 session 通常就能恢復
            ErrorCategory::Transfer => ErrorSeverity::Medium,
            ErrorCategory::Device | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            UartError::InvalidSize { .. } | UartError::InvalidInput { .. } => {
                "Enter a whole number between 2 and 10"
            }
            UartError::PortUnavailable { .. } => {
                "Check the cable, the port name (--port) and that no other program holds the port"
            }
            UartError::IncompleteTransfer { .. } => {
                "Reset the FPGA and run the whole session again; consider a longer --deadline-ms"
            }
            UartError::IoError(_) => "Check that the device is still connected",
            UartError::SerializationError(_) => "Check the report output path",
            UartError::ConfigValidationError { .. }
            | UartError::InvalidConfigValueError { .. }
            | UartError::MissingConfigError { .. } => {
                "Fix the configuration file or command-line flags and try again"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            UartError::InvalidSize { .. } | UartError::InvalidInput { .. } => {
                "Invalid size. Please enter a size between 2 and 10.".to_string()
            }
            UartError::PortUnavailable { port, .. } => {
                format!("Could not open serial port {}", port)
            }
            UartError::IncompleteTransfer { received, expected } => {
                format!("Error: Received {} values, expected {}", received, expected)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_by_category() {
        let err = UartError::InvalidSize { size: 11 };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = UartError::IncompleteTransfer {
            received: 3,
            expected: 4,
        };
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = UartError::PortUnavailable {
            port: "COM3".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_incomplete_transfer_message() {
        let err = UartError::IncompleteTransfer {
            received: 3,
            expected: 4,
        };
        assert_eq!(
            err.user_friendly_message(),
            "Error: Received 3 values, expected 4"
        );
    }

    #[test]
    fn test_config_errors_share_category() {
        let errors = [
            UartError::ConfigValidationError {
                field: "timing".to_string(),
                message: "unbounded".to_string(),
            },
            UartError::InvalidConfigValueError {
                field: "transfer.mode".to_string(),
                value: "12bit".to_string(),
                reason: "unknown mode".to_string(),
            },
            UartError::MissingConfigError {
                field: "report.output".to_string(),
            },
        ];
        for err in errors {
            assert_eq!(err.category(), ErrorCategory::Configuration);
            assert_eq!(err.severity(), ErrorSeverity::High);
        }
    }
}
