//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::fmt;
use std::io;

use crate::schema::ModuleError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Module failed to load
    ModuleError,
    /// No module with the given name or path
    UnknownModule,
    /// No model with the given name in the module
    UnknownModel,
    /// Dotted path did not resolve
    PathNotFound,
    /// At least one document failed validation
    ValidationFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "GARLIC_CLI_CONFIG_ERROR",
            Self::IoError => "GARLIC_CLI_IO_ERROR",
            Self::ModuleError => "GARLIC_CLI_MODULE_ERROR",
            Self::UnknownModule => "GARLIC_CLI_UNKNOWN_MODULE",
            Self::UnknownModel => "GARLIC_CLI_UNKNOWN_MODEL",
            Self::PathNotFound => "GARLIC_CLI_PATH_NOT_FOUND",
            Self::ValidationFailed => "GARLIC_CLI_VALIDATION_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn unknown_module(name: &str) -> Self {
        Self::new(
            CliErrorCode::UnknownModule,
            format!("No module file or loaded module named '{}'", name),
        )
    }

    pub fn unknown_model(name: &str) -> Self {
        Self::new(
            CliErrorCode::UnknownModel,
            format!("Module has no model named '{}'", name),
        )
    }

    pub fn path_not_found(path: &str) -> Self {
        Self::new(
            CliErrorCode::PathNotFound,
            format!("Path '{}' does not resolve", path),
        )
    }

    /// Some documents are invalid
    pub fn validation_failed(invalid: usize, total: usize) -> Self {
        Self::new(
            CliErrorCode::ValidationFailed,
            format!("{} of {} documents are invalid", invalid, total),
        )
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ModuleError> for CliError {
    fn from(e: ModuleError) -> Self {
        Self::new(CliErrorCode::ModuleError, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_conversion() {
        let err: CliError = ModuleError::undefined_object("Sku").into();
        assert_eq!(err.code(), &CliErrorCode::ModuleError);
        assert!(err.message().contains("GARLIC_UNDEFINED_OBJECT"));
        assert!(err.to_string().starts_with("GARLIC_CLI_MODULE_ERROR"));
    }
}
