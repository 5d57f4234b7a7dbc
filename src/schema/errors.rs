//! Module loading error types
//!
//! Error codes:
//! - GARLIC_REDEFINITION: a field or model name was registered twice
//! - GARLIC_UNDEFINED_OBJECT: loading finished with unresolved references
//! - GARLIC_INVALID_MODULE: the module description is not usable
//! - GARLIC_MALFORMED_SOURCE: a module file could not be read or parsed
//!
//! Validation never produces these; it reports through `ConstraintResult`.

use std::fmt;

use thiserror::Error;

/// Module error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleErrorCode {
    /// Field or model registered twice
    Redefinition,
    /// Forward reference never resolved
    UndefinedObject,
    /// Module description is not an object, or holds an unusable definition
    InvalidModule,
    /// Module file could not be read or parsed
    MalformedSource,
}

impl ModuleErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ModuleErrorCode::Redefinition => "GARLIC_REDEFINITION",
            ModuleErrorCode::UndefinedObject => "GARLIC_UNDEFINED_OBJECT",
            ModuleErrorCode::InvalidModule => "GARLIC_INVALID_MODULE",
            ModuleErrorCode::MalformedSource => "GARLIC_MALFORMED_SOURCE",
        }
    }
}

impl fmt::Display for ModuleErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Module error with the offending name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ModuleError {
    code: ModuleErrorCode,
    message: String,
    name: Option<String>,
}

impl ModuleError {
    /// A field or model with this name already exists
    pub fn redefinition(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: ModuleErrorCode::Redefinition,
            message: format!("'{}' is already defined", name),
            name: Some(name),
        }
    }

    /// A reference to this name was never resolved
    pub fn undefined_object(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            code: ModuleErrorCode::UndefinedObject,
            message: format!("Use of an undefined/unresolved object '{}'", name),
            name: Some(name),
        }
    }

    /// The module description root is not an object
    pub fn invalid_root() -> Self {
        Self {
            code: ModuleErrorCode::InvalidModule,
            message: "Module description must be an object".into(),
            name: None,
        }
    }

    /// A definition inside the module cannot be used
    pub fn invalid_definition(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        let name = name.into();
        Self {
            code: ModuleErrorCode::InvalidModule,
            message: format!("Invalid definition '{}': {}", name, reason),
            name: Some(name),
        }
    }

    /// A module file could not be read or parsed
    pub fn malformed_source(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        let path = path.into();
        Self {
            code: ModuleErrorCode::MalformedSource,
            message: format!("Malformed module file '{}': {}", path, reason),
            name: Some(path),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ModuleErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending field, model or file name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;
