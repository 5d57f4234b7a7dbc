//! Schema subsystem for garlic
//!
//! Constraints are grouped into fields, fields into models, and fields and
//! models into modules. Modules are usually loaded from a description
//! document (JSON, YAML or any other layer).
//!
//! # Design Principles
//!
//! - Validation is total: it always returns a `ConstraintResult`
//! - Loading is the only fallible step and returns `ModuleError`
//! - Everything is immutable and shareable across threads once loaded

mod constraints;
mod errors;
mod field;
mod loader;
mod model;
mod module;
mod parser;
mod result;

pub use constraints::{
    first_failure, quick_test_all, test_constraints, Constraint, ConstraintProps, CustomTag, Handle, Literal, Tag,
    TagId,
};
pub use errors::{ModuleError, ModuleErrorCode, ModuleResult};
pub use field::{Field, MESSAGE_ANNOTATION};
pub use loader::{read_source, ModuleLoader, SourceFormat};
pub use model::{FieldDescriptor, Model};
pub use module::Module;
pub use parser::ModuleParser;
pub use result::ConstraintResult;
