//! CLI command implementations
//!
//! Each command loads the config (a missing file means defaults), does its
//! work, and prints one report in the configured output format. Errors are
//! also reported on stdout in JSON mode, except a failed validation, whose
//! report already counts the invalid documents. The caller turns errors
//! into a non-zero exit code.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::encoding::copy_layer;
use crate::layer::Node;
use crate::schema::{read_source, ConstraintResult, Module, ModuleLoader};
use crate::utility::resolve_layer;

use super::args::Command;
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{write_error, write_response, write_text};

/// Output format of command reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Module files or directories searched for named modules
    #[serde(default)]
    pub module_paths: Vec<PathBuf>,

    /// Report format (optional, default "json")
    #[serde(default)]
    pub output: OutputFormat,

    /// Stop at the first invalid document (optional, default false)
    #[serde(default)]
    pub fail_fast: bool,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    fn validate(&self) -> CliResult<()> {
        for path in &self.module_paths {
            if !path.exists() {
                return Err(CliError::config_error(format!(
                    "Module path does not exist: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Finds a module by file path, or by name among `module_paths`
    pub fn find_module(&self, reference: &str) -> CliResult<Module> {
        let path = Path::new(reference);
        if path.is_file() {
            let source = read_source(path)?;
            return Ok(Module::load(&source)?);
        }

        let mut loader = ModuleLoader::new();
        for module_path in &self.module_paths {
            loader.load_path(module_path)?;
        }
        loader
            .get(reference)
            .cloned()
            .ok_or_else(|| CliError::unknown_module(reference))
    }
}

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run a specific command
pub fn run_command(cmd: Command) -> CliResult<()> {
    let config_path = match &cmd {
        Command::Check { config, .. }
        | Command::Validate { config, .. }
        | Command::Resolve { config, .. } => config.clone(),
    };
    let config = Config::load_or_default(&config_path)?;

    let result = match cmd {
        Command::Check { module, .. } => check(&config, &module),
        Command::Validate {
            module,
            model,
            documents,
            ..
        } => validate(&config, &module, &model, &documents),
        Command::Resolve { document, path, .. } => resolve(&config, &document, &path),
    };

    if let Err(e) = &result {
        if config.output == OutputFormat::Json && needs_error_envelope(e) {
            write_error(e.code_str(), e.message())?;
        }
    }
    result
}

/// A failed validation has already written its report; every other error
/// still owes stdout its single JSON object.
fn needs_error_envelope(err: &CliError) -> bool {
    err.code() != &CliErrorCode::ValidationFailed
}

/// Loads a module and prints its fields and models
pub fn check(config: &Config, module: &str) -> CliResult<()> {
    let module = config.find_module(module)?;
    match config.output {
        OutputFormat::Json => write_response(module_report(&module)),
        OutputFormat::Text => write_text(&module_text(&module)),
    }
}

/// Validates documents and fails when any of them is invalid
pub fn validate(config: &Config, module: &str, model: &str, documents: &[PathBuf]) -> CliResult<()> {
    let module = config.find_module(module)?;
    let outcomes = validate_documents(config, &module, model, documents)?;
    let invalid = outcomes.iter().filter(|(_, result)| !result.is_valid()).count();

    match config.output {
        OutputFormat::Json => write_response(validation_report(model, &outcomes))?,
        OutputFormat::Text => {
            let mut text = String::new();
            for (path, result) in &outcomes {
                text.push_str(&format!("{}: {}", path.display(), result));
            }
            write_text(&text)?;
        }
    }

    if invalid > 0 {
        return Err(CliError::validation_failed(invalid, outcomes.len()));
    }
    Ok(())
}

/// Builds the JSON report for a validation run
pub fn validation_report(model: &str, outcomes: &[(PathBuf, ConstraintResult)]) -> Value {
    let reports: Vec<Value> = outcomes
        .iter()
        .map(|(path, result)| {
            json!({
                "document": path.display().to_string(),
                "valid": result.is_valid(),
                "result": result,
            })
        })
        .collect();
    let invalid = outcomes.iter().filter(|(_, result)| !result.is_valid()).count();
    json!({ "model": model, "invalid": invalid, "documents": reports })
}

/// Prints the sub-document at a dotted path
pub fn resolve(config: &Config, document: &Path, path: &str) -> CliResult<()> {
    let value = resolve_document(document, path)?;
    match config.output {
        OutputFormat::Json => write_response(value),
        OutputFormat::Text => write_text(&serde_json::to_string_pretty(&value)?),
    }
}

/// Validates each document in order. With `fail_fast`, stops after the
/// first invalid one.
pub fn validate_documents(
    config: &Config,
    module: &Module,
    model: &str,
    documents: &[PathBuf],
) -> CliResult<Vec<(PathBuf, ConstraintResult)>> {
    if module.get_model(model).is_none() {
        return Err(CliError::unknown_model(model));
    }

    let mut outcomes = Vec::with_capacity(documents.len());
    for path in documents {
        let document = read_source(path)?;
        let result = module
            .validate(model, &document)
            .ok_or_else(|| CliError::unknown_model(model))?;
        let valid = result.is_valid();
        if !valid {
            warn!(document = %path.display(), model = %model, "document is invalid");
        }
        outcomes.push((path.clone(), result));
        if !valid && config.fail_fast {
            break;
        }
    }
    Ok(outcomes)
}

/// Reads a document and returns the value at `path` as JSON
pub fn resolve_document(document: &Path, path: &str) -> CliResult<Value> {
    let source: Node = read_source(document)?;
    let found = resolve_layer(&source, path).ok_or_else(|| CliError::path_not_found(path))?;
    let mut value = Value::Null;
    copy_layer(found, &mut value);
    Ok(value)
}

/// JSON summary of a module's fields and models
pub fn module_report(module: &Module) -> Value {
    let fields: Vec<Value> = module
        .fields()
        .map(|(name, field)| {
            json!({
                "name": name,
                "field": field.name(),
                "constraints": field.constraints().iter().map(|c| c.tag_id()).collect::<Vec<_>>(),
            })
        })
        .collect();
    let models: Vec<Value> = module
        .models()
        .map(|(name, model)| {
            let members: Vec<Value> = model
                .fields()
                .map(|(key, descriptor)| {
                    json!({
                        "key": key,
                        "field": descriptor.field.name(),
                        "required": descriptor.required,
                    })
                })
                .collect();
            json!({ "name": name, "strict": model.is_strict(), "fields": members })
        })
        .collect();
    json!({ "fields": fields, "models": models })
}

fn module_text(module: &Module) -> String {
    let mut text = String::new();
    for (name, field) in module.fields() {
        text.push_str(&format!("field {} ({} constraints)\n", name, field.constraints().len()));
    }
    for (name, model) in module.models() {
        text.push_str(&format!("model {}\n", name));
        for (key, descriptor) in model.fields() {
            let marker = if descriptor.required { "" } else { "?" };
            text.push_str(&format!("  {}{}: {}\n", key, marker, descriptor.field.name()));
        }
    }
    text
}
