//! Module loader for module description files
//!
//! - `.json` files are read with serde_json straight into `Node`, so a
//!   repeated key reaches the parser; `.yaml`/`.yml` are read with serde_yaml,
//!   which rejects repeated keys itself
//! - A directory loads every module file directly inside it, in file name
//!   order; other files are skipped
//! - Each file becomes its own `Module`, keyed by file stem
//! - Read and syntax errors are reported as `MalformedSource`

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::layer::Node;

use super::errors::{ModuleError, ModuleResult};
use super::module::Module;

/// Serialization format of a source file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(SourceFormat::Json),
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            _ => None,
        }
    }

    /// Parses `content` into a value tree.
    pub fn parse(&self, content: &str) -> Result<Node, String> {
        match self {
            SourceFormat::Json => serde_json::from_str::<Node>(content)
                .map_err(|e| format!("Invalid JSON: {}", e)),
            SourceFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
                .map(|value| Node::from_layer(&value))
                .map_err(|e| format!("Invalid YAML: {}", e)),
        }
    }
}

/// Reads a JSON or YAML file into a value tree.
pub fn read_source(path: &Path) -> ModuleResult<Node> {
    let display = path.display().to_string();
    let format = SourceFormat::from_path(path)
        .ok_or_else(|| ModuleError::malformed_source(&display, "Unsupported file extension"))?;
    let content = fs::read_to_string(path)
        .map_err(|e| ModuleError::malformed_source(&display, format!("Failed to read file: {}", e)))?;
    format
        .parse(&content)
        .map_err(|e| ModuleError::malformed_source(&display, e))
}

/// Registry of modules loaded from disk.
#[derive(Debug, Default)]
pub struct ModuleLoader {
    modules: BTreeMap<String, Module>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a module file, or every module file in a directory.
    ///
    /// Returns the names of the loaded modules.
    pub fn load_path(&mut self, path: &Path) -> ModuleResult<Vec<String>> {
        if !path.is_dir() {
            return Ok(vec![self.load_file(path)?]);
        }

        let entries = fs::read_dir(path).map_err(|e| {
            ModuleError::malformed_source(
                path.display().to_string(),
                format!("Failed to read directory: {}", e),
            )
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                ModuleError::malformed_source(
                    path.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let file = entry.path();
            if file.is_file() && SourceFormat::from_path(&file).is_some() {
                files.push(file);
            } else {
                debug!(path = %file.display(), "skipping non-module entry");
            }
        }
        files.sort();

        let mut loaded = Vec::with_capacity(files.len());
        for file in files {
            loaded.push(self.load_file(&file)?);
        }
        info!(dir = %path.display(), modules = loaded.len(), "loaded module directory");
        Ok(loaded)
    }

    /// Loads a single module file and registers it under its file stem.
    pub fn load_file(&mut self, path: &Path) -> ModuleResult<String> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| ModuleError::malformed_source(path.display().to_string(), "Invalid file name"))?
            .to_owned();

        let source = read_source(path)?;
        let module = Module::load(&source).map_err(|e| {
            warn!(path = %path.display(), error = %e, "module failed to load");
            e
        })?;
        self.register(&name, module)?;
        info!(module = %name, path = %path.display(), "loaded module");
        Ok(name)
    }

    /// Registers a module directly. Names are unique.
    pub fn register(&mut self, name: &str, module: Module) -> ModuleResult<()> {
        if self.modules.contains_key(name) {
            return Err(ModuleError::redefinition(name));
        }
        self.modules.insert(name.to_owned(), module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Loaded modules in name order.
    pub fn modules(&self) -> impl Iterator<Item = (&str, &Module)> {
        self.modules.iter().map(|(name, module)| (name.as_str(), module))
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::ModuleErrorCode;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_json_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "users.json", r#"{"models": {"User": {"id": "integer"}}}"#);

        let mut loader = ModuleLoader::new();
        assert_eq!(loader.load_file(&path).unwrap(), "users");
        assert!(loader.get("users").unwrap().get_model("User").is_some());
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "shop.yaml",
            "fields:\n  Sku:\n    constraints:\n      - type: regex\n        pattern: '[A-Z]{3}-\\d+'\nmodels:\n  Item:\n    sku: Sku\n",
        );

        let mut loader = ModuleLoader::new();
        loader.load_path(&path).unwrap();
        let module = loader.get("shop").unwrap();
        let sku = module.get_field("Sku").unwrap();
        assert!(sku.quick_test(&serde_json::json!("ABC-12")));
        assert!(!sku.quick_test(&serde_json::json!("abc")));
    }

    #[test]
    fn test_load_directory_skips_other_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.yml", "models:\n  B:\n    x: integer\n");
        write(&dir, "a.json", r#"{"fields": {"A": "string"}}"#);
        write(&dir, "notes.txt", "not a module");

        let mut loader = ModuleLoader::new();
        let loaded = loader.load_path(dir.path()).unwrap();
        assert_eq!(loaded, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(loader.module_count(), 2);
    }

    #[test]
    fn test_malformed_source() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.json", "{not json");

        let mut loader = ModuleLoader::new();
        let err = loader.load_file(&path).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::MalformedSource);

        let missing = loader.load_file(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(missing.code(), ModuleErrorCode::MalformedSource);
        assert_eq!(loader.module_count(), 0);
    }

    #[test]
    fn test_repeated_json_key_is_redefinition() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "dup.json",
            r#"{"fields": {
                "A": {"constraints": [{"type": "type", "flag": "string"}]},
                "A": {"constraints": [{"type": "type", "flag": "integer"}]}
            }}"#,
        );

        let mut loader = ModuleLoader::new();
        let err = loader.load_file(&path).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::Redefinition);
        assert_eq!(err.name(), Some("A"));
        assert_eq!(loader.module_count(), 0);
    }

    #[test]
    fn test_repeated_model_key_is_redefinition() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "dup.json",
            r#"{"models": {"M": {"x": "integer"}, "M": {"y": "string"}}}"#,
        );

        let err = ModuleLoader::new().load_file(&path).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::Redefinition);
        assert_eq!(err.name(), Some("M"));
    }

    #[test]
    fn test_repeated_yaml_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "dup.yaml", "fields:\n  A: string\n  A: integer\n");

        let err = ModuleLoader::new().load_file(&path).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::MalformedSource);
    }

    #[test]
    fn test_module_errors_pass_through() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.json", r#"{"fields": {"A": "Missing"}}"#);

        let err = ModuleLoader::new().load_file(&path).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::UndefinedObject);
        assert_eq!(err.name(), Some("Missing"));
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let mut loader = ModuleLoader::new();
        loader.register("core", Module::new()).unwrap();
        let err = loader.register("core", Module::new()).unwrap_err();
        assert_eq!(err.code(), ModuleErrorCode::Redefinition);
    }
}
