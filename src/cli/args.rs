//! CLI argument definitions using clap
//!
//! Commands:
//! - garlic check <module> --config <path>
//! - garlic validate <module> <model> <document>... --config <path>
//! - garlic resolve <document> <path> --config <path>
//!
//! A `<module>` is either a module file or the name of a module found under
//! the configured `module_paths`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// garlic - validate JSON and YAML documents against rule modules
#[derive(Parser, Debug)]
#[command(name = "garlic")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a module and list its fields and models
    Check {
        /// Module file or module name
        module: String,

        /// Path to configuration file
        #[arg(long, default_value = "./garlic.json")]
        config: PathBuf,
    },

    /// Validate documents against a model
    Validate {
        /// Module file or module name
        module: String,

        /// Model to validate against
        model: String,

        /// JSON or YAML documents
        #[arg(required = true)]
        documents: Vec<PathBuf>,

        /// Path to configuration file
        #[arg(long, default_value = "./garlic.json")]
        config: PathBuf,
    },

    /// Print the part of a document found at a dotted path
    Resolve {
        /// JSON or YAML document
        document: PathBuf,

        /// Dotted path, e.g. `servers.0.host`
        path: String,

        /// Path to configuration file
        #[arg(long, default_value = "./garlic.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate() {
        let cli = Cli::try_parse_from([
            "garlic", "validate", "shop.yaml", "Item", "a.json", "b.yaml",
        ])
        .unwrap();
        match cli.command {
            Command::Validate {
                module,
                model,
                documents,
                config,
            } => {
                assert_eq!(module, "shop.yaml");
                assert_eq!(model, "Item");
                assert_eq!(documents.len(), 2);
                assert_eq!(config, PathBuf::from("./garlic.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validate_requires_documents() {
        assert!(Cli::try_parse_from(["garlic", "validate", "shop.yaml", "Item"]).is_err());
    }
}
