//! garlic - layer-agnostic structured data validation
//!
//! - `layer`: one read/write interface over JSON, YAML and the built-in tree
//! - `encoding`, `utility`: typed decoding, copying and path resolution
//! - `schema`: constraints, fields, models and loadable modules

pub mod cli;
pub mod encoding;
pub mod layer;
pub mod logging;
pub mod schema;
pub mod sequence;
pub mod text;
pub mod utility;
