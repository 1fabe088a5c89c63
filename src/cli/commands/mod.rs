//! CLI command implementations.

pub mod check;
pub mod tree;

use std::path::Path;

use crate::adapters::sources::FigmentSource;

/// YAML file source, optionally layered with prefixed environment variables.
pub(crate) fn file_source(file: &Path, env_prefix: Option<&str>) -> FigmentSource {
    let source = FigmentSource::yaml_file(file);
    match env_prefix {
        Some(prefix) => source.with_env_prefix(prefix),
        None => source,
    }
}
