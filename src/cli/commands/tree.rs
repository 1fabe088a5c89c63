//! Implementation of the `bindery tree` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::file_source;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::SettingsNode;
use crate::domain::ports::SettingsSource;

#[derive(Args, Debug)]
pub struct TreeArgs {
    /// YAML settings file
    pub file: PathBuf,

    /// Layer environment variables with this prefix over the file
    #[arg(long)]
    pub env_prefix: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct TreeOutput {
    pub source: String,
    pub tree: SettingsNode,
}

impl CommandOutput for TreeOutput {
    fn to_human(&self) -> String {
        format!("# {}\n{}", self.source, self.tree.render())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: TreeArgs, json_mode: bool) -> Result<()> {
    let source = file_source(&args.file, args.env_prefix.as_deref());
    let tree = source
        .extract()
        .with_context(|| format!("Failed to read settings from {}", args.file.display()))?;

    let output_data = TreeOutput {
        source: source.name(),
        tree,
    };
    output(&output_data, json_mode);
    Ok(())
}
