//! Implementation of the `bindery check` command.
//!
//! Binds a settings file to [`Config`] through the provider and lists every
//! binding error with its path, followed by semantic validation.

use anyhow::{anyhow, Context, Result};
use clap::Args;
use comfy_table::{Attribute, Cell, Color};
use std::path::PathBuf;
use std::sync::Arc;

use super::file_source;
use crate::cli::output::{base_table, output, supports_color, CommandOutput};
use crate::domain::errors::ProviderError;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::services::SettingsProvider;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// YAML settings file
    pub file: PathBuf,

    /// Layer environment variables with this prefix over the file
    #[arg(long)]
    pub env_prefix: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Issue {
    pub path: String,
    pub problem: String,
}

#[derive(Debug, serde::Serialize)]
pub struct CheckOutput {
    pub success: bool,
    pub file: PathBuf,
    pub issues: Vec<Issue>,
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        if self.issues.is_empty() {
            return format!("{}: OK", self.file.display());
        }

        let colored = supports_color();
        let mut table = base_table();
        table.set_header(vec![
            Cell::new("Path").add_attribute(Attribute::Bold),
            Cell::new("Problem").add_attribute(Attribute::Bold),
        ]);
        for issue in &self.issues {
            let problem = if colored {
                Cell::new(&issue.problem).fg(Color::Red)
            } else {
                Cell::new(&issue.problem)
            };
            table.add_row(vec![Cell::new(&issue.path), problem]);
        }
        format!("{}\n{table}", self.file.display())
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: CheckArgs, json_mode: bool) -> Result<()> {
    let source = file_source(&args.file, args.env_prefix.as_deref());
    source
        .reload()
        .with_context(|| format!("Failed to read settings from {}", args.file.display()))?;

    let provider = SettingsProvider::new();
    provider.setup_source_for::<Config>(Arc::new(source))?;

    let issues = match provider.get_async::<Config>().await {
        Ok(config) => match ConfigLoader::validate(&config) {
            Ok(()) => Vec::new(),
            Err(err) => vec![Issue {
                path: "<config>".to_string(),
                problem: err.to_string(),
            }],
        },
        Err(ProviderError::Binding { errors, .. }) => errors
            .iter()
            .map(|error| Issue {
                path: error.path.to_string(),
                problem: error.kind.to_string(),
            })
            .collect(),
        Err(err) => return Err(err.into()),
    };

    let output_data = CheckOutput {
        success: issues.is_empty(),
        file: args.file.clone(),
        issues,
    };
    output(&output_data, json_mode);

    match output_data.issues.len() {
        0 => Ok(()),
        n => Err(anyhow!("{n} problem(s) found in {}", args.file.display())),
    }
}
