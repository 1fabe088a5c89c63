//! Command-line interface for inspecting and checking settings files.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, tree::TreeArgs};

#[derive(Parser, Debug)]
#[command(name = "bindery")]
#[command(about = "Bindery - typed settings binding and inspection", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the settings tree read from a YAML file
    Tree(TreeArgs),

    /// Bind a YAML file to the bindery configuration and report every problem
    Check(CheckArgs),
}

/// Print `err` in the selected output mode and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({ "success": false, "error": format!("{err:#}") });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
