use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// expkit - experiment variable mapping and manifest tooling
#[derive(Parser)]
#[command(name = "expkit")]
#[command(about = "Map experiment variables to config objects and keep experiment manifests in sync")]
#[command(version)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile experiment.json files with variant folders and rebuild the index
    Sync {
        /// Experiments root directory (overrides the config file)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Sync configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Reduce a variable list into a config object and print it
    Map {
        /// Built-in template to take variables and defaults from
        #[arg(short, long, required_unless_present = "variables", conflicts_with = "variables")]
        template: Option<String>,

        /// JSON file with a variable list
        #[arg(long)]
        variables: Option<PathBuf>,

        /// JSON file with the default config object
        #[arg(short, long)]
        defaults: Option<PathBuf>,

        /// Override a variable value; VALUE is read as JSON, falling back to a string
        #[arg(short, long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, Value)>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },
    /// Print a built-in template's variable list
    Variables {
        /// Template name
        #[arg(short, long)]
        template: String,
    },
    /// List built-in templates
    Templates,
    /// Write a default sync configuration file
    InitConfig {
        /// Where to write the file
        path: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parse `NAME=VALUE`, reading VALUE as JSON when possible
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}
