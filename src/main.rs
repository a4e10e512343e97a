//! expkit - Main entry point
//!
//! Maps experiment variables to config objects and keeps experiment
//! manifests in sync with the directories on disk.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::Path;
use strum::IntoEnumIterator;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use expkit::cli::{Cli, Commands};
use expkit::{SyncConfig, Template, VariableList, update_experiments_manifest};

/// Initialize logging; stdout is kept for command output
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Sync { dir, config } => run_sync(dir.as_deref(), config.as_deref()),
        Commands::Map {
            template,
            variables,
            defaults,
            set,
            pretty,
        } => run_map(
            template.as_deref(),
            variables.as_deref(),
            defaults.as_deref(),
            set,
            pretty,
        ),
        Commands::Variables { template } => {
            let template = Template::from_name(&template)?;
            println!("{}", serde_json::to_string_pretty(&template.variables())?);
            Ok(())
        }
        Commands::Templates => {
            for template in Template::iter() {
                println!("{:<20} {}", template.to_string(), template.title());
            }
            Ok(())
        }
        Commands::InitConfig { path } => {
            SyncConfig::default().save_to_file(&path)?;
            println!("✓ Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

fn run_sync(dir: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let mut config = match config_path {
        Some(path) => {
            info!("Loading sync configuration from: {:?}", path);
            SyncConfig::load_from_file(path)?
        }
        None => SyncConfig::default(),
    };
    if let Some(dir) = dir {
        config.experiments_dir = dir.to_path_buf();
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!("Syncing experiments in {}", config.experiments_dir.display());
    let report = update_experiments_manifest(&config)
        .with_context(|| format!("Failed to sync {}", config.experiments_dir.display()))?;

    println!(
        "✓ Synced {} experiment(s) into {}",
        report.experiments_updated,
        config.manifest_path().display()
    );
    if !report.duplicate_ids.is_empty() {
        println!("  Duplicate experiment ids: {:?}", report.duplicate_ids);
    }
    Ok(())
}

fn run_map(
    template: Option<&str>,
    variables_path: Option<&Path>,
    defaults_path: Option<&Path>,
    assignments: Vec<(String, Value)>,
    pretty: bool,
) -> Result<()> {
    let (mut variables, mut defaults) = match (template, variables_path) {
        (Some(name), _) => {
            let template = Template::from_name(name)?;
            (template.variables(), template.default_config())
        }
        (None, Some(path)) => {
            let list = VariableList::load_from_file(path)
                .with_context(|| format!("Failed to load variables from {:?}", path))?;
            (list, json!({}))
        }
        (None, None) => anyhow::bail!("Either --template or --variables is required"),
    };

    if let Some(path) = defaults_path {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read defaults from {:?}", path))?;
        defaults = serde_json::from_str(&content).context("Failed to parse defaults JSON")?;
    }

    for (name, value) in assignments {
        variables.set(&name, value)?;
    }

    let config = variables.to_config(&defaults);
    let output = if pretty {
        serde_json::to_string_pretty(&config)?
    } else {
        serde_json::to_string(&config)?
    };
    println!("{}", output);
    Ok(())
}
