//! Experiments directory reconciliation.
//!
//! Walks the experiments root, brings each `experiment.json` in line with
//! the variant folders actually on disk, then rebuilds the root index.
//!
//! # Layout
//!
//! ```text
//! experiments/
//! ├── experiments.json        index of all experiments
//! ├── Popup/
//! │   ├── experiment.json     variants of this experiment
//! │   ├── default/            variant folder
//! │   └── short-copy/
//! └── HomepageTakeover/
//! ```
//!
//! Ids are assigned as max-plus-one. Duplicate experiment ids are reported
//! but left in place.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::detect;
use crate::error::Result;
use crate::manifest::{Experiment, ExperimentsManifest, Variant};

/// What a full sync produced
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub manifest: ExperimentsManifest,
    /// Number of experiment directories processed
    pub experiments_updated: usize,
    /// Experiment ids seen more than once, in discovery order
    pub duplicate_ids: Vec<i64>,
}

/// Names of the sub-directories of `dir`, sorted
pub fn list_dirs(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Names of the tracked files directly inside `dir`, sorted
pub fn list_tracked_files(dir: &Path, config: &SyncConfig) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_file() && config.is_tracked(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// `path` relative to `root`, joined with `/` on every platform
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

/// One more than the highest numeric experiment id found on disk.
///
/// Returns 1 when no ids exist, or when the directory or any experiment
/// file in it cannot be read.
pub fn next_experiment_id(config: &SyncConfig) -> i64 {
    match max_experiment_id(config) {
        Ok(max_id) => max_id + 1,
        Err(e) => {
            warn!("Could not determine next experiment ID from existing files, using default. {}", e);
            1
        }
    }
}

fn max_experiment_id(config: &SyncConfig) -> Result<i64> {
    let root = &config.experiments_dir;
    let mut max_id = 0;
    for dir in list_dirs(root)? {
        let file = root.join(&dir).join(&config.experiment_file);
        if !file.exists() {
            continue;
        }
        let data = read_json(&file)?;
        if let Some(id) = data.get("experiment_id").and_then(Value::as_i64) {
            max_id = max_id.max(id);
        }
    }
    Ok(max_id)
}

/// Bring `<experiment_dir>/experiment.json` in line with the variant
/// directories on disk and write it back.
pub fn update_experiment(experiment_dir: &Path, config: &SyncConfig) -> Result<Experiment> {
    let root = &config.experiments_dir;
    let file = experiment_dir.join(&config.experiment_file);
    let dir_name = experiment_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let experiment_path = relative_path(root, experiment_dir);

    let loaded = if file.exists() {
        info!("{} found in {}, updating it.", config.experiment_file, experiment_dir.display());
        match read_json(&file).and_then(|value| Experiment::from_json(value, &dir_name, &experiment_path)) {
            Ok(experiment) => Some(experiment),
            Err(e) => {
                warn!("Error parsing {}, creating a new one. Error: {}", file.display(), e);
                None
            }
        }
    } else {
        None
    };

    let mut experiment = match loaded {
        Some(experiment) => experiment,
        None => {
            info!(
                "{} not found or invalid in {}, creating a new one.",
                config.experiment_file,
                experiment_dir.display()
            );
            Experiment::new(next_experiment_id(config), dir_name, experiment_path)
        }
    };

    experiment.variants = reconcile_variants(
        experiment_dir,
        std::mem::take(&mut experiment.variants),
        config,
    )?;

    write_json(&file, &experiment)?;
    debug!(
        experiment = %experiment.experiment_name,
        variants = experiment.variants.len(),
        "Wrote experiment file"
    );
    Ok(experiment)
}

fn reconcile_variants(
    experiment_dir: &Path,
    from_json: Vec<Variant>,
    config: &SyncConfig,
) -> Result<Vec<Variant>> {
    let root = &config.experiments_dir;

    let mut known: Vec<Variant> = Vec::new();
    for mut variant in from_json {
        let variant_dir = experiment_dir.join(&variant.variant_name);
        if !variant_dir.is_dir() {
            info!(
                "Directory for variant '{}' at '{}' not found. This variant entry will be ignored.",
                variant.variant_name,
                variant_dir.display()
            );
            continue;
        }
        variant.path = relative_path(root, &variant_dir);
        known.push(variant);
    }

    let mut next_id = known.iter().filter_map(|v| v.variant_id).max().unwrap_or(0);
    let mut allocate_id = || {
        next_id += 1;
        next_id
    };

    let mut variants = Vec::new();
    for dir_name in list_dirs(experiment_dir)? {
        let variant_dir = experiment_dir.join(&dir_name);
        let path = relative_path(root, &variant_dir);
        let files = list_tracked_files(&variant_dir, config)?;
        let variables = detect::detect_variables(&variant_dir, &files, config);

        let existing = known
            .iter()
            .position(|v| v.path == path || v.variant_name == dir_name)
            .map(|pos| known.remove(pos));

        let variant = match existing {
            Some(mut variant) => {
                info!("Updating data for existing variant directory: '{}'", dir_name);
                if variant.variant_id.is_none() {
                    variant.variant_id = Some(allocate_id());
                }
                Variant {
                    variant_name: dir_name,
                    path,
                    files,
                    variables,
                    ..variant
                }
            }
            None => {
                info!("Adding new variant for directory on disk: '{}'", dir_name);
                Variant {
                    variant_name: dir_name,
                    variant_id: Some(allocate_id()),
                    path,
                    files,
                    variables,
                    ..Variant::default()
                }
            }
        };
        variants.push(variant);
    }

    variants.sort_by_key(|v| v.variant_id.unwrap_or(0));
    Ok(variants)
}

/// Update every experiment under the experiments root and rewrite the index.
pub fn update_experiments_manifest(config: &SyncConfig) -> Result<SyncReport> {
    let root = &config.experiments_dir;
    let manifest_path = config.manifest_path();

    let mut manifest = ExperimentsManifest::new(
        &config.library_name,
        &config.library_author,
        &config.library_version,
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    if manifest_path.exists() {
        manifest.merge_existing(read_json(&manifest_path)?)?;
    }

    let mut seen_ids = HashSet::new();
    let mut duplicate_ids = Vec::new();
    let mut experiments_updated = 0;

    for dir_name in list_dirs(root)? {
        let experiment_dir = root.join(&dir_name);
        let experiment = update_experiment(&experiment_dir, config)?;
        experiments_updated += 1;

        if !seen_ids.insert(experiment.experiment_id) {
            warn!(
                "Duplicate experiment ID detected: {} in {}",
                experiment.experiment_id,
                experiment_dir.display()
            );
            duplicate_ids.push(experiment.experiment_id);
        }

        manifest.upsert(experiment.summary());
    }

    write_json(&manifest_path, &manifest)?;
    info!(
        experiments = experiments_updated,
        path = %manifest_path.display(),
        "Experiments index written"
    );

    Ok(SyncReport {
        manifest,
        experiments_updated,
        duplicate_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = PathBuf::from("web").join("experiments");
        let variant = root.join("Popup").join("default");
        assert_eq!(relative_path(&root, &variant), "Popup/default");
    }

    #[test]
    fn test_list_dirs_is_sorted_and_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("experiments.json"), "{}").unwrap();
        assert_eq!(list_dirs(dir.path()).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_next_experiment_id_with_no_experiments() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            experiments_dir: dir.path().to_path_buf(),
            ..SyncConfig::default()
        };
        assert_eq!(next_experiment_id(&config), 1);
    }

    #[test]
    fn test_next_experiment_id_falls_back_on_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig {
            experiments_dir: dir.path().to_path_buf(),
            ..SyncConfig::default()
        };
        fs::create_dir(dir.path().join("A")).unwrap();
        fs::write(dir.path().join("A/experiment.json"), r#"{"experiment_id": 7}"#).unwrap();
        fs::create_dir(dir.path().join("B")).unwrap();
        assert_eq!(next_experiment_id(&config), 8);

        fs::write(dir.path().join("B/experiment.json"), "not json").unwrap();
        assert_eq!(next_experiment_id(&config), 1);
    }
}
