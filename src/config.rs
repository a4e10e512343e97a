//! Configuration for the experiments directory sync.
//!
//! Settings can be saved to and loaded from a JSON file; every field has a
//! default so a partial file is valid. Command-line flags override values
//! loaded from the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for scanning an experiments directory and writing its manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Directory holding one sub-directory per experiment
    pub experiments_dir: PathBuf,

    /// Index file written at the root of `experiments_dir`
    pub manifest_file: String,

    /// Per-experiment file written inside each experiment directory
    pub experiment_file: String,

    /// File extensions (without the dot) scanned for variables
    pub tracked_extensions: Vec<String>,

    // Values used when the index file does not provide them
    pub library_name: String,
    pub library_author: String,
    pub library_version: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            experiments_dir: PathBuf::from("src/experiments"),
            manifest_file: "experiments.json".to_string(),
            experiment_file: "experiment.json".to_string(),
            tracked_extensions: vec!["js".to_string(), "css".to_string(), "html".to_string()],
            library_name: "nextafter-lib".to_string(),
            library_author: "NextAfter".to_string(),
            library_version: "1.0.0".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize sync configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.experiments_dir.as_os_str().is_empty() {
            anyhow::bail!("Experiments directory must be specified");
        }

        for (label, name) in [
            ("Manifest file", &self.manifest_file),
            ("Experiment file", &self.experiment_file),
        ] {
            if name.trim().is_empty() {
                anyhow::bail!("{} name must be specified", label);
            }
            if name.contains('/') || name.contains('\\') {
                anyhow::bail!("{} name must be a bare file name, got '{}'", label, name);
            }
        }

        if self.manifest_file == self.experiment_file {
            anyhow::bail!("Manifest file and experiment file must have different names");
        }

        if self.tracked_extensions.is_empty() {
            anyhow::bail!("At least one tracked extension is required");
        }
        if let Some(ext) = self
            .tracked_extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            anyhow::bail!("Tracked extensions are written without a leading dot, got '{}'", ext);
        }

        Ok(())
    }

    /// Path of the index file
    pub fn manifest_path(&self) -> PathBuf {
        self.experiments_dir.join(&self.manifest_file)
    }

    /// Whether `file_name` has one of the tracked extensions
    pub fn is_tracked(&self, file_name: &str) -> bool {
        self.tracked_extensions
            .iter()
            .any(|ext| file_name.strip_suffix(ext.as_str()).is_some_and(|stem| stem.ends_with('.')))
    }
}
