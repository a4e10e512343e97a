//! Experiment records and the experiments index.
//!
//! `experiment.json` lives in each experiment directory and lists its
//! variants; `experiments.json` at the root summarizes every experiment.
//! Both files are hand-edited, so loading is lenient: fields with the wrong
//! JSON type are dropped back to their defaults and unknown fields are kept.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{ExpkitError, Result};

/// One variant folder of an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variant {
    pub variant_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<i64>,
    pub author: String,
    pub version: String,
    pub description: String,
    /// Variant directory relative to the experiments root, `/`-separated
    pub path: String,
    /// Tracked files in the variant directory
    pub files: Vec<String>,
    /// Variables detected in `files`
    pub variables: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Variant {
    fn default() -> Self {
        Self {
            variant_name: "Variant".to_string(),
            variant_id: None,
            author: "System".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            path: String::new(),
            files: Vec::new(),
            variables: Map::new(),
            extra: Map::new(),
        }
    }
}

impl Variant {
    /// Read a variant entry from hand-edited JSON.
    ///
    /// Returns `None` for entries that are not objects or have no
    /// `variant_name`.
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        if !map
            .get("variant_name")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.is_empty())
        {
            return None;
        }

        retain_if(&mut map, "variant_id", |v| v.as_i64().is_some());
        retain_if(&mut map, "files", Value::is_array);
        retain_if(&mut map, "variables", Value::is_object);
        for key in ["author", "version", "description", "path"] {
            retain_if(&mut map, key, Value::is_string);
        }
        if let Some(Value::Array(files)) = map.get_mut("files") {
            files.retain(Value::is_string);
        }

        serde_json::from_value(Value::Object(map)).ok()
    }
}

/// Contents of an `experiment.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experiment {
    pub experiment_name: String,
    pub experiment_id: i64,
    pub author: String,
    pub version: String,
    pub description: String,
    /// Experiment directory relative to the experiments root, `/`-separated
    pub path: String,
    pub variants: Vec<Variant>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Experiment {
    fn default() -> Self {
        Self {
            experiment_name: "Experiment".to_string(),
            experiment_id: 0,
            author: "System".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
            path: String::new(),
            variants: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl Experiment {
    /// A fresh record for a directory with no usable experiment file
    pub fn new(experiment_id: i64, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            experiment_name: name.into(),
            experiment_id,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Read an experiment record from hand-edited JSON, filling missing
    /// identity fields from the directory it was found in.
    ///
    /// Variant entries are read as-is; they are reconciled with the disk later.
    pub fn from_json(value: Value, dir_name: &str, relative_path: &str) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(ExpkitError::manifest("experiment file is not a JSON object"));
        };

        let variants = match map.remove("variants") {
            Some(Value::Array(entries)) => entries,
            _ => {
                info!("variants property is not an array or is missing. Initializing to empty array.");
                Vec::new()
            }
        };

        if !map.get("experiment_id").is_some_and(|id| id.as_i64().is_some_and(|id| id != 0)) {
            info!("experiment_id property is missing in {}, using 0.", dir_name);
            map.insert("experiment_id".into(), Value::from(0));
        }
        if !is_non_empty_str(map.get("experiment_name")) {
            info!("experiment_name property is missing in {}, using the directory name.", dir_name);
            map.insert("experiment_name".into(), Value::from(dir_name));
        }
        if !is_non_empty_str(map.get("path")) {
            info!("path property is missing in {}, using {}.", dir_name, relative_path);
            map.insert("path".into(), Value::from(relative_path));
        }
        for key in ["author", "version", "description"] {
            retain_if(&mut map, key, Value::is_string);
        }

        let mut experiment: Self = serde_json::from_value(Value::Object(map))?;
        experiment.variants = variants
            .into_iter()
            .filter_map(|entry| {
                let parsed = Variant::from_json(entry.clone());
                if parsed.is_none() {
                    info!("Skipping invalid variant entry in {}: {}", dir_name, entry);
                }
                parsed
            })
            .collect();

        Ok(experiment)
    }

    /// The index entry for this experiment
    pub fn summary(&self) -> ExperimentSummary {
        ExperimentSummary {
            id: self.experiment_id,
            name: self.experiment_name.clone(),
            description: self.description.clone(),
            variants: self.variants.iter().map(|v| v.variant_name.clone()).collect(),
            extra: Map::new(),
        }
    }
}

/// One experiment in `experiments.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Contents of `experiments.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentsManifest {
    pub name: String,
    pub author: String,
    pub version: String,
    #[serde(rename = "lastBuildDate")]
    pub last_build_date: String,
    pub experiments: Vec<ExperimentSummary>,
}

impl ExperimentsManifest {
    /// Empty index stamped with `last_build_date`
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        version: impl Into<String>,
        last_build_date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            version: version.into(),
            last_build_date: last_build_date.into(),
            experiments: Vec::new(),
        }
    }

    /// Carry over name, author, version and entries from an existing index.
    ///
    /// Blank or mistyped fields keep the current values; entries that do not
    /// read as summaries are dropped.
    pub fn merge_existing(&mut self, existing: Value) -> Result<()> {
        let Value::Object(map) = existing else {
            return Err(ExpkitError::manifest("experiments index is not a JSON object"));
        };

        if let Some(name) = non_empty_str(map.get("name")) {
            self.name = name.to_string();
        }
        if let Some(author) = non_empty_str(map.get("author")) {
            self.author = author.to_string();
        }
        if let Some(version) = non_empty_str(map.get("version")) {
            self.version = version.to_string();
        }
        if let Some(Value::Array(entries)) = map.get("experiments") {
            self.experiments = entries
                .iter()
                .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                    Ok(summary) => Some(summary),
                    Err(e) => {
                        info!("Dropping unreadable experiments entry {}: {}", entry, e);
                        None
                    }
                })
                .collect();
        }

        Ok(())
    }

    /// Replace the entry with the same id, or append a new one
    pub fn upsert(&mut self, summary: ExperimentSummary) {
        match self.experiments.iter_mut().find(|e| e.id == summary.id) {
            Some(existing) => {
                debug!(id = summary.id, "Updating experiments entry");
                *existing = summary;
            }
            None => {
                debug!(id = summary.id, "Adding experiments entry");
                self.experiments.push(summary);
            }
        }
    }
}

fn retain_if(map: &mut Map<String, Value>, key: &str, keep: impl Fn(&Value) -> bool) {
    if map.get(key).is_some_and(|v| !keep(v)) {
        debug!(key, "Dropping field with unexpected type");
        map.remove(key);
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn is_non_empty_str(value: Option<&Value>) -> bool {
    non_empty_str(value).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variant_requires_name() {
        assert!(Variant::from_json(json!("default")).is_none());
        assert!(Variant::from_json(json!({"variant_id": 1})).is_none());
        assert!(Variant::from_json(json!({"variant_name": ""})).is_none());
    }

    #[test]
    fn test_variant_drops_mistyped_fields() {
        let variant = Variant::from_json(json!({
            "variant_name": "default",
            "variant_id": "one",
            "files": ["a.js", 3],
            "variables": [],
            "owner": "growth-team"
        }))
        .unwrap();

        assert_eq!(variant.variant_id, None);
        assert_eq!(variant.files, vec!["a.js".to_string()]);
        assert!(variant.variables.is_empty());
        assert_eq!(variant.author, "System");
        assert_eq!(variant.extra["owner"], json!("growth-team"));
    }

    #[test]
    fn test_experiment_fills_missing_identity() {
        let experiment = Experiment::from_json(
            json!({"description": "Try it", "variants": "oops"}),
            "Popup",
            "Popup",
        )
        .unwrap();

        assert_eq!(experiment.experiment_name, "Popup");
        assert_eq!(experiment.experiment_id, 0);
        assert_eq!(experiment.path, "Popup");
        assert_eq!(experiment.description, "Try it");
        assert!(experiment.variants.is_empty());
    }

    #[test]
    fn test_experiment_keeps_unknown_fields_in_output() {
        let experiment = Experiment::from_json(
            json!({"experiment_id": 4, "experiment_name": "X", "path": "X", "owner": "ops"}),
            "X",
            "X",
        )
        .unwrap();
        let out = serde_json::to_value(&experiment).unwrap();
        assert_eq!(out["owner"], json!("ops"));
        assert_eq!(out["experiment_id"], json!(4));
    }

    #[test]
    fn test_experiment_rejects_non_object() {
        assert!(Experiment::from_json(json!([1, 2]), "X", "X").is_err());
    }

    #[test]
    fn test_manifest_merge_and_upsert() {
        let mut manifest = ExperimentsManifest::new("lib", "me", "1.0.0", "now");
        manifest
            .merge_existing(json!({
                "name": "custom-lib",
                "author": "",
                "experiments": [
                    {"id": 1, "name": "Popup", "description": "", "variants": ["default"]},
                    {"name": "no id"}
                ]
            }))
            .unwrap();

        assert_eq!(manifest.name, "custom-lib");
        assert_eq!(manifest.author, "me");
        assert_eq!(manifest.experiments.len(), 1);

        let experiment = Experiment::new(1, "Popup v2", "Popup");
        manifest.upsert(experiment.summary());
        manifest.upsert(Experiment::new(2, "Banner", "Banner").summary());

        assert_eq!(manifest.experiments.len(), 2);
        assert_eq!(manifest.experiments[0].name, "Popup v2");
        assert_eq!(manifest.experiments[1].id, 2);
    }

    #[test]
    fn test_manifest_serializes_last_build_date_camel_case() {
        let manifest = ExperimentsManifest::new("lib", "me", "1.0.0", "2026-01-01T00:00:00.000Z");
        let out = serde_json::to_value(&manifest).unwrap();
        assert_eq!(out["lastBuildDate"], json!("2026-01-01T00:00:00.000Z"));
    }
}
