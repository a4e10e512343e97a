//! Handlebars placeholder detection in variant source files.
//!
//! Variant files bind properties to editor variables with placeholders like
//! `color: {{Popup Color:text:color}}`. The part inside the braces is
//! `Name[:type[:unit]]`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::SyncConfig;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)\s*:\s*\{\{([^}]+)\}\}").expect("placeholder pattern is valid")
});

/// A variable found in a variant file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedVariable {
    #[serde(rename = "type")]
    pub type_name: String,
    pub unit: String,
    pub default: Value,
    pub description: String,
    /// The property the placeholder is bound to
    pub property: String,
}

/// Find placeholders in `content`, in order of appearance
pub fn detect_in_text(content: &str) -> Vec<(String, DetectedVariable)> {
    PLACEHOLDER
        .captures_iter(content)
        .filter_map(|caps| {
            let property = caps[1].to_string();
            let mut parts = caps[2].split(':').map(str::trim);
            let name = parts.next().filter(|n| !n.is_empty())?.to_string();
            let type_name = parts
                .next()
                .filter(|t| !t.is_empty())
                .unwrap_or("string")
                .to_string();
            let unit = parts
                .next()
                .filter(|u| !u.is_empty())
                .unwrap_or("px")
                .to_string();

            let variable = DetectedVariable {
                description: format!("This is a {} variable", type_name),
                type_name,
                unit,
                default: Value::from(0),
                property,
            };
            Some((name, variable))
        })
        .collect()
}

/// Collect the variables declared across `files` inside `dir`.
///
/// Untracked extensions are ignored; missing or unreadable files are logged
/// and skipped. A name seen twice keeps its last occurrence.
pub fn detect_variables(dir: &Path, files: &[String], config: &SyncConfig) -> Map<String, Value> {
    let mut variables = Map::new();

    for file in files {
        if !config.is_tracked(file) {
            continue;
        }
        let path = dir.join(file);
        if !path.exists() {
            warn!("File {} does not exist", path.display());
            continue;
        }
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                continue;
            }
        };

        for (name, variable) in detect_in_text(&content) {
            debug!(file = %path.display(), variable = %name, "Detected variable");
            match serde_json::to_value(&variable) {
                Ok(value) => {
                    variables.insert(name, value);
                }
                Err(e) => warn!("Could not record variable {}: {}", name, e),
            }
        }
    }

    variables
}
