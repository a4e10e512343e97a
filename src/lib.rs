//! expkit library
//!
//! Turns lists of named, typed experiment variables into the nested config
//! objects experiment UIs consume, and keeps experiment manifests in sync
//! with the experiment folders on disk.

pub mod cli;
pub mod coerce;
pub mod config;
pub mod detect;
pub mod error;
pub mod manifest;
pub mod mapping;
pub mod path;
pub mod sync;
pub mod templates;
pub mod variable;

// Re-export main types for convenience
pub use config::SyncConfig;
pub use detect::{DetectedVariable, detect_variables};
pub use error::{ExpkitError, Result};
pub use manifest::{Experiment, ExperimentSummary, ExperimentsManifest, Variant};
pub use mapping::variables_to_config;
pub use path::{PropertyPath, PathError, PathKind, Segment, set_nested_property, try_set};
pub use sync::{SyncReport, next_experiment_id, update_experiment, update_experiments_manifest};
pub use templates::Template;
pub use variable::{Variable, VariableKind, VariableList};
