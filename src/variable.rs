//! Experiment variables: the named, typed knobs an experiment exposes.
//!
//! A variable list is a tree. Leaves carry a value and a `mapsTo` path;
//! groups carry only child variables. The JSON shape matches what the
//! experiment editors read and write:
//!
//! ```json
//! [
//!   { "name": "Popup Width", "mapsTo": "design.width", "type": "number", "unit": "px", "value": 640 },
//!   { "name": "Popup Actions", "type": "group", "items": [ ... ] }
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

use crate::coerce;
use crate::error::{ExpkitError, Result};
use crate::mapping;

/// Behavior class of a variable, taken from the base of its type string
/// (`text:url` → `Text`, `group:collapsed` → `Group`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum VariableKind {
    Group,
    Number,
    Text,
    Boolean,
    Other,
}

/// A single experiment variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub name: String,

    /// Where the value lands in the config object
    #[serde(rename = "mapsTo", default, skip_serializing_if = "Option::is_none")]
    pub maps_to: Option<String>,

    /// Type string such as `text`, `text:long`, `number`, `group`
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Child variables of a group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Variable>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Display position inside the parent group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_index: Option<u32>,
}

impl Variable {
    /// Create a leaf variable written to `maps_to`
    pub fn leaf(
        name: impl Into<String>,
        maps_to: impl Into<String>,
        type_name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            maps_to: Some(maps_to.into()),
            type_name: type_name.into(),
            value: Some(value.into()),
            items: None,
            unit: None,
            description: None,
            group_index: None,
        }
    }

    /// Create a group owning `items`
    pub fn group(name: impl Into<String>, items: Vec<Variable>) -> Self {
        Self {
            name: name.into(),
            maps_to: None,
            type_name: VariableKind::Group.to_string(),
            value: None,
            items: Some(items),
            unit: None,
            description: None,
            group_index: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    pub fn at_index(mut self, group_index: u32) -> Self {
        self.group_index = Some(group_index);
        self
    }

    /// Behavior class from the base of the type string
    pub fn kind(&self) -> VariableKind {
        let base = self.type_name.split(':').next().unwrap_or_default();
        base.parse().unwrap_or(VariableKind::Other)
    }

    /// The part of the type string after `:`, e.g. `url` for `text:url`
    pub fn subtype(&self) -> Option<&str> {
        self.type_name.split_once(':').map(|(_, sub)| sub)
    }

    pub fn is_group(&self) -> bool {
        self.kind() == VariableKind::Group
    }

    /// Store `value` after normalizing it for this variable's kind.
    ///
    /// Empty text becomes `""`, numbers that do not parse become `0`,
    /// and booleans take the truthiness of the input.
    fn assign(&mut self, value: Value) {
        let normalized = match self.kind() {
            VariableKind::Text => {
                if coerce::is_truthy(&value) {
                    value
                } else {
                    Value::String(String::new())
                }
            }
            VariableKind::Number => coerce::number_from_f64(coerce::numeric_value(&value))
                .unwrap_or_else(|| Value::from(0)),
            VariableKind::Boolean => Value::Bool(coerce::is_truthy(&value)),
            VariableKind::Group | VariableKind::Other => value,
        };
        self.value = Some(normalized);
    }
}

/// Ordered variable tree with lookup by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableList(Vec<Variable>);

impl VariableList {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self(variables)
    }

    pub fn as_slice(&self) -> &[Variable] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append variables to the end of the list
    pub fn extend(&mut self, variables: impl IntoIterator<Item = Variable>) {
        self.0.extend(variables);
    }

    /// Find the first variable named `name`, searching into groups depth-first
    pub fn find(&self, name: &str) -> Option<&Variable> {
        find_in(&self.0, name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Variable> {
        find_in_mut(&mut self.0, name)
    }

    /// Set the value of the variable named `name`
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let variable = self
            .find_mut(name)
            .ok_or_else(|| ExpkitError::VariableNotFound(name.to_string()))?;
        if variable.is_group() {
            return Err(ExpkitError::GroupValue(name.to_string()));
        }
        variable.assign(value.into());
        debug!(variable = name, value = ?variable.value, "Variable updated");
        Ok(())
    }

    /// Reduce the list into a config object seeded from `defaults`
    pub fn to_config(&self, defaults: &Value) -> Value {
        mapping::variables_to_config(&self.0, defaults)
    }

    /// Load a variable list from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let list: Self = serde_json::from_str(&content)?;
        debug!(path = ?path.as_ref(), count = list.len(), "Loaded variable list");
        Ok(list)
    }

    /// Save the variable list as pretty JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl From<Vec<Variable>> for VariableList {
    fn from(variables: Vec<Variable>) -> Self {
        Self(variables)
    }
}

impl<'a> IntoIterator for &'a VariableList {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn find_in<'a>(variables: &'a [Variable], name: &str) -> Option<&'a Variable> {
    for variable in variables {
        if variable.name == name {
            return Some(variable);
        }
        if variable.is_group() {
            if let Some(found) = variable.items.as_deref().and_then(|items| find_in(items, name)) {
                return Some(found);
            }
        }
    }
    None
}

fn find_in_mut<'a>(variables: &'a mut [Variable], name: &str) -> Option<&'a mut Variable> {
    for variable in variables {
        if variable.name == name {
            return Some(variable);
        }
        if variable.is_group() {
            if let Some(found) = variable
                .items
                .as_deref_mut()
                .and_then(|items| find_in_mut(items, name))
            {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> VariableList {
        VariableList::new(vec![
            Variable::leaf("Heading", "content.headingHTML", "text:long", "<h3>Hi</h3>"),
            Variable::group(
                "Actions",
                vec![Variable::group(
                    "Action 1",
                    vec![
                        Variable::leaf("Action 1 Text", "actions[0].textHTML", "text", "Yes"),
                        Variable::leaf("Action 1 Width", "actions[0].width", "number", 10),
                    ],
                )],
            ),
            Variable::leaf("Show Close", "design.showClose", "boolean", true),
        ])
    }

    #[test]
    fn test_kind_uses_type_base() {
        let v = Variable::leaf("a", "a", "text:url", "x");
        assert_eq!(v.kind(), VariableKind::Text);
        assert_eq!(v.subtype(), Some("url"));

        let g = Variable::group("g", vec![]).with_type("group:collapsed");
        assert_eq!(g.kind(), VariableKind::Group);

        let odd = Variable::leaf("a", "a", "color", "red");
        assert_eq!(odd.kind(), VariableKind::Other);
    }

    #[test]
    fn test_find_searches_nested_groups() {
        let list = sample();
        let found = list.find("Action 1 Text").expect("nested variable");
        assert_eq!(found.maps_to.as_deref(), Some("actions[0].textHTML"));
        assert!(list.find("Missing").is_none());
        assert!(list.find("Actions").is_some_and(Variable::is_group));
    }

    #[test]
    fn test_set_normalizes_text() {
        let mut list = sample();
        list.set("Heading", Value::Null).unwrap();
        assert_eq!(list.find("Heading").unwrap().value, Some(json!("")));
    }

    #[test]
    fn test_set_normalizes_numbers() {
        let mut list = sample();
        list.set("Action 1 Width", "25").unwrap();
        assert_eq!(list.find("Action 1 Width").unwrap().value, Some(json!(25)));

        list.set("Action 1 Width", "wide").unwrap();
        assert_eq!(list.find("Action 1 Width").unwrap().value, Some(json!(0)));
    }

    #[test]
    fn test_set_normalizes_booleans() {
        let mut list = sample();
        list.set("Show Close", 0).unwrap();
        assert_eq!(list.find("Show Close").unwrap().value, Some(json!(false)));
    }

    #[test]
    fn test_set_unknown_variable_fails() {
        let mut list = sample();
        let err = list.set("Nope", "x").unwrap_err();
        assert!(matches!(err, ExpkitError::VariableNotFound(name) if name == "Nope"));
    }

    #[test]
    fn test_set_group_fails() {
        let mut list = sample();
        let err = list.set("Actions", "x").unwrap_err();
        assert!(matches!(err, ExpkitError::GroupValue(_)));
    }

    #[test]
    fn test_json_shape() {
        let list: VariableList = serde_json::from_value(json!([
            {"name": "Width", "mapsTo": "design.width", "type": "number", "unit": "px", "value": 640},
            {"name": "Group", "type": "group", "items": [
                {"group_index": 0, "name": "Inner", "mapsTo": "x", "type": "text", "unit": null, "value": "v"}
            ]}
        ]))
        .unwrap();

        assert_eq!(list.len(), 2);
        let inner = list.find("Inner").unwrap();
        assert_eq!(inner.group_index, Some(0));
        assert_eq!(inner.unit, None);

        let back = serde_json::to_value(&list).unwrap();
        assert_eq!(back[0]["mapsTo"], json!("design.width"));
        assert!(back[1].get("mapsTo").is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("variables.json");
        let list = sample();
        list.save_to_file(&path).unwrap();
        let loaded = VariableList::load_from_file(&path).unwrap();
        assert_eq!(loaded, list);
    }
}
