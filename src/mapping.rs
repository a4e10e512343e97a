//! Variable list → config object reduction.
//!
//! Each leaf variable's value is coerced by type and written at its
//! `mapsTo` path inside a copy of the defaults. Group variables contribute
//! only a path prefix (their own `mapsTo`, when set) for their descendants.
//! Bad entries are logged and skipped; the rest of the list is still applied.

use serde_json::Value;
use tracing::{debug, warn};

use crate::coerce;
use crate::path::{self, PathKind};
use crate::variable::{Variable, VariableKind};

/// Build a config object from `variables`, starting from a copy of `defaults`.
///
/// `defaults` is never modified.
pub fn variables_to_config(variables: &[Variable], defaults: &Value) -> Value {
    let mut config = defaults.clone();
    for variable in variables {
        apply_variable(&mut config, variable, "");
    }
    config
}

/// Coerce a variable's value for writing: numbers stay numeric, everything
/// else becomes text.
///
/// A variable without a `value` has no numeric reading and is written as
/// `null` for numbers and `"undefined"` for everything else.
pub fn coerce_value(variable: &Variable) -> Value {
    match (variable.kind(), variable.value.as_ref()) {
        (VariableKind::Number, Some(raw)) => coerce::to_number(raw),
        (VariableKind::Number, None) => {
            warn!("Variable {} has no value, writing null", variable.name);
            Value::Null
        }
        (_, Some(raw)) => Value::String(coerce::to_display_string(raw)),
        (_, None) => Value::String("undefined".to_string()),
    }
}

fn join_path(prefix: &str, maps_to: Option<&str>) -> String {
    match (prefix.is_empty(), maps_to.filter(|m| !m.is_empty())) {
        (true, Some(m)) => m.to_string(),
        (true, None) => String::new(),
        (false, Some(m)) => format!("{}.{}", prefix, m),
        (false, None) => prefix.to_string(),
    }
}

fn apply_variable(config: &mut Value, variable: &Variable, prefix: &str) {
    if variable.is_group() {
        apply_group(config, variable, prefix);
        return;
    }

    let Some(maps_to) = variable.maps_to.as_deref().filter(|m| !m.is_empty()) else {
        warn!("Variable {} does not have a valid mapsTo property.", variable.name);
        return;
    };
    let full_path = join_path(prefix, Some(maps_to));
    let value = coerce_value(variable);

    let kind = PathKind::of(&full_path);
    debug!(variable = %variable.name, path = %full_path, ?kind, "Writing variable");

    match kind {
        PathKind::Bare => write_bare(config, &full_path, value),
        PathKind::Bracket | PathKind::Dotted => {
            if let Err(e) = path::try_set(config, &full_path, value) {
                warn!(
                    "Variable {} was not written to '{}': {}",
                    variable.name, full_path, e
                );
            }
        }
    }
}

fn apply_group(config: &mut Value, group: &Variable, prefix: &str) {
    let items = match group.items.as_deref() {
        Some(items) if !items.is_empty() => items,
        _ => {
            warn!("Variable {} is a group but has no items.", group.name);
            return;
        }
    };

    let group_prefix = join_path(prefix, group.maps_to.as_deref());
    for item in items {
        apply_variable(config, item, &group_prefix);
    }
}

fn write_bare(config: &mut Value, key: &str, value: Value) {
    match config {
        Value::Object(map) => {
            map.insert(key.to_string(), value);
        }
        _ => {
            path::set_nested_property(config, key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Vec<Variable> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_heading_and_grouped_number() {
        let variables = vars(json!([
            {"mapsTo": "content.headingHTML", "type": "text", "value": "Hi"},
            {"type": "group", "items": [{"mapsTo": "x", "type": "number", "value": "5"}]}
        ]));
        let config = variables_to_config(&variables, &json!({"content": {"headingHTML": ""}}));
        assert_eq!(config, json!({"content": {"headingHTML": "Hi"}, "x": 5}));
    }

    #[test]
    fn test_bracket_path_into_empty_array() {
        let variables = vars(json!([
            {"mapsTo": "actions[0].textHTML", "type": "text", "value": "Yes"}
        ]));
        let config = variables_to_config(&variables, &json!({"actions": []}));
        assert_eq!(config, json!({"actions": [{"textHTML": "Yes"}]}));
    }

    #[test]
    fn test_bracket_path_updates_existing_element() {
        let variables = vars(json!([
            {"mapsTo": "actions[0].textHTML", "type": "text", "value": "Sure"}
        ]));
        let defaults = json!({"actions": [{"textHTML": "Yes", "href": "/donate"}]});
        let config = variables_to_config(&variables, &defaults);
        assert_eq!(
            config,
            json!({"actions": [{"textHTML": "Sure", "href": "/donate"}]})
        );
    }

    #[test]
    fn test_defaults_are_not_mutated() {
        let defaults = json!({"content": {"headingHTML": ""}});
        let variables = vars(json!([
            {"mapsTo": "content.headingHTML", "type": "text", "value": "Hi"}
        ]));
        let _ = variables_to_config(&variables, &defaults);
        assert_eq!(defaults, json!({"content": {"headingHTML": ""}}));
    }

    #[test]
    fn test_group_name_never_becomes_a_key() {
        let variables = vars(json!([
            {"name": "Design", "type": "group", "items": [
                {"name": "Top", "mapsTo": "design.top", "type": "text", "value": 16}
            ]}
        ]));
        let config = variables_to_config(&variables, &json!({}));
        assert_eq!(config, json!({"design": {"top": "16"}}));
    }

    #[test]
    fn test_group_maps_to_prefixes_children() {
        let variables = vars(json!([
            {"name": "Button", "mapsTo": "button", "type": "group", "items": [
                {"name": "Inner", "mapsTo": "style", "type": "group", "items": [
                    {"name": "Color", "mapsTo": "color", "type": "text:color", "value": "#fff"}
                ]},
                {"name": "Label", "mapsTo": "label", "type": "text", "value": "Go"}
            ]}
        ]));
        let config = variables_to_config(&variables, &json!({}));
        assert_eq!(
            config,
            json!({"button": {"style": {"color": "#fff"}, "label": "Go"}})
        );
    }

    #[test]
    fn test_non_number_types_become_strings() {
        let variables = vars(json!([
            {"name": "Flag", "mapsTo": "flag", "type": "boolean", "value": true},
            {"name": "Url", "mapsTo": "url", "type": "text:url", "value": "https://a.example"},
            {"name": "Radius", "mapsTo": "radius", "type": "text", "value": 4.0}
        ]));
        let config = variables_to_config(&variables, &json!({}));
        assert_eq!(
            config,
            json!({"flag": "true", "url": "https://a.example", "radius": "4"})
        );
    }

    #[test]
    fn test_missing_maps_to_writes_nothing() {
        let variables = vars(json!([
            {"name": "Orphan", "type": "text", "value": "x"},
            {"name": "Kept", "mapsTo": "kept", "type": "text", "value": "y"}
        ]));
        let config = variables_to_config(&variables, &json!({}));
        assert_eq!(config, json!({"kept": "y"}));
    }

    #[test]
    fn test_group_without_items_is_skipped() {
        let variables = vars(json!([
            {"name": "Empty", "type": "group", "items": []},
            {"name": "NoItems", "type": "group"},
            {"name": "After", "mapsTo": "after", "type": "number", "value": 1}
        ]));
        let config = variables_to_config(&variables, &json!({}));
        assert_eq!(config, json!({"after": 1}));
    }

    #[test]
    fn test_invalid_index_skips_only_that_variable() {
        let variables = vars(json!([
            {"name": "Bad", "mapsTo": "actions[x].textHTML", "type": "text", "value": "no"},
            {"name": "Good", "mapsTo": "actions[1].textHTML", "type": "text", "value": "ok"}
        ]));
        let config = variables_to_config(&variables, &json!({"actions": []}));
        assert_eq!(config, json!({"actions": [null, {"textHTML": "ok"}]}));
    }

    #[test]
    fn test_unparsable_number_is_null() {
        let variables = vars(json!([
            {"name": "Delay", "mapsTo": "delay", "type": "number", "value": "soon"}
        ]));
        let config = variables_to_config(&variables, &json!({"delay": 0}));
        assert_eq!(config, json!({"delay": null}));
    }

    #[test]
    fn test_missing_value_is_null_or_undefined() {
        let variables = vars(json!([
            {"name": "N", "mapsTo": "n", "type": "number"},
            {"name": "T", "mapsTo": "t", "type": "text"}
        ]));
        let config = variables_to_config(&variables, &json!({}));
        assert_eq!(config, json!({"n": null, "t": "undefined"}));
    }

    #[test]
    fn test_later_variables_overwrite_earlier() {
        let variables = vars(json!([
            {"name": "A", "mapsTo": "design.width", "type": "number", "value": 100},
            {"name": "B", "mapsTo": "design.width", "type": "number", "value": 200}
        ]));
        let config = variables_to_config(&variables, &json!({}));
        assert_eq!(config, json!({"design": {"width": 200}}));
    }
}
