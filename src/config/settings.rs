//! Local settings tree loaded from the application's settings file.
//!
//! The tree is the input of the reconciler: an ordered hierarchy where each key maps either to
//! a scalar (kept as text) or to nested children. TOML and JSON documents are supported; arrays
//! become sections keyed by element index (`Hosts:0`, `Hosts:1`, ...).

use crate::errors::{Error, Result};
use std::path::Path;

/// A node of the settings tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingNode {
    /// Leaf value as text; an empty string means "no value"
    Value(String),
    /// Nested section
    Section(SettingsTree),
}

/// Ordered hierarchical key-value settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsTree {
    entries: Vec<(String, SettingNode)>,
}

impl SettingsTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a leaf value.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .push((key.into(), SettingNode::Value(value.into())));
        self
    }

    /// Appends a nested section.
    #[must_use]
    pub fn with_section(mut self, key: impl Into<String>, section: Self) -> Self {
        self.entries
            .push((key.into(), SettingNode::Section(section)));
        self
    }

    /// Immediate children in document order.
    #[must_use]
    pub fn children(&self) -> &[(String, SettingNode)] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings TOML: {e}"),
        })?;
        Ok(Self::from_toml_table(table))
    }

    /// Parses a JSON document whose root is an object.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let root: serde_json::Value = serde_json::from_str(contents).map_err(|e| Error::Config {
            message: format!("Failed to parse settings JSON: {e}"),
        })?;
        match root {
            serde_json::Value::Object(map) => Ok(Self::from_json_map(map)),
            _ => Err(Error::Config {
                message: "Settings JSON root must be an object".to_string(),
            }),
        }
    }

    /// Loads a settings file, choosing the format by extension (`.json`, otherwise TOML).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading settings from: {:?}", path);
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Failed to read settings file {}: {e}", path.display()),
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_toml_str(&contents)
        }
    }

    fn from_toml_table(table: toml::Table) -> Self {
        Self {
            entries: table
                .into_iter()
                .map(|(key, value)| (key, toml_node(value)))
                .collect(),
        }
    }

    fn from_json_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            entries: map
                .into_iter()
                .map(|(key, value)| (key, json_node(value)))
                .collect(),
        }
    }
}

fn toml_node(value: toml::Value) -> SettingNode {
    match value {
        toml::Value::Table(table) => SettingNode::Section(SettingsTree::from_toml_table(table)),
        toml::Value::Array(items) => SettingNode::Section(SettingsTree {
            entries: items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), toml_node(item)))
                .collect(),
        }),
        toml::Value::String(s) => SettingNode::Value(s),
        toml::Value::Integer(i) => SettingNode::Value(i.to_string()),
        toml::Value::Boolean(b) => SettingNode::Value(b.to_string()),
        // `Display` keeps TOML's own spelling, so `3.0` stays `3.0`
        other @ (toml::Value::Float(_) | toml::Value::Datetime(_)) => {
            SettingNode::Value(other.to_string())
        }
    }
}

fn json_node(value: serde_json::Value) -> SettingNode {
    match value {
        serde_json::Value::Object(map) => SettingNode::Section(SettingsTree::from_json_map(map)),
        serde_json::Value::Array(items) => SettingNode::Section(SettingsTree {
            entries: items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), json_node(item)))
                .collect(),
        }),
        serde_json::Value::String(s) => SettingNode::Value(s),
        serde_json::Value::Null => SettingNode::Value(String::new()),
        other => SettingNode::Value(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_toml_settings() {
        let toml_str = r#"
            SiteName = "soty.io"
            MaxItemCount = 50

            [Basket]
            Enabled = true
            Ratio = 3.0
            Hosts = ["a.local", "b.local"]
        "#;

        let tree = SettingsTree::from_toml_str(toml_str).unwrap();
        let children = tree.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], ("SiteName".to_string(), SettingNode::Value("soty.io".into())));
        assert_eq!(children[1], ("MaxItemCount".to_string(), SettingNode::Value("50".into())));

        let SettingNode::Section(basket) = &children[2].1 else {
            panic!("Basket should be a section");
        };
        assert_eq!(basket.children()[0].1, SettingNode::Value("true".into()));
        assert_eq!(basket.children()[1].1, SettingNode::Value("3.0".into()));
        let SettingNode::Section(hosts) = &basket.children()[2].1 else {
            panic!("Hosts should be a section");
        };
        assert_eq!(hosts.children()[1], ("1".to_string(), SettingNode::Value("b.local".into())));
    }

    #[test]
    fn test_parse_json_settings_keeps_order() {
        let json = r#"{"Zeta": "last?", "Alpha": {"Inner": 1.5, "Empty": null}}"#;
        let tree = SettingsTree::from_json_str(json).unwrap();
        assert_eq!(tree.children()[0].0, "Zeta");
        let SettingNode::Section(alpha) = &tree.children()[1].1 else {
            panic!("Alpha should be a section");
        };
        assert_eq!(alpha.children()[0].1, SettingNode::Value("1.5".into()));
        assert_eq!(alpha.children()[1].1, SettingNode::Value(String::new()));
    }

    #[test]
    fn test_json_root_must_be_object() {
        assert!(matches!(
            SettingsTree::from_json_str("[1, 2]"),
            Err(Error::Config { message: _ })
        ));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            SettingsTree::from_toml_str("not = = toml"),
            Err(Error::Config { message: _ })
        ));
    }
}
