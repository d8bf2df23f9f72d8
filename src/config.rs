// SPDX-License-Identifier: MIT

//! Construction-time options
//!
//! `VisitOptions` configures visitors, `GraphOptions` configures graphs.
//! Both can be read from YAML or from `EXECGRAPH_*` environment variables.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ExecGraphError;

/// What `delete_node` does with the children of the deleted node
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Re-parent children onto the deleted node's parents (default)
    #[default]
    Reparent,
    /// Refuse to delete a node that has children
    Reject,
    /// Drop the node and its edges only, children keep the dangling declaration
    Detach,
}

impl std::str::FromStr for DeletePolicy {
    type Err = ExecGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reparent" => Ok(Self::Reparent),
            "reject" => Ok(Self::Reject),
            "detach" => Ok(Self::Detach),
            other => Err(ExecGraphError::config(format!(
                "Unknown delete policy: {}",
                other
            ))),
        }
    }
}

/// Options forwarded to visitor constructors
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct VisitOptions {
    /// Report "n of m" progress through the default log sink
    pub with_progress: bool,
    /// Maximum nesting of graph nodes; `None` is unbounded
    pub max_depth: Option<usize>,
}

impl VisitOptions {
    pub fn with_progress(self, with_progress: bool) -> Self {
        Self {
            with_progress,
            ..self
        }
    }

    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            ..self
        }
    }
}

/// Options forwarded to graph constructors
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GraphOptions {
    pub delete_policy: DeletePolicy,
}

/// Both option sets, as found in an options file or in the environment
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub visit: VisitOptions,
    pub graph: GraphOptions,
}

impl Settings {
    /// Parse settings from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Self, ExecGraphError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load settings from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ExecGraphError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Override fields from `EXECGRAPH_WITH_PROGRESS`, `EXECGRAPH_MAX_DEPTH`
    /// and `EXECGRAPH_DELETE_POLICY` when they are set
    pub fn from_env(self) -> Result<Self, ExecGraphError> {
        self.apply_vars(|key| env::var(key).ok())
    }

    fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ExecGraphError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("EXECGRAPH_WITH_PROGRESS") {
            self.visit.with_progress = parse_flag(&value).ok_or_else(|| {
                ExecGraphError::config(format!("EXECGRAPH_WITH_PROGRESS: invalid flag '{}'", value))
            })?;
        }
        if let Some(value) = lookup("EXECGRAPH_MAX_DEPTH") {
            self.visit.max_depth = match value.trim() {
                "" | "unbounded" => None,
                raw => Some(raw.parse().map_err(|_| {
                    ExecGraphError::config(format!("EXECGRAPH_MAX_DEPTH: invalid depth '{}'", raw))
                })?),
            };
        }
        if let Some(value) = lookup("EXECGRAPH_DELETE_POLICY") {
            self.graph.delete_policy = value.parse()?;
        }
        log::debug!("Resolved settings: {:?}", self);
        Ok(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.visit.with_progress);
        assert_eq!(settings.visit.max_depth, None);
        assert_eq!(settings.graph.delete_policy, DeletePolicy::Reparent);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
visit:
  with_progress: true
  max_depth: 2
graph:
  delete_policy: detach
"#;
        let settings = Settings::parse_yaml(yaml).unwrap();
        assert!(settings.visit.with_progress);
        assert_eq!(settings.visit.max_depth, Some(2));
        assert_eq!(settings.graph.delete_policy, DeletePolicy::Detach);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let settings = Settings::parse_yaml("visit:\n  max_depth: 1\n").unwrap();
        assert_eq!(settings.visit.max_depth, Some(1));
        assert_eq!(settings.graph, GraphOptions::default());
    }

    #[test]
    fn test_apply_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("EXECGRAPH_WITH_PROGRESS", "yes"),
            ("EXECGRAPH_MAX_DEPTH", "3"),
            ("EXECGRAPH_DELETE_POLICY", "Reject"),
        ]);
        let settings = Settings::default()
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert!(settings.visit.with_progress);
        assert_eq!(settings.visit.max_depth, Some(3));
        assert_eq!(settings.graph.delete_policy, DeletePolicy::Reject);
    }

    #[test]
    fn test_apply_vars_rejects_garbage() {
        let result = Settings::default().apply_vars(|k| {
            (k == "EXECGRAPH_MAX_DEPTH").then(|| "deep".to_string())
        });
        assert!(result.is_err());

        let result = Settings::default().apply_vars(|k| {
            (k == "EXECGRAPH_DELETE_POLICY").then(|| "nope".to_string())
        });
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown delete policy"));
    }

    #[test]
    fn test_unbounded_depth_from_env() {
        let settings = Settings::parse_yaml("visit:\n  max_depth: 4\n")
            .unwrap()
            .apply_vars(|k| (k == "EXECGRAPH_MAX_DEPTH").then(|| "unbounded".to_string()))
            .unwrap();
        assert_eq!(settings.visit.max_depth, None);
    }
}
