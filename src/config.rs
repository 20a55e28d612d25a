// Copyright 2025 Cowboy AI, LLC.

//! Definition builder configuration

use serde::{Deserialize, Serialize};

/// Knobs of the definition builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionBuilderConfig {
    /// Annotation types under `<reserved_namespace>::` are never propagated
    pub reserved_namespace: String,

    /// Full names of annotation types that are never propagated
    pub annotation_deny_list: Vec<String>,

    /// Reject base and next-call dependencies on non-interface types
    pub validate_requirement_targets: bool,
}

impl Default for DefinitionBuilderConfig {
    fn default() -> Self {
        Self {
            reserved_namespace: "cim_mixin".to_string(),
            annotation_deny_list: vec![
                "serde::Serialize".to_string(),
                "serde::Deserialize".to_string(),
                "core::marker::Serializable".to_string(),
                "core::marker::NonSerialized".to_string(),
            ],
            validate_requirement_targets: true,
        }
    }
}

impl DefinitionBuilderConfig {
    /// Whether annotations of the named type must not be propagated
    pub fn is_denied(&self, annotation_type_name: &str) -> bool {
        let in_reserved_namespace = annotation_type_name
            .strip_prefix(self.reserved_namespace.as_str())
            .is_some_and(|rest| rest.starts_with("::"));
        in_reserved_namespace
            || self
                .annotation_deny_list
                .iter()
                .any(|denied| denied == annotation_type_name)
    }

    /// Add a full type name to the deny list
    pub fn deny(mut self, annotation_type_name: impl Into<String>) -> Self {
        self.annotation_deny_list.push(annotation_type_name.into());
        self
    }
}
