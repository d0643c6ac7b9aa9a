use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    GcsManagedFolder,
    BqTable,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::GcsManagedFolder => "GCS_MANAGED_FOLDER",
            ResourceType::BqTable => "BQ_TABLE",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// source system -> records that produced a binding
pub type Provenance = BTreeMap<String, Vec<Value>>;

/// One role granted to one principal on one target resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IamBinding {
    pub resource_type: ResourceType,
    pub resource_path: String,
    pub principal: String,
    pub role: String,
    pub priority: i32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_permissions: Provenance,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source_principals: Provenance,
}

impl IamBinding {
    pub fn new(
        resource_type: ResourceType,
        resource_path: impl Into<String>,
        principal: impl Into<String>,
        role: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            resource_type,
            resource_path: resource_path.into(),
            principal: principal.into(),
            role: role.into(),
            priority,
            source_permissions: Provenance::new(),
            source_principals: Provenance::new(),
        }
    }

    /// Attach the source records this binding was derived from.
    pub fn with_provenance(mut self, system: &str, permission: Value, principal: Value) -> Self {
        self.source_permissions
            .entry(system.to_string())
            .or_default()
            .push(permission);
        self.source_principals
            .entry(system.to_string())
            .or_default()
            .push(principal);
        self
    }

    /// Same binding, different role.
    pub fn with_role(&self, role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..self.clone()
        }
    }

    pub fn resource_key(&self) -> (ResourceType, String) {
        (self.resource_type, self.resource_path.clone())
    }
}

/// Output document of a build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingsDocument {
    pub bindings: Vec<IamBinding>,
}
