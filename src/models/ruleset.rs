use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::MigrationError;
use crate::models::Target;

fn default_when() -> String {
    "true".to_string()
}

fn default_log() -> String {
    "false".to_string()
}

/// One entry of a rule list: if `when` holds, either skip or map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default = "default_when")]
    pub when: String,
    #[serde(default = "default_log")]
    pub log: String,
    #[serde(default, deserialize_with = "super::bool_or_string")]
    pub skip: bool,
    #[serde(default, rename = "map")]
    pub map_fields: Option<BTreeMap<String, RuleMapField>>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            when: default_when(),
            log: default_log(),
            skip: false,
            map_fields: None,
        }
    }
}

impl Rule {
    pub fn map_when(when: impl Into<String>) -> Self {
        Self {
            when: when.into(),
            map_fields: Some(BTreeMap::new()),
            ..Default::default()
        }
    }

    pub fn skip_when(when: impl Into<String>) -> Self {
        Self {
            when: when.into(),
            skip: true,
            ..Default::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, field: RuleMapField) -> Self {
        self.map_fields
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), field);
        self
    }
}

/// An output field, computed from an expression or given as a constant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleMapField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl RuleMapField {
    pub fn expression(expr: impl Into<String>) -> Self {
        Self {
            expression: Some(expr.into()),
            value: None,
        }
    }

    pub fn value(value: Value) -> Self {
        Self {
            expression: None,
            value: Some(value),
        }
    }
}

/// Rule lists for every mapper that writes to one target platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRuleset {
    #[serde(default)]
    pub hdfs_rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub ranger_hive_rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub ranger_hdfs_rules: Option<Vec<Rule>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleMapping {
    /// Target roles this role is replaced by. Empty keeps the role as-is.
    #[serde(default, deserialize_with = "super::one_or_many")]
    pub rename_to: Vec<String>,
    /// Roles already granted by holding this one.
    #[serde(default)]
    pub includes: Vec<String>,
}

/// The permissions ruleset document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionsRuleset {
    #[serde(default)]
    pub gcs: Option<TargetRuleset>,
    #[serde(default)]
    pub bq: Option<TargetRuleset>,
    #[serde(default)]
    pub roles: BTreeMap<String, RoleMapping>,
}

impl PermissionsRuleset {
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| MigrationError::ReadError {
                path: path.display().to_string(),
                source,
            })?;
        let ruleset: PermissionsRuleset = serde_yaml::from_str(&contents)
            .map_err(|e| MigrationError::parse(path.display().to_string(), e))?;
        tracing::info!(
            path = %path.display(),
            gcs = ruleset.gcs.is_some(),
            bq = ruleset.bq.is_some(),
            roles = ruleset.roles.len(),
            "Loaded permissions ruleset"
        );
        Ok(ruleset)
    }

    pub fn for_target(&self, target: Target) -> Option<&TargetRuleset> {
        match target {
            Target::Gcs => self.gcs.as_ref(),
            Target::Bq => self.bq.as_ref(),
        }
    }
}
