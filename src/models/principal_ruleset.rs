use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::MigrationError;
use crate::models::Rule;

/// Rule lists for identities found in the HDFS dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HdfsPrincipalRuleset {
    #[serde(default)]
    pub user_rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub group_rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub other_rules: Option<Vec<Rule>>,
}

/// Rule lists for the users, groups and roles of the Ranger dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangerPrincipalRuleset {
    #[serde(default)]
    pub user_rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub group_rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub role_rules: Option<Vec<Rule>>,
}

/// The principal ruleset document read by `expand`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrincipalRuleset {
    #[serde(default)]
    pub hdfs: Option<HdfsPrincipalRuleset>,
    #[serde(default)]
    pub ranger: Option<RangerPrincipalRuleset>,
}

impl PrincipalRuleset {
    pub fn load(path: &Path) -> Result<Self, MigrationError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| MigrationError::ReadError {
                path: path.display().to_string(),
                source,
            })?;
        let ruleset: PrincipalRuleset = serde_yaml::from_str(&contents)
            .map_err(|e| MigrationError::parse(path.display().to_string(), e))?;
        tracing::info!(
            path = %path.display(),
            hdfs = ruleset.hdfs.is_some(),
            ranger = ruleset.ranger.is_some(),
            "Loaded principal ruleset"
        );
        Ok(ruleset)
    }
}
