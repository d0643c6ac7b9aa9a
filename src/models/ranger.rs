use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::MigrationError;

fn default_true() -> bool {
    true
}

/// Ranger service definition, one line of `services.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

/// Ranger policy, one line of `policies.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub service: String,
    #[serde(default)]
    pub service_type: Option<String>,
    /// 0 = access, 1 = data mask, 2 = row filter
    #[serde(default)]
    pub policy_type: Option<i32>,
    #[serde(default)]
    pub policy_priority: Option<i32>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Option<BTreeMap<String, PolicyResource>>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub policy_items: Vec<PolicyItem>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub deny_policy_items: Vec<PolicyItem>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub allow_exceptions: Vec<PolicyItem>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub deny_exceptions: Vec<PolicyItem>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub data_mask_policy_items: Vec<Value>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub row_filter_policy_items: Vec<Value>,
}

pub const ACCESS_POLICY_TYPE: i32 = 0;

impl Policy {
    pub fn resource(&self, name: &str) -> Option<&PolicyResource> {
        self.resources.as_ref()?.get(name)
    }

    /// Names of the unsupported features this policy uses.
    pub fn unsupported_features(&self) -> Vec<&'static str> {
        let mut features = Vec::new();
        if !self.allow_exceptions.is_empty() {
            features.push("allowExceptions");
        }
        if !self.deny_policy_items.is_empty() {
            features.push("denyPolicyItems");
        }
        if !self.deny_exceptions.is_empty() {
            features.push("denyExceptions");
        }
        if !self.row_filter_policy_items.is_empty() {
            features.push("rowFilterPolicyItems");
        }
        if !self.data_mask_policy_items.is_empty() {
            features.push("dataMaskPolicyItems");
        }
        if self
            .resources
            .iter()
            .flat_map(|r| r.values())
            .any(|r| r.is_excludes)
        {
            features.push("resource isExcludes");
        }
        features
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResource {
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub values: Vec<String>,
    #[serde(default)]
    pub is_excludes: bool,
    #[serde(default)]
    pub is_recursive: bool,
}

impl PolicyResource {
    pub fn any() -> Self {
        Self {
            values: vec!["*".to_string()],
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyItem {
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub accesses: Vec<PolicyItemAccess>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub users: Vec<String>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub groups: Vec<String>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub conditions: Vec<Value>,
    #[serde(default)]
    pub delegate_admin: bool,
}

impl PolicyItem {
    /// Every principal the item grants to: users, then groups, then roles.
    pub fn principals(&self) -> impl Iterator<Item = RangerPrincipal> + '_ {
        let users = self
            .users
            .iter()
            .map(|n| RangerPrincipal::new(RangerPrincipalType::User, n));
        let groups = self
            .groups
            .iter()
            .map(|n| RangerPrincipal::new(RangerPrincipalType::Group, n));
        let roles = self
            .roles
            .iter()
            .map(|n| RangerPrincipal::new(RangerPrincipalType::Role, n));
        users.chain(groups).chain(roles)
    }

    pub fn allowed_accesses(&self) -> impl Iterator<Item = &str> {
        self.accesses
            .iter()
            .filter(|a| a.is_allowed)
            .map(|a| a.access_type.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyItemAccess {
    #[serde(rename = "type")]
    pub access_type: String,
    #[serde(default = "default_true")]
    pub is_allowed: bool,
}

impl PolicyItemAccess {
    pub fn allowed(access_type: impl Into<String>) -> Self {
        Self {
            access_type: access_type.into(),
            is_allowed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangerPrincipalType {
    User,
    Group,
    Role,
}

impl RangerPrincipalType {
    pub fn parse(kind: &str) -> Result<Self, MigrationError> {
        match kind {
            "user" => Ok(RangerPrincipalType::User),
            "group" => Ok(RangerPrincipalType::Group),
            "role" => Ok(RangerPrincipalType::Role),
            other => Err(MigrationError::InvalidConfig(format!(
                "unknown Ranger principal kind `ranger/{other}`"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RangerPrincipalType::User => "user",
            RangerPrincipalType::Group => "group",
            RangerPrincipalType::Role => "role",
        }
    }
}

/// A user, group or role as named inside a Ranger policy item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangerPrincipal {
    #[serde(rename = "type")]
    pub principal_type: RangerPrincipalType,
    pub name: String,
}

impl RangerPrincipal {
    pub fn new(principal_type: RangerPrincipalType, name: impl Into<String>) -> Self {
        Self {
            principal_type,
            name: name.into(),
        }
    }
}

/// Ranger user, one line of `users.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangerUser {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub group_name_list: Vec<String>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub user_role_list: Vec<String>,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub is_visible: Option<i32>,
    #[serde(default)]
    pub sync_source: Option<String>,
}

/// Ranger group, one line of `groups.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangerGroup {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group_type: Option<i32>,
    #[serde(default)]
    pub group_source: Option<i32>,
    #[serde(default)]
    pub is_visible: Option<i32>,
    #[serde(default)]
    pub sync_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMember {
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Ranger role, one line of `roles.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangerRole {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub users: Vec<RoleMember>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub groups: Vec<RoleMember>,
    #[serde(default, deserialize_with = "super::null_as_empty")]
    pub roles: Vec<RoleMember>,
}
