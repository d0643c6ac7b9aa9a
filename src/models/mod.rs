pub mod binding;
pub mod hdfs;
pub mod principal;
pub mod principal_ruleset;
pub mod ranger;
pub mod ruleset;
pub mod table;
pub mod target;

pub use binding::{BindingsDocument, IamBinding, ResourceType};
pub use hdfs::{HdfsPermission, HdfsPrincipal, HdfsPrincipalType};
pub use principal::{
    Principal, PrincipalAction, PrincipalIndex, PrincipalType, PrincipalsDocument, SourceKey,
};
pub use principal_ruleset::{HdfsPrincipalRuleset, PrincipalRuleset, RangerPrincipalRuleset};
pub use ranger::{
    Policy, PolicyItem, PolicyItemAccess, PolicyResource, RangerGroup, RangerPrincipal,
    RangerPrincipalType, RangerRole, RangerUser, RoleMember, Service,
};
pub use ruleset::{PermissionsRuleset, RoleMapping, Rule, RuleMapField, TargetRuleset};
pub use table::{Table, TableTranslation};
pub use target::{Access, Target, TargetRoles};

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Accepts either `key: value` or `key: [value, ...]`.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(OneOrMany::deserialize(deserializer)?.into())
}

pub(crate) fn one_or_many_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, OneOrMany> = BTreeMap::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
}

/// Dumps write `"field": null` for empty lists.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    Str(String),
}

/// YAML rule files sometimes quote booleans (`skip: "true"`).
pub(crate) fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match BoolOrString::deserialize(deserializer)? {
        BoolOrString::Bool(b) => Ok(b),
        BoolOrString::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean, got `{other}`"
            ))),
        },
    }
}
