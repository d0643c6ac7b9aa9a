use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::errors::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalAction {
    Map,
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrincipalType {
    User,
    Group,
    ServiceAccount,
    Domain,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::User => "user",
            PrincipalType::Group => "group",
            PrincipalType::ServiceAccount => "serviceAccount",
            PrincipalType::Domain => "domain",
        }
    }
}

/// A target identity together with the source identities that resolve to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub action: PrincipalAction,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default, rename = "type")]
    pub principal_type: Option<PrincipalType>,
    /// `system/kind` -> source identity names, e.g. `ranger/group: [analysts]`
    #[serde(default, deserialize_with = "super::one_or_many_map")]
    pub sources: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalsDocument {
    pub principals: Vec<Principal>,
}

impl Principal {
    pub fn mapped(
        principal_type: PrincipalType,
        email_address: impl Into<String>,
        sources: &[(&str, &str)],
    ) -> Self {
        Self {
            action: PrincipalAction::Map,
            email_address: Some(email_address.into()),
            principal_type: Some(principal_type),
            sources: group_sources(sources),
        }
    }

    pub fn skipped(sources: &[(&str, &str)]) -> Self {
        Self {
            action: PrincipalAction::Skip,
            email_address: None,
            principal_type: None,
            sources: group_sources(sources),
        }
    }

    /// IAM member string, `type:email`.
    pub fn target_identity(&self) -> Option<String> {
        let principal_type = self.principal_type?;
        let email = self.email_address.as_deref()?;
        Some(format!("{}:{}", principal_type.as_str(), email))
    }

    pub fn is_skipped(&self) -> bool {
        self.action == PrincipalAction::Skip
    }
}

fn group_sources(sources: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, name) in sources {
        grouped.entry(key.to_string()).or_default().push(name.to_string());
    }
    grouped
}

/// Source reference key: "system/kind" e.g. "hdfs/group"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub system: String,
    pub kind: String,
}

impl SourceKey {
    pub fn parse(s: &str) -> Option<Self> {
        let (system, kind) = s.split_once('/')?;
        if system.is_empty() || kind.is_empty() {
            return None;
        }
        Some(Self {
            system: system.to_string(),
            kind: kind.to_string(),
        })
    }
}

/// Read-only lookup from a source-system identity to its target principal.
#[derive(Debug)]
pub struct PrincipalIndex<K> {
    by_source: HashMap<K, Principal>,
}

impl<K: Hash + Eq + std::fmt::Debug> PrincipalIndex<K> {
    /// Index every source of `system` in `principals`. `make_key` turns a
    /// (kind, name) pair into the lookup key and rejects unknown kinds.
    pub fn build<I, F>(principals: I, system: &str, make_key: F) -> Result<Self, MigrationError>
    where
        I: IntoIterator<Item = Result<Principal, MigrationError>>,
        F: Fn(&str, &str) -> Result<K, MigrationError>,
    {
        let mut by_source = HashMap::new();
        for principal in principals {
            let principal = principal?;
            for (raw_key, names) in &principal.sources {
                let Some(source_key) = SourceKey::parse(raw_key) else {
                    tracing::warn!(key = %raw_key, "Ignoring malformed principal source key");
                    continue;
                };
                if source_key.system != system {
                    continue;
                }
                for name in names {
                    let key = make_key(&source_key.kind, name)?;
                    if by_source.contains_key(&key) {
                        return Err(MigrationError::DuplicatePrincipal {
                            key: format!("{raw_key}/{name}"),
                        });
                    }
                    by_source.insert(key, principal.clone());
                }
            }
        }
        tracing::debug!(system, principals = by_source.len(), "Indexed principals");
        Ok(Self { by_source })
    }

    pub fn get(&self, key: &K) -> Option<&Principal> {
        self.by_source.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}
