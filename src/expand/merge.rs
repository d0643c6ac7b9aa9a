use std::collections::{BTreeMap, BTreeSet};

use crate::errors::MigrationError;
use crate::expand::mapper::PrincipalMapper;
use crate::models::{Principal, PrincipalAction, PrincipalType};

type Sources = BTreeMap<String, BTreeSet<String>>;

fn absorb(into: &mut Sources, principal: Principal) {
    for (key, names) in principal.sources {
        into.entry(key).or_default().extend(names);
    }
}

fn flatten(sources: Sources) -> BTreeMap<String, Vec<String>> {
    sources
        .into_iter()
        .map(|(key, names)| (key, names.into_iter().collect()))
        .collect()
}

/// Runs principal mappers and folds their output into one entry per target
/// identity, plus a single entry collecting every skipped source.
pub struct PrincipalMerge {
    mappers: Vec<Box<dyn PrincipalMapper>>,
}

impl PrincipalMerge {
    pub fn new(mappers: Vec<Box<dyn PrincipalMapper>>) -> Result<Self, MigrationError> {
        if mappers.is_empty() {
            return Err(MigrationError::InvalidConfig(
                "the principal ruleset configures no principal mappers".to_string(),
            ));
        }
        Ok(Self { mappers })
    }

    pub fn run(self) -> Result<Vec<Principal>, MigrationError> {
        let mut collected = Vec::new();
        for mapper in &self.mappers {
            match mapper.run() {
                Ok(principals) => collected.extend(principals),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(
                        mapper = %mapper.name(),
                        error = %e,
                        "Principal mapper failed, dropping its output"
                    );
                }
            }
        }
        Ok(Self::resolve(collected))
    }

    /// Mapped entries sorted by (type, email), then the skip entry if any.
    pub fn resolve(principals: Vec<Principal>) -> Vec<Principal> {
        let mut mapped: BTreeMap<(&'static str, String), (PrincipalType, Sources)> = BTreeMap::new();
        let mut skipped = Sources::new();
        for principal in principals {
            match (principal.action, principal.principal_type, principal.email_address.clone()) {
                (PrincipalAction::Map, Some(principal_type), Some(email)) => {
                    let entry = mapped
                        .entry((principal_type.as_str(), email))
                        .or_insert_with(|| (principal_type, Sources::new()));
                    absorb(&mut entry.1, principal);
                }
                _ => absorb(&mut skipped, principal),
            }
        }

        let mut output: Vec<Principal> = mapped
            .into_iter()
            .map(|((_, email), (principal_type, sources))| Principal {
                action: PrincipalAction::Map,
                email_address: Some(email),
                principal_type: Some(principal_type),
                sources: flatten(sources),
            })
            .collect();
        if !skipped.is_empty() {
            output.push(Principal {
                action: PrincipalAction::Skip,
                email_address: None,
                principal_type: None,
                sources: flatten(skipped),
            });
        }
        tracing::info!(principals = output.len(), "Merged principals");
        output
    }
}
