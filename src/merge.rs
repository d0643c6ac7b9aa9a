//! Conflict resolution across every mapper's candidate bindings.
//!
//! Per resource only the highest priority tier survives. Within it a
//! principal keeps each role once, and a role already granted by another
//! role the principal holds is dropped. Surviving roles are then renamed
//! to their target roles.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::MigrationError;
use crate::mapping::BindingMapper;
use crate::models::{IamBinding, ResourceType, RoleMapping};
use crate::rules::Action;

/// role -> roles it grants
pub type RoleInclusions = BTreeMap<String, BTreeSet<String>>;

/// Transitive closure of the inclusion relation, by naive fixed point.
/// Closing an already closed relation returns it unchanged.
pub fn close_role_inclusions(direct: &RoleInclusions) -> RoleInclusions {
    let mut closed = direct.clone();
    loop {
        let mut changed = false;
        let roles: Vec<String> = closed.keys().cloned().collect();
        for role in roles {
            let Some(included) = closed.get(&role) else {
                continue;
            };
            let transitive: Vec<String> = included
                .iter()
                .filter_map(|inner| closed.get(inner))
                .flatten()
                .filter(|r| !included.contains(*r))
                .cloned()
                .collect();
            if transitive.is_empty() {
                continue;
            }
            changed = true;
            if let Some(entry) = closed.get_mut(&role) {
                entry.extend(transitive);
            }
        }
        if !changed {
            return closed;
        }
    }
}

/// Merge provenance of a duplicate candidate into the kept binding.
fn absorb(kept: &mut IamBinding, duplicate: IamBinding) {
    for (system, records) in duplicate.source_permissions {
        kept.source_permissions.entry(system).or_default().extend(records);
    }
    for (system, records) in duplicate.source_principals {
        kept.source_principals.entry(system).or_default().extend(records);
    }
}

pub struct PermissionMerge {
    mappers: Vec<Box<dyn BindingMapper>>,
    inclusions: RoleInclusions,
    renames: BTreeMap<String, Vec<String>>,
}

impl PermissionMerge {
    pub fn new(
        mappers: Vec<Box<dyn BindingMapper>>,
        roles: &BTreeMap<String, RoleMapping>,
    ) -> Result<Self, MigrationError> {
        if mappers.is_empty() {
            return Err(MigrationError::InvalidConfig(
                "no permission mappers configured".to_string(),
            ));
        }
        let direct: RoleInclusions = roles
            .iter()
            .map(|(role, mapping)| (role.clone(), mapping.includes.iter().cloned().collect()))
            .collect();
        let renames = roles
            .iter()
            .filter(|(_, mapping)| !mapping.rename_to.is_empty())
            .map(|(role, mapping)| (role.clone(), mapping.rename_to.clone()))
            .collect();
        Ok(Self {
            mappers,
            inclusions: close_role_inclusions(&direct),
            renames,
        })
    }

    /// Run every mapper and resolve their output. Only fatal errors abort.
    pub fn run(&self) -> Result<Vec<IamBinding>, MigrationError> {
        let mut candidates = Vec::new();
        for mapper in &self.mappers {
            match mapper.run() {
                Ok(results) => candidates.extend(
                    results
                        .into_iter()
                        .filter(|r| r.action == Action::Map)
                        .map(|r| r.binding),
                ),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(mapper = %mapper.name(), error = %e, "Mapper failed, dropping its bindings");
                }
            }
        }
        let candidate_count = candidates.len();
        let bindings = self.resolve(candidates);
        tracing::info!(
            candidates = candidate_count,
            bindings = bindings.len(),
            "Merged permission bindings"
        );
        Ok(bindings)
    }

    /// Sorted by resource type, resource path, principal, then role.
    pub fn resolve(&self, candidates: Vec<IamBinding>) -> Vec<IamBinding> {
        let mut by_resource: BTreeMap<(ResourceType, String), Vec<IamBinding>> = BTreeMap::new();
        for binding in candidates {
            by_resource.entry(binding.resource_key()).or_default().push(binding);
        }

        let mut output: BTreeMap<(ResourceType, String, String, String), IamBinding> = BTreeMap::new();
        for ((_, resource_path), bindings) in by_resource {
            let Some(top) = bindings.iter().map(|b| b.priority).max() else {
                continue;
            };
            let mut by_principal: BTreeMap<String, BTreeMap<String, IamBinding>> = BTreeMap::new();
            for binding in bindings {
                if binding.priority < top {
                    tracing::debug!(
                        resource = %resource_path,
                        principal = %binding.principal,
                        role = %binding.role,
                        priority = binding.priority,
                        "Dropping lower priority binding"
                    );
                    continue;
                }
                let roles = by_principal.entry(binding.principal.clone()).or_default();
                match roles.entry(binding.role.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(binding);
                    }
                    Entry::Occupied(mut slot) => absorb(slot.get_mut(), binding),
                }
            }

            for roles in by_principal.into_values() {
                let held: BTreeSet<&str> = roles.keys().map(String::as_str).collect();
                for (role, binding) in &roles {
                    if let Some(by) = self.dominated_by(role, &held) {
                        tracing::debug!(
                            resource = %resource_path,
                            principal = %binding.principal,
                            role = %role,
                            included_in = %by,
                            "Dropping role included in another granted role"
                        );
                        continue;
                    }
                    for renamed in self.rename(binding) {
                        let key = (
                            renamed.resource_type,
                            renamed.resource_path.clone(),
                            renamed.principal.clone(),
                            renamed.role.clone(),
                        );
                        match output.entry(key) {
                            Entry::Vacant(slot) => {
                                slot.insert(renamed);
                            }
                            Entry::Occupied(mut slot) => absorb(slot.get_mut(), renamed),
                        }
                    }
                }
            }
        }
        output.into_values().collect()
    }

    /// Another held role that grants `role`, making `role` redundant.
    ///
    /// Roles that include each other (directly or through a cycle) do not
    /// dominate each other, so a principal holding both keeps both bindings
    /// rather than losing the pair.
    fn dominated_by<'a>(&self, role: &str, held: &BTreeSet<&'a str>) -> Option<&'a str> {
        held.iter().copied().find(|other| {
            *other != role
                && self.includes(other, role)
                && !self.includes(role, other)
        })
    }

    fn includes(&self, role: &str, other: &str) -> bool {
        self.inclusions
            .get(role)
            .is_some_and(|included| included.contains(other))
    }

    fn rename(&self, binding: &IamBinding) -> Vec<IamBinding> {
        match self.renames.get(&binding.role) {
            Some(targets) => targets.iter().map(|role| binding.with_role(role.as_str())).collect(),
            None => vec![binding.clone()],
        }
    }
}
