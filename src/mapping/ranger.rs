use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::errors::MigrationError;
use crate::mapping::{BindingMapper, CorrelationContext, MapResult, RuleSetMapper};
use crate::models::{
    Access, IamBinding, Policy, PolicyItem, Principal, PrincipalIndex, RangerPrincipal,
    RangerPrincipalType, Rule, Service, Table, Target, TargetRoles,
};
use crate::source::{RecordSource, RecordSourceExt};

pub const RANGER_SOURCE: &str = "ranger";
pub const RANGER_DEFAULT_PRIORITY: i32 = 0;

/// What differs between Ranger service types.
pub trait RangerPlugin: Send + Sync {
    /// Human-readable name, e.g. `Hive`.
    fn plugin_name(&self) -> &'static str;

    /// Ranger service type handled, e.g. `hive`.
    fn service_type(&self) -> &'static str;

    /// Called once with the policies the mapper will use, in order.
    fn prepare(&mut self, _policies: &[Policy]) -> Result<(), MigrationError> {
        Ok(())
    }

    /// Whether the policy at `index` (as passed to `prepare`) covers `table`.
    fn policy_matches_table(&self, index: usize, policy: &Policy, table: &Table, fs_path: &str) -> bool;

    fn access_for(&self, item: &PolicyItem) -> Option<Access>;
}

/// Write access wins over read access.
pub(crate) fn access_from_vocabulary(item: &PolicyItem, write: &[&str], read: &[&str]) -> Option<Access> {
    let allowed: HashSet<&str> = item.allowed_accesses().collect();
    if write.iter().any(|a| allowed.contains(a)) {
        Some(Access::Write)
    } else if read.iter().any(|a| allowed.contains(a)) {
        Some(Access::Read)
    } else {
        None
    }
}

/// A table with its location on the target platform.
struct TableTarget {
    table: Table,
    fs_path: String,
    resource_path: String,
}

type Candidates<'a> = Box<dyn Iterator<Item = Result<Option<CorrelationContext>, MigrationError>> + 'a>;

/// Crosses tables with the Ranger policies of one service type.
pub struct RangerMapper<P> {
    plugin: P,
    target: Target,
    roles: TargetRoles,
    rules: RuleSetMapper,
    tables: Box<dyn RecordSource<Table>>,
    principals: PrincipalIndex<RangerPrincipal>,
    policies: Vec<Policy>,
}

impl<P: RangerPlugin> RangerMapper<P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mut plugin: P,
        target: Target,
        roles: TargetRoles,
        rules: &[Rule],
        tables: Box<dyn RecordSource<Table>>,
        principals: &dyn RecordSource<Principal>,
        services: &dyn RecordSource<Service>,
        policies: &dyn RecordSource<Policy>,
    ) -> Result<Self, MigrationError> {
        let name = format!("Ranger {} to {}", plugin.plugin_name(), target.label());
        let rules = RuleSetMapper::new(RANGER_SOURCE, name, rules)?;

        let principals = principals.process(|records| {
            PrincipalIndex::build(records, RANGER_SOURCE, |kind, name| {
                Ok(RangerPrincipal::new(RangerPrincipalType::parse(kind)?, name))
            })
        })?;

        let service_type = plugin.service_type();
        let service_names: HashSet<String> = services.process(|records| {
            let mut names = HashSet::new();
            for service in records {
                let service = service?;
                if service.service_type == service_type {
                    names.insert(service.name);
                }
            }
            Ok(names)
        })?;

        let policies: Vec<Policy> = policies.process(|records| {
            let mut kept = Vec::new();
            for policy in records {
                let policy = policy?;
                if !service_names.contains(&policy.service) {
                    continue;
                }
                if !policy.is_enabled {
                    tracing::debug!(policy = %policy.name, "Skipping disabled Ranger policy");
                    continue;
                }
                kept.push(policy);
            }
            Ok(kept)
        })?;

        plugin.prepare(&policies)?;
        tracing::info!(
            mapper = %rules.name(),
            services = service_names.len(),
            policies = policies.len(),
            principals = principals.len(),
            "Initialized Ranger mapper"
        );

        Ok(Self {
            plugin,
            target,
            roles,
            rules,
            tables,
            principals,
            policies,
        })
    }

    fn table_candidates<'a>(
        &'a self,
        table: Result<Table, MigrationError>,
        validated: &'a RefCell<HashSet<usize>>,
    ) -> Candidates<'a> {
        let table = match table {
            Ok(table) => table,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        let Some(resource_path) = self.target.resource_path(&table).map(str::to_string) else {
            tracing::debug!(
                table = %table.name,
                target = self.target.label(),
                "Table has no location on target, skipping"
            );
            return Box::new(std::iter::empty());
        };
        let fs_path = match table.fs_path() {
            Ok(fs_path) => fs_path,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        let target = Rc::new(TableTarget {
            fs_path,
            table,
            resource_path,
        });

        let matching = {
            let target = Rc::clone(&target);
            self.policies
                .iter()
                .enumerate()
                .filter(move |(index, policy)| {
                    self.plugin
                        .policy_matches_table(*index, policy, &target.table, &target.fs_path)
                })
        };
        Box::new(matching.flat_map(move |(index, policy)| {
            self.validate_once(index, policy, validated);
            let target = Rc::clone(&target);
            policy.policy_items.iter().flat_map(move |item| {
                let target = Rc::clone(&target);
                item.principals()
                    .map(move |principal| self.correlate(&target, policy, item, principal))
            })
        }))
    }

    /// Warn about features the target cannot express, once per policy.
    fn validate_once(&self, index: usize, policy: &Policy, validated: &RefCell<HashSet<usize>>) {
        if !validated.borrow_mut().insert(index) {
            return;
        }
        for feature in policy.unsupported_features() {
            tracing::warn!(
                plugin = self.plugin.plugin_name(),
                policy = %policy.name,
                feature,
                "Ranger policy uses a feature with no IAM equivalent, ignoring it"
            );
        }
    }

    fn correlate(
        &self,
        target: &TableTarget,
        policy: &Policy,
        item: &PolicyItem,
        source_principal: RangerPrincipal,
    ) -> Result<Option<CorrelationContext>, MigrationError> {
        let Some(principal) = self.principals.get(&source_principal) else {
            return Err(MigrationError::DanglingPrincipal {
                plugin: self.plugin.plugin_name().to_string(),
                policy: policy.name.clone(),
                kind: source_principal.principal_type.as_str().to_string(),
                name: source_principal.name,
            });
        };
        if principal.is_skipped() {
            tracing::warn!(
                policy = %policy.name,
                principal = %source_principal.name,
                "Skipping principal marked as skip"
            );
            return Ok(None);
        }
        let Some(access) = self.plugin.access_for(item) else {
            tracing::warn!(
                policy = %policy.name,
                principal = %source_principal.name,
                accesses = ?item.allowed_accesses().collect::<Vec<_>>(),
                "No IAM role for Ranger accesses, skipping"
            );
            return Ok(None);
        };
        let Some(identity) = principal.target_identity() else {
            tracing::warn!(
                policy = %policy.name,
                principal = %source_principal.name,
                "Principal has no target type or email address, skipping"
            );
            return Ok(None);
        };
        let binding = IamBinding::new(
            self.target.resource_type(),
            target.resource_path.as_str(),
            identity,
            self.roles.role(access),
            RANGER_DEFAULT_PRIORITY,
        );
        CorrelationContext::new(
            RANGER_SOURCE,
            &target.table,
            principal,
            &source_principal,
            policy,
            binding,
        )
        .map(Some)
    }
}

impl<P: RangerPlugin> BindingMapper for RangerMapper<P> {
    fn name(&self) -> &str {
        self.rules.name()
    }

    fn run(&self) -> Result<Vec<MapResult>, MigrationError> {
        let validated = RefCell::new(HashSet::new());
        self.tables.process(|tables| {
            let contexts = tables
                .flat_map(|table| self.table_candidates(table, &validated))
                .filter_map(Result::transpose);
            self.rules.map_all(contexts)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PolicyItemAccess;

    fn item(accesses: &[(&str, bool)]) -> PolicyItem {
        PolicyItem {
            accesses: accesses
                .iter()
                .map(|(t, allowed)| PolicyItemAccess {
                    access_type: t.to_string(),
                    is_allowed: *allowed,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_write_vocabulary_checked_first() {
        let both = item(&[("read", true), ("write", true)]);
        assert_eq!(access_from_vocabulary(&both, &["write"], &["read"]), Some(Access::Write));
    }

    #[test]
    fn test_disallowed_accesses_ignored() {
        let denied_write = item(&[("read", true), ("write", false)]);
        assert_eq!(
            access_from_vocabulary(&denied_write, &["write"], &["read"]),
            Some(Access::Read)
        );
        let nothing = item(&[("execute", true)]);
        assert_eq!(access_from_vocabulary(&nothing, &["write"], &["read"]), None);
    }
}
