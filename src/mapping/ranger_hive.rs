use crate::errors::MigrationError;
use crate::mapping::ranger::{access_from_vocabulary, RangerPlugin};
use crate::models::ranger::ACCESS_POLICY_TYPE;
use crate::models::{Access, Policy, PolicyItem, PolicyResource, Table};

const SERVICE_TYPE: &str = "hive";

const ANY_NAME: &str = "*";

const WRITE_ACCESSES: &[&str] = &[
    "update", "create", "drop", "alter", "index", "lock", "all", "write", "refresh",
];
const READ_ACCESSES: &[&str] = &["select", "read"];

/// Database and table names of one Hive access policy.
#[derive(Debug)]
struct HiveResources {
    databases: Vec<String>,
    tables: Vec<String>,
}

/// A value grants on `name` when it is `*` or spelled exactly like it.
fn names_match(values: &[String], name: &str) -> bool {
    values.iter().any(|value| value == ANY_NAME || value == name)
}

impl HiveResources {
    fn matches(&self, table: &Table) -> bool {
        names_match(&self.databases, &table.schema_name) && names_match(&self.tables, &table.name)
    }
}

/// Hive service policies: database and table resources.
#[derive(Debug, Default)]
pub struct RangerHivePlugin {
    /// Indexed like the prepared policies. `None` never matches.
    resources: Vec<Option<HiveResources>>,
}

impl RangerHivePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile_policy(policy: &Policy) -> Option<HiveResources> {
        if policy.service_type.as_deref() != Some(SERVICE_TYPE) {
            tracing::warn!(
                policy = %policy.name,
                service_type = ?policy.service_type,
                "Not a Hive service policy, ignoring policy"
            );
            return None;
        }
        if policy.policy_type != Some(ACCESS_POLICY_TYPE) {
            tracing::debug!(
                policy = %policy.name,
                policy_type = ?policy.policy_type,
                "Not an access policy, ignoring policy"
            );
            return None;
        }
        let Some(database) = policy.resource("database") else {
            tracing::debug!(policy = %policy.name, "Hive policy has no database resource");
            return None;
        };
        let any_table = PolicyResource::any();
        let table = policy.resource("table").unwrap_or(&any_table);
        Some(HiveResources {
            databases: database.values.clone(),
            tables: table.values.clone(),
        })
    }
}

impl RangerPlugin for RangerHivePlugin {
    fn plugin_name(&self) -> &'static str {
        "Hive"
    }

    fn service_type(&self) -> &'static str {
        SERVICE_TYPE
    }

    fn prepare(&mut self, policies: &[Policy]) -> Result<(), MigrationError> {
        self.resources = policies.iter().map(Self::compile_policy).collect();
        Ok(())
    }

    fn policy_matches_table(&self, index: usize, _policy: &Policy, table: &Table, _fs_path: &str) -> bool {
        matches!(self.resources.get(index), Some(Some(resources)) if resources.matches(table))
    }

    fn access_for(&self, item: &PolicyItem) -> Option<Access> {
        access_from_vocabulary(item, WRITE_ACCESSES, READ_ACCESSES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PolicyItemAccess;
    use std::collections::BTreeMap;

    fn policy(database: &[&str], table: Option<&[&str]>) -> Policy {
        let mut resources = BTreeMap::new();
        resources.insert(
            "database".to_string(),
            PolicyResource {
                values: database.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        );
        if let Some(table) = table {
            resources.insert(
                "table".to_string(),
                PolicyResource {
                    values: table.iter().map(|s| s.to_string()).collect(),
                    ..Default::default()
                },
            );
        }
        serde_json::from_value(serde_json::json!({
            "name": "p",
            "service": "cm_hive",
            "serviceType": "hive",
            "policyType": 0,
            "resources": resources,
        }))
        .unwrap()
    }

    fn matches(policy: Policy, table: &Table) -> bool {
        let mut plugin = RangerHivePlugin::new();
        plugin.prepare(std::slice::from_ref(&policy)).unwrap();
        plugin.policy_matches_table(0, &policy, table, &table.fs_path().unwrap())
    }

    fn orders() -> Table {
        Table::new("orders", "sales", "/warehouse/sales/orders", None, None)
    }

    #[test]
    fn test_exact_database_and_table() {
        assert!(matches(policy(&["sales"], Some(&["orders"])), &orders()));
        assert!(!matches(policy(&["sales"], Some(&["returns"])), &orders()));
        assert!(!matches(policy(&["hr"], Some(&["orders"])), &orders()));
    }

    #[test]
    fn test_star_and_missing_table_resource() {
        assert!(matches(policy(&["*"], Some(&["*"])), &orders()));
        assert!(matches(policy(&["hr", "sales"], Some(&["returns", "*"])), &orders()));
        assert!(matches(policy(&["sales"], None), &orders()));
    }

    #[test]
    fn test_partial_wildcards_only_match_literally() {
        assert!(!matches(policy(&["s?les"], Some(&["ord*"])), &orders()));
        assert!(!matches(policy(&["sal*"], Some(&["orders"])), &orders()));
        assert!(!matches(policy(&["sales"], Some(&["ord?rs"])), &orders()));

        let literal = Table::new("ord*", "s?les", "/warehouse/odd", None, None);
        assert!(matches(policy(&["s?les"], Some(&["ord*"])), &literal));
    }

    #[test]
    fn test_incompatible_policies_never_match() {
        let mut mask = policy(&["*"], None);
        mask.policy_type = Some(1);
        assert!(!matches(mask, &orders()));

        let mut hdfs = policy(&["*"], None);
        hdfs.service_type = Some("hdfs".into());
        assert!(!matches(hdfs, &orders()));

        let mut bare = policy(&["*"], None);
        bare.resources = None;
        assert!(!matches(bare, &orders()));
    }

    #[test]
    fn test_policy_without_types_never_matches() {
        let mut no_service_type = policy(&["sales"], None);
        no_service_type.service_type = None;
        assert!(!matches(no_service_type, &orders()));

        let mut no_policy_type = policy(&["sales"], None);
        no_policy_type.policy_type = None;
        assert!(!matches(no_policy_type, &orders()));
    }

    #[test]
    fn test_write_vocabulary_precedes_read() {
        let plugin = RangerHivePlugin::new();
        let item = PolicyItem {
            accesses: vec![
                PolicyItemAccess::allowed("select"),
                PolicyItemAccess::allowed("alter"),
            ],
            ..Default::default()
        };
        assert_eq!(plugin.access_for(&item), Some(Access::Write));

        let read_only = PolicyItem {
            accesses: vec![PolicyItemAccess::allowed("select")],
            ..Default::default()
        };
        assert_eq!(plugin.access_for(&read_only), Some(Access::Read));
    }
}
