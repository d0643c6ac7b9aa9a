use permissions_migration::models::{
    HdfsPermission, Policy, PolicyItem, PolicyItemAccess, PolicyResource, Principal, PrincipalType,
    Service, Table,
};
use std::collections::BTreeMap;

/// Builder for test tables, named `project.dataset.table` like the translation documents
pub struct TableBuilder {
    project: String,
    schema: String,
    name: String,
    hdfs_path: Option<String>,
    gcs_path: Option<String>,
    bq: bool,
}

impl TableBuilder {
    pub fn new(schema: &str, name: &str) -> Self {
        Self {
            project: "proj".to_string(),
            schema: schema.to_string(),
            name: name.to_string(),
            hdfs_path: None,
            gcs_path: None,
            bq: true,
        }
    }

    pub fn hdfs_path(mut self, path: &str) -> Self {
        self.hdfs_path = Some(path.to_string());
        self
    }

    pub fn gcs_path(mut self, path: &str) -> Self {
        self.gcs_path = Some(path.to_string());
        self
    }

    pub fn without_bq(mut self) -> Self {
        self.bq = false;
        self
    }

    pub fn build(self) -> Table {
        let hdfs_path = self
            .hdfs_path
            .unwrap_or_else(|| format!("/data/{}/{}", self.schema, self.name));
        let bq_path = self
            .bq
            .then(|| format!("{}.{}.{}", self.project, self.schema, self.name));
        Table::new(self.name, self.schema, hdfs_path, self.gcs_path, bq_path)
    }
}

/// Builder for principal mapping entries
pub struct PrincipalBuilder {
    principal_type: PrincipalType,
    email: String,
    sources: Vec<(String, String)>,
    skip: bool,
}

impl PrincipalBuilder {
    pub fn user(email: &str) -> Self {
        Self::new(PrincipalType::User, email)
    }

    pub fn group(email: &str) -> Self {
        Self::new(PrincipalType::Group, email)
    }

    pub fn new(principal_type: PrincipalType, email: &str) -> Self {
        Self {
            principal_type,
            email: email.to_string(),
            sources: Vec::new(),
            skip: false,
        }
    }

    /// `key` is `system/kind`, e.g. `ranger/group`
    pub fn source(mut self, key: &str, name: &str) -> Self {
        self.sources.push((key.to_string(), name.to_string()));
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn build(self) -> Principal {
        let sources: Vec<(&str, &str)> = self
            .sources
            .iter()
            .map(|(k, n)| (k.as_str(), n.as_str()))
            .collect();
        if self.skip {
            Principal::skipped(&sources)
        } else {
            Principal::mapped(self.principal_type, self.email, &sources)
        }
    }
}

/// Builder for Ranger policies with a single allow item
pub struct PolicyBuilder {
    name: String,
    service: String,
    service_type: String,
    resources: BTreeMap<String, PolicyResource>,
    item: PolicyItem,
    enabled: bool,
}

impl PolicyBuilder {
    pub fn hive(name: &str) -> Self {
        Self::new(name, "cm_hive", "hive")
    }

    pub fn hdfs(name: &str) -> Self {
        Self::new(name, "cm_hdfs", "hdfs")
    }

    fn new(name: &str, service: &str, service_type: &str) -> Self {
        Self {
            name: name.to_string(),
            service: service.to_string(),
            service_type: service_type.to_string(),
            resources: BTreeMap::new(),
            item: PolicyItem::default(),
            enabled: true,
        }
    }

    pub fn resource(mut self, name: &str, values: &[&str], recursive: bool) -> Self {
        self.resources.insert(
            name.to_string(),
            PolicyResource {
                values: values.iter().map(|v| v.to_string()).collect(),
                is_recursive: recursive,
                ..Default::default()
            },
        );
        self
    }

    pub fn allow(mut self, accesses: &[&str]) -> Self {
        self.item
            .accesses
            .extend(accesses.iter().map(|a| PolicyItemAccess::allowed(*a)));
        self
    }

    pub fn user(mut self, name: &str) -> Self {
        self.item.users.push(name.to_string());
        self
    }

    pub fn group(mut self, name: &str) -> Self {
        self.item.groups.push(name.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn build(self) -> Policy {
        let mut policy: Policy = serde_json::from_value(serde_json::json!({
            "name": self.name,
            "service": self.service,
            "serviceType": self.service_type,
            "policyType": 0,
            "isEnabled": self.enabled,
        }))
        .expect("Failed to build test policy");
        policy.resources = Some(self.resources);
        policy.policy_items = vec![self.item];
        policy
    }
}

pub fn hive_service() -> Service {
    serde_json::from_value(serde_json::json!({"name": "cm_hive", "type": "hive"}))
        .expect("Failed to build test service")
}

pub fn hdfs_service() -> Service {
    serde_json::from_value(serde_json::json!({"name": "cm_hdfs", "type": "hdfs"}))
        .expect("Failed to build test service")
}

pub fn hdfs_permission(path: &str, owner: &str, group: &str, mode: &str) -> HdfsPermission {
    HdfsPermission::new(path, owner, group, mode)
}
