use serde::{Deserialize, Serialize};

use crate::models::{ResourceType, Table};

/// Cloud platform a mapper writes bindings for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Gcs,
    Bq,
}

impl Target {
    pub const ALL: [Target; 2] = [Target::Gcs, Target::Bq];

    pub fn resource_type(self) -> ResourceType {
        match self {
            Target::Gcs => ResourceType::GcsManagedFolder,
            Target::Bq => ResourceType::BqTable,
        }
    }

    /// Where `table` lives on this platform, if it was migrated there.
    pub fn resource_path(self, table: &Table) -> Option<&str> {
        match self {
            Target::Gcs => table.gcs_path.as_deref(),
            Target::Bq => table.bq_path.as_deref(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Target::Gcs => "GCS",
            Target::Bq => "BigQuery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Role identifiers granted for read and write access on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRoles {
    pub read: String,
    pub write: String,
}

impl TargetRoles {
    pub fn gcs_defaults() -> Self {
        Self {
            read: "roles/storage.objectViewer".to_string(),
            write: "roles/storage.objectUser".to_string(),
        }
    }

    pub fn bq_defaults() -> Self {
        Self {
            read: "roles/bigquery.dataViewer".to_string(),
            write: "roles/bigquery.dataEditor".to_string(),
        }
    }

    pub fn role(&self, access: Access) -> &str {
        match access {
            Access::Read => &self.read,
            Access::Write => &self.write,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_path_per_target() {
        let table = Table::new(
            "t",
            "s",
            "/data/s/t",
            Some("gs://b/s/t".into()),
            Some("proj.s.t".into()),
        );
        assert_eq!(Target::Gcs.resource_path(&table), Some("gs://b/s/t"));
        assert_eq!(Target::Bq.resource_path(&table), Some("proj.s.t"));
        assert_eq!(Target::Bq.resource_type(), ResourceType::BqTable);

        let gcs_only = Table::new("t", "s", "/data/s/t", Some("gs://b/s/t".into()), None);
        assert_eq!(Target::Bq.resource_path(&gcs_only), None);
    }

    #[test]
    fn test_roles() {
        let roles = TargetRoles::gcs_defaults();
        assert_eq!(roles.role(Access::Write), "roles/storage.objectUser");
        assert_eq!(roles.role(Access::Read), "roles/storage.objectViewer");
    }
}
