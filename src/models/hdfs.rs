use serde::{Deserialize, Serialize};

use crate::errors::MigrationError;

/// Name used for the "other" permission class, which has no real identity.
pub const HDFS_OTHER_NAME: &str = "other";

/// One row of the HDFS permission dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HdfsPermission {
    #[serde(alias = "Path")]
    pub path: String,
    #[serde(default, alias = "FileType")]
    pub file_type: Option<String>,
    #[serde(default, alias = "FileSize")]
    pub file_size: Option<i64>,
    #[serde(alias = "Owner")]
    pub owner: String,
    #[serde(alias = "Group")]
    pub group: String,
    /// POSIX mode string such as `rwxr-x---`
    #[serde(alias = "Permission")]
    pub permission: String,
    #[serde(default, alias = "ModificationTime")]
    pub modification_time: Option<String>,
    #[serde(default, alias = "FileCount")]
    pub file_count: Option<i64>,
    #[serde(default, alias = "DirCount")]
    pub dir_count: Option<i64>,
    #[serde(default, alias = "StoragePolicy")]
    pub storage_policy: Option<String>,
}

impl HdfsPermission {
    pub fn new(
        path: impl Into<String>,
        owner: impl Into<String>,
        group: impl Into<String>,
        permission: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            file_type: Some("D".to_string()),
            file_size: None,
            owner: owner.into(),
            group: group.into(),
            permission: permission.into(),
            modification_time: None,
            file_count: None,
            dir_count: None,
            storage_policy: None,
        }
    }

    /// The three permission characters that apply to `class`.
    pub fn class_bits(&self, class: HdfsPrincipalType) -> Option<&str> {
        let start = match class {
            HdfsPrincipalType::User => 0,
            HdfsPrincipalType::Group => 3,
            HdfsPrincipalType::Other => 6,
        };
        self.permission.get(start..start + 3)
    }

    /// Identity holding each permission class on this path.
    pub fn principal_for(&self, class: HdfsPrincipalType) -> HdfsPrincipal {
        let name = match class {
            HdfsPrincipalType::User => self.owner.as_str(),
            HdfsPrincipalType::Group => self.group.as_str(),
            HdfsPrincipalType::Other => HDFS_OTHER_NAME,
        };
        HdfsPrincipal::new(class, name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HdfsPrincipalType {
    User,
    Group,
    Other,
}

impl HdfsPrincipalType {
    pub const ALL: [HdfsPrincipalType; 3] = [
        HdfsPrincipalType::User,
        HdfsPrincipalType::Group,
        HdfsPrincipalType::Other,
    ];

    pub fn parse(kind: &str) -> Result<Self, MigrationError> {
        match kind {
            "user" => Ok(HdfsPrincipalType::User),
            "group" => Ok(HdfsPrincipalType::Group),
            "other" => Ok(HdfsPrincipalType::Other),
            other => Err(MigrationError::InvalidConfig(format!(
                "unknown HDFS principal kind `hdfs/{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HdfsPrincipal {
    #[serde(rename = "type")]
    pub principal_type: HdfsPrincipalType,
    pub name: String,
}

impl HdfsPrincipal {
    pub fn new(principal_type: HdfsPrincipalType, name: impl Into<String>) -> Self {
        Self {
            principal_type,
            name: name.into(),
        }
    }
}
