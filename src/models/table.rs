use serde::{Deserialize, Serialize};

use crate::errors::MigrationError;

/// A migrated table: where it lived on the cluster and where it lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub schema_name: String,
    /// Source location, usually an `hdfs://` URI.
    pub hdfs_path: String,
    pub gcs_path: Option<String>,
    /// Fully-qualified BigQuery table id, `project.dataset.table`.
    pub bq_path: Option<String>,
}

/// On-disk table translation document.
#[derive(Debug, Clone, Deserialize)]
pub struct TableTranslation {
    pub target_name: String,
    #[serde(default)]
    pub source_locations: Vec<String>,
    #[serde(default)]
    pub target_locations: Vec<String>,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        schema_name: impl Into<String>,
        hdfs_path: impl Into<String>,
        gcs_path: Option<String>,
        bq_path: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema_name: schema_name.into(),
            hdfs_path: hdfs_path.into(),
            gcs_path,
            bq_path,
        }
    }

    pub fn from_translation(doc: TableTranslation) -> Result<Self, MigrationError> {
        let mut parts = doc.target_name.rsplit('.');
        let (Some(name), Some(dataset)) = (parts.next(), parts.next()) else {
            return Err(MigrationError::parse(
                doc.target_name.as_str(),
                "target name is not of the form project.dataset.table",
            ));
        };
        let Some(hdfs_path) = doc.source_locations.first() else {
            return Err(MigrationError::parse(
                doc.target_name.as_str(),
                "table has no source location",
            ));
        };
        Ok(Self::new(
            name,
            dataset,
            hdfs_path.clone(),
            doc.target_locations.first().cloned(),
            Some(doc.target_name.clone()),
        ))
    }

    /// Decoded path component of the source location, comparable with the
    /// paths in permission dumps. Plain paths are returned as-is.
    pub fn fs_path(&self) -> Result<String, MigrationError> {
        let Ok(url) = url::Url::parse(&self.hdfs_path) else {
            return Ok(self.hdfs_path.clone());
        };
        urlencoding::decode(url.path())
            .map(|path| path.into_owned())
            .map_err(|e| MigrationError::parse(self.hdfs_path.as_str(), e))
    }
}
