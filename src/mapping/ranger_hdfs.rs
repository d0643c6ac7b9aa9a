use crate::errors::MigrationError;
use crate::mapping::path_pattern::RangerPathPattern;
use crate::mapping::ranger::{access_from_vocabulary, RangerPlugin};
use crate::models::{Access, Policy, PolicyItem, Table};

/// HDFS service policies: `path` resources matched against the table location.
#[derive(Debug, Default)]
pub struct RangerHdfsPlugin {
    /// Indexed like the prepared policies. `None` never matches.
    patterns: Vec<Option<Vec<RangerPathPattern>>>,
}

impl RangerHdfsPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RangerPlugin for RangerHdfsPlugin {
    fn plugin_name(&self) -> &'static str {
        "HDFS"
    }

    fn service_type(&self) -> &'static str {
        "hdfs"
    }

    fn prepare(&mut self, policies: &[Policy]) -> Result<(), MigrationError> {
        let mut patterns = Vec::with_capacity(policies.len());
        for policy in policies {
            let Some(path) = policy.resource("path") else {
                tracing::warn!(policy = %policy.name, "HDFS policy has no path resource, it will never match");
                patterns.push(None);
                continue;
            };
            let compiled = path
                .values
                .iter()
                .map(|value| RangerPathPattern::compile(value, path.is_recursive))
                .collect::<Result<Vec<_>, _>>()?;
            patterns.push(Some(compiled));
        }
        self.patterns = patterns;
        Ok(())
    }

    fn policy_matches_table(&self, index: usize, _policy: &Policy, _table: &Table, fs_path: &str) -> bool {
        match self.patterns.get(index) {
            Some(Some(patterns)) => patterns.iter().any(|p| p.matches(fs_path)),
            _ => false,
        }
    }

    fn access_for(&self, item: &PolicyItem) -> Option<Access> {
        access_from_vocabulary(item, &["write"], &["read"])
    }
}
