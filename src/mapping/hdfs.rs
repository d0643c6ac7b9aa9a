use crate::errors::MigrationError;
use crate::mapping::merge_join::merge_join;
use crate::mapping::{BindingMapper, CorrelationContext, MapResult, RuleSetMapper};
use crate::models::{
    Access, HdfsPermission, HdfsPrincipal, HdfsPrincipalType, IamBinding, Principal,
    PrincipalIndex, Rule, Table, Target, TargetRoles,
};
use crate::source::{RecordSource, RecordSourceExt};

pub const HDFS_SOURCE: &str = "hdfs";
pub const HDFS_DEFAULT_PRIORITY: i32 = 10;

const MODE_LENGTH: usize = 9;

/// Write if the class may write, read if it may only read.
fn decode_access(bits: &str) -> Option<Access> {
    match bits.as_bytes() {
        [_, b'w', _] => Some(Access::Write),
        [b'r', _, _] => Some(Access::Read),
        _ => None,
    }
}

/// Joins tables with the HDFS permission dump on the table location.
pub struct HdfsMapper {
    target: Target,
    roles: TargetRoles,
    rules: RuleSetMapper,
    tables: Box<dyn RecordSource<Table>>,
    permissions: Box<dyn RecordSource<HdfsPermission>>,
    principals: PrincipalIndex<HdfsPrincipal>,
}

impl HdfsMapper {
    pub fn new(
        target: Target,
        roles: TargetRoles,
        rules: &[Rule],
        tables: Box<dyn RecordSource<Table>>,
        permissions: Box<dyn RecordSource<HdfsPermission>>,
        principals: &dyn RecordSource<Principal>,
    ) -> Result<Self, MigrationError> {
        let rules = RuleSetMapper::new(HDFS_SOURCE, format!("HDFS to {}", target.label()), rules)?;
        let principals = principals.process(|records| {
            PrincipalIndex::build(records, HDFS_SOURCE, |kind, name| {
                Ok(HdfsPrincipal::new(HdfsPrincipalType::parse(kind)?, name))
            })
        })?;
        tracing::info!(mapper = %rules.name(), principals = principals.len(), "Initialized HDFS mapper");
        Ok(Self {
            target,
            roles,
            rules,
            tables,
            permissions,
            principals,
        })
    }

    fn has_full_mode(permission: &HdfsPermission) -> bool {
        if permission.permission.len() >= MODE_LENGTH {
            return true;
        }
        tracing::warn!(
            path = %permission.path,
            permission = %permission.permission,
            "Malformed HDFS permission string, skipping"
        );
        false
    }

    fn correlate(
        &self,
        table: &Table,
        permission: &HdfsPermission,
        class: HdfsPrincipalType,
    ) -> Result<Option<CorrelationContext>, MigrationError> {
        let Some(access) = permission.class_bits(class).and_then(decode_access) else {
            return Ok(None);
        };
        let Some(resource_path) = self.target.resource_path(table) else {
            tracing::debug!(
                table = %table.name,
                target = self.target.label(),
                "Table has no location on target, skipping"
            );
            return Ok(None);
        };
        let source_principal = permission.principal_for(class);
        let Some(principal) = self.principals.get(&source_principal) else {
            tracing::warn!(
                path = %permission.path,
                principal = ?source_principal,
                "No principal mapping for HDFS identity, skipping"
            );
            return Ok(None);
        };
        if principal.is_skipped() {
            tracing::warn!(
                path = %permission.path,
                principal = %source_principal.name,
                "Skipping principal marked as skip"
            );
            return Ok(None);
        }
        let Some(identity) = principal.target_identity() else {
            tracing::warn!(
                path = %permission.path,
                principal = %source_principal.name,
                "Principal has no target type or email address, skipping"
            );
            return Ok(None);
        };
        let binding = IamBinding::new(
            self.target.resource_type(),
            resource_path,
            identity,
            self.roles.role(access),
            HDFS_DEFAULT_PRIORITY,
        );
        CorrelationContext::new(HDFS_SOURCE, table, principal, &source_principal, permission, binding)
            .map(Some)
    }
}

impl BindingMapper for HdfsMapper {
    fn name(&self) -> &str {
        self.rules.name()
    }

    fn run(&self) -> Result<Vec<MapResult>, MigrationError> {
        let mut tables: Vec<(String, Table)> = self.tables.process(|records| {
            records
                .map(|table| table.and_then(|t| Ok((t.fs_path()?, t))))
                .collect()
        })?;
        tables.sort_by(|a, b| a.0.cmp(&b.0));

        let mut permissions: Vec<HdfsPermission> =
            self.permissions.process(|records| records.collect())?;
        permissions.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(
            tables = tables.len(),
            permissions = permissions.len(),
            "Joining tables with HDFS permissions"
        );

        let contexts = merge_join(&tables, &permissions, |t, p| t.0.cmp(&p.path))
            .flat_map(|((_, table), permission)| {
                let classes: &[HdfsPrincipalType] = if Self::has_full_mode(permission) {
                    &HdfsPrincipalType::ALL
                } else {
                    &[]
                };
                classes
                    .iter()
                    .map(move |class| self.correlate(table, permission, *class))
            })
            .filter_map(Result::transpose);
        self.rules.map_all(contexts)
    }
}
