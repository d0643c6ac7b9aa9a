//! The `build` command: wire readers into mappers, merge, write the result.

use std::path::Path;
use std::time::Duration;

use crate::errors::MigrationError;
use crate::mapping::{BindingMapper, HdfsMapper, RangerHdfsPlugin, RangerHivePlugin, RangerMapper};
use crate::merge::PermissionMerge;
use crate::models::{BindingsDocument, PermissionsRuleset, Table, Target};
use crate::readers::{ranger_readers, HdfsPermissionReader, PrincipalReader, TableReader};
use crate::settings::Settings;
use crate::source::RecordSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Yaml,
        }
    }
}

/// Keep a mapper that initialized, drop one that hit a processing error.
fn register<M: BindingMapper + 'static>(
    mappers: &mut Vec<Box<dyn BindingMapper>>,
    kind: &str,
    target: Target,
    built: Result<M, MigrationError>,
) -> Result<(), MigrationError> {
    match built {
        Ok(mapper) => mappers.push(Box::new(mapper)),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            tracing::error!(
                mapper = kind,
                target = target.label(),
                error = %e,
                "Failed to initialize mapper, skipping it"
            );
        }
    }
    Ok(())
}

/// One mapper per configured rule list and target platform.
pub fn plan_mappers(
    settings: &Settings,
    ruleset: &PermissionsRuleset,
) -> Result<Vec<Box<dyn BindingMapper>>, MigrationError> {
    let inputs = &settings.inputs;
    let principals = PrincipalReader::new(&inputs.principals);
    let (services, policies) = ranger_readers(&inputs.ranger_dumper_output);
    let tables = || -> Box<dyn RecordSource<Table>> { Box::new(TableReader::new(&inputs.tables)) };

    let mut mappers: Vec<Box<dyn BindingMapper>> = Vec::new();
    for target in Target::ALL {
        let Some(rules) = ruleset.for_target(target) else {
            tracing::info!(target = target.label(), "No rules for target, skipping it");
            continue;
        };
        let roles = settings.roles.for_target(target);

        if let Some(hive_rules) = &rules.ranger_hive_rules {
            let built = RangerMapper::new(
                RangerHivePlugin::new(),
                target,
                roles.clone(),
                hive_rules,
                tables(),
                &principals,
                &services,
                &policies,
            );
            register(&mut mappers, "Ranger Hive", target, built)?;
        }

        if let Some(ranger_hdfs_rules) = &rules.ranger_hdfs_rules {
            let built = RangerMapper::new(
                RangerHdfsPlugin::new(),
                target,
                roles.clone(),
                ranger_hdfs_rules,
                tables(),
                &principals,
                &services,
                &policies,
            );
            register(&mut mappers, "Ranger HDFS", target, built)?;
        }

        if let Some(hdfs_rules) = &rules.hdfs_rules {
            match inputs.hdfs_dumper_output.as_deref() {
                Some(dump) if dump.is_file() => {
                    let built = HdfsMapper::new(
                        target,
                        roles.clone(),
                        hdfs_rules,
                        tables(),
                        Box::new(HdfsPermissionReader::new(dump)),
                        &principals,
                    );
                    register(&mut mappers, "HDFS", target, built)?;
                }
                dump => {
                    tracing::warn!(
                        target = target.label(),
                        dump = ?dump,
                        "HDFS permission dump not available, skipping HDFS mapper"
                    );
                }
            }
        }
    }
    tracing::info!(mappers = mappers.len(), "Planned permission mappers");
    Ok(mappers)
}

/// Everything that runs on the blocking pool.
pub fn compute(settings: &Settings) -> Result<BindingsDocument, MigrationError> {
    let ruleset = PermissionsRuleset::load(&settings.inputs.permissions_ruleset)?;
    let mappers = plan_mappers(settings, &ruleset)?;
    let bindings = PermissionMerge::new(mappers, &ruleset.roles)?.run()?;
    Ok(BindingsDocument { bindings })
}

/// Run `work` on the blocking pool, giving up after `timeout_seconds`. The
/// worker is detached on timeout and its result discarded.
pub async fn within_deadline<T, F>(timeout_seconds: u64, work: F) -> Result<T, MigrationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, MigrationError> + Send + 'static,
{
    let work = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(Duration::from_secs(timeout_seconds), work).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(MigrationError::Io(join_error.into())),
        Err(_) => {
            tracing::error!(timeout_seconds, "Build exceeded its time budget");
            Err(MigrationError::Timeout(timeout_seconds))
        }
    }
}

/// Compute the merged bindings within the configured time budget.
pub async fn build(settings: Settings) -> Result<BindingsDocument, MigrationError> {
    build_with(settings, compute).await
}

/// Like [`build`], with a custom computation over the settings.
pub async fn build_with<F>(settings: Settings, compute: F) -> Result<BindingsDocument, MigrationError>
where
    F: FnOnce(&Settings) -> Result<BindingsDocument, MigrationError> + Send + 'static,
{
    within_deadline(settings.run.timeout_seconds, move || compute(&settings)).await
}

pub fn write_bindings(path: &Path, document: &BindingsDocument) -> Result<(), MigrationError> {
    let contents = match OutputFormat::for_path(path) {
        OutputFormat::Json => serde_json::to_string_pretty(document)?,
        OutputFormat::Yaml => serde_yaml::to_string(document)?,
    };
    std::fs::write(path, contents).map_err(|source| MigrationError::WriteError {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        bindings = document.bindings.len(),
        "Wrote permission bindings"
    );
    Ok(())
}

/// Build and write. Nothing is written unless the build succeeds.
pub async fn run(settings: Settings) -> Result<BindingsDocument, MigrationError> {
    run_with(settings, compute).await
}

pub async fn run_with<F>(settings: Settings, compute: F) -> Result<BindingsDocument, MigrationError>
where
    F: FnOnce(&Settings) -> Result<BindingsDocument, MigrationError> + Send + 'static,
{
    let output = settings.output.permissions.clone();
    let document = build_with(settings, compute).await?;
    write_bindings(&output, &document)?;
    Ok(document)
}
