//! The `expand` command: map source identities to principals and write the
//! principals document that `build` reads.

pub mod mapper;
pub mod merge;

use std::path::Path;

use crate::build::{within_deadline, OutputFormat};
use crate::errors::MigrationError;
use crate::models::hdfs::HDFS_OTHER_NAME;
use crate::models::{
    HdfsPrincipal, HdfsPrincipalType, PrincipalRuleset, PrincipalType, PrincipalsDocument,
    RangerGroup, RangerRole, RangerUser, Rule,
};
use crate::readers::{
    HdfsIdentityReader, RangerGroupReader, RangerRoleReader, RangerUserReader, RANGER_GROUPS_FILE,
    RANGER_ROLES_FILE, RANGER_USERS_FILE,
};
use crate::settings::Settings;
use crate::source::VecSource;

pub use mapper::{IdentityRecord, PrincipalMapper, RulePrincipalMapper};
pub use merge::PrincipalMerge;

fn register<M: PrincipalMapper + 'static>(
    mappers: &mut Vec<Box<dyn PrincipalMapper>>,
    built: Result<M, MigrationError>,
) -> Result<(), MigrationError> {
    match built {
        Ok(mapper) => mappers.push(Box::new(mapper)),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => tracing::error!(error = %e, "Failed to initialize principal mapper, skipping it"),
    }
    Ok(())
}

fn hdfs_mapper(
    dump: &Path,
    kind: HdfsPrincipalType,
    label: &'static str,
    default_type: PrincipalType,
    rules: &[Rule],
) -> Result<RulePrincipalMapper<HdfsPrincipal>, MigrationError> {
    RulePrincipalMapper::new(
        "hdfs",
        label,
        Some(default_type),
        rules,
        Box::new(HdfsIdentityReader::new(dump, kind)),
    )
}

/// One principal mapper per rule list in the ruleset.
pub fn plan_principal_mappers(
    settings: &Settings,
    ruleset: &PrincipalRuleset,
) -> Result<Vec<Box<dyn PrincipalMapper>>, MigrationError> {
    let mut mappers: Vec<Box<dyn PrincipalMapper>> = Vec::new();

    if let Some(hdfs) = &ruleset.hdfs {
        let dump = settings
            .inputs
            .hdfs_dumper_output
            .as_deref()
            .filter(|dump| dump.is_file());
        for (rules, kind, label, default_type) in [
            (&hdfs.user_rules, HdfsPrincipalType::User, "user", PrincipalType::User),
            (&hdfs.group_rules, HdfsPrincipalType::Group, "group", PrincipalType::Group),
        ] {
            let Some(rules) = rules else { continue };
            match dump {
                Some(dump) => {
                    register(&mut mappers, hdfs_mapper(dump, kind, label, default_type, rules))?
                }
                None => tracing::warn!(
                    kind = label,
                    dump = ?settings.inputs.hdfs_dumper_output,
                    "HDFS permission dump not available, skipping HDFS principal mapper"
                ),
            }
        }
        if let Some(rules) = &hdfs.other_rules {
            let other = VecSource::new(vec![HdfsPrincipal::new(
                HdfsPrincipalType::Other,
                HDFS_OTHER_NAME,
            )]);
            let built = RulePrincipalMapper::<HdfsPrincipal>::new(
                "hdfs",
                "other",
                Some(PrincipalType::Domain),
                rules,
                Box::new(other),
            );
            register(&mut mappers, built)?;
        }
    }

    if let Some(ranger) = &ruleset.ranger {
        let dump = &settings.inputs.ranger_dumper_output;
        if let Some(rules) = &ranger.user_rules {
            let built = RulePrincipalMapper::<RangerUser>::new(
                "ranger",
                "user",
                Some(PrincipalType::User),
                rules,
                Box::new(RangerUserReader::new(dump.join(RANGER_USERS_FILE))),
            );
            register(&mut mappers, built)?;
        }
        if let Some(rules) = &ranger.group_rules {
            let built = RulePrincipalMapper::<RangerGroup>::new(
                "ranger",
                "group",
                Some(PrincipalType::Group),
                rules,
                Box::new(RangerGroupReader::new(dump.join(RANGER_GROUPS_FILE))),
            );
            register(&mut mappers, built)?;
        }
        if let Some(rules) = &ranger.role_rules {
            let built = RulePrincipalMapper::<RangerRole>::new(
                "ranger",
                "role",
                Some(PrincipalType::Group),
                rules,
                Box::new(RangerRoleReader::new(dump.join(RANGER_ROLES_FILE))),
            );
            register(&mut mappers, built)?;
        }
    }

    tracing::info!(mappers = mappers.len(), "Planned principal mappers");
    Ok(mappers)
}

pub fn compute(settings: &Settings) -> Result<PrincipalsDocument, MigrationError> {
    let ruleset = PrincipalRuleset::load(&settings.inputs.principal_ruleset)?;
    let mappers = plan_principal_mappers(settings, &ruleset)?;
    let principals = PrincipalMerge::new(mappers)?.run()?;
    Ok(PrincipalsDocument { principals })
}

pub fn write_principals(path: &Path, document: &PrincipalsDocument) -> Result<(), MigrationError> {
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
        principals = document.principals.len(),
        "Wrote principals"
    );
    Ok(())
}

/// Expand and write. Nothing is written unless every step succeeds.
pub async fn run(settings: Settings) -> Result<PrincipalsDocument, MigrationError> {
    let output = settings.output.principals.clone();
    let document = within_deadline(settings.run.timeout_seconds, move || compute(&settings)).await?;
    write_principals(&output, &document)?;
    Ok(document)
}
