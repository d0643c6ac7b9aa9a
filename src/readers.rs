//! Adapters from dump files on disk to record sources.

use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::errors::MigrationError;
use crate::models::principal::PrincipalsDocument;
use crate::models::{
    HdfsPermission, HdfsPrincipal, HdfsPrincipalType, Policy, Principal, RangerGroup, RangerRole,
    RangerUser, Service, Table, TableTranslation,
};
use crate::models::hdfs::HDFS_OTHER_NAME;
use crate::source::{RecordSource, RecordSourceExt, Records};

pub const RANGER_SERVICES_FILE: &str = "services.jsonl";
pub const RANGER_POLICIES_FILE: &str = "policies.jsonl";
pub const RANGER_USERS_FILE: &str = "users.jsonl";
pub const RANGER_GROUPS_FILE: &str = "groups.jsonl";
pub const RANGER_ROLES_FILE: &str = "roles.jsonl";

fn read_error(path: &Path, source: std::io::Error) -> MigrationError {
    MigrationError::ReadError {
        path: path.display().to_string(),
        source,
    }
}

/// Table translation documents, one `.yaml` file per table.
#[derive(Debug, Clone)]
pub struct TableReader {
    dir: PathBuf,
}

impl TableReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn table_files(&self) -> Result<Vec<PathBuf>, MigrationError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .map_err(|e| read_error(&self.dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

fn read_table(path: &Path) -> Result<Table, MigrationError> {
    let contents = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;
    let doc: TableTranslation = serde_yaml::from_str(&contents)
        .map_err(|e| MigrationError::parse(path.display().to_string(), e))?;
    Table::from_translation(doc)
}

impl RecordSource<Table> for TableReader {
    fn with_records(
        &self,
        f: &mut dyn FnMut(Records<'_, Table>) -> Result<(), MigrationError>,
    ) -> Result<(), MigrationError> {
        let files = self.table_files()?;
        tracing::info!(dir = %self.dir.display(), files = files.len(), "Reading table documents");
        f(Box::new(files.into_iter().map(|path| read_table(&path))))
    }
}

/// The principals document, `{principals: [...]}`.
#[derive(Debug, Clone)]
pub struct PrincipalReader {
    path: PathBuf,
}

impl PrincipalReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource<Principal> for PrincipalReader {
    fn with_records(
        &self,
        f: &mut dyn FnMut(Records<'_, Principal>) -> Result<(), MigrationError>,
    ) -> Result<(), MigrationError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| read_error(&self.path, e))?;
        let doc: PrincipalsDocument = serde_yaml::from_str(&contents)
            .map_err(|e| MigrationError::parse(self.path.display().to_string(), e))?;
        tracing::info!(
            path = %self.path.display(),
            principals = doc.principals.len(),
            "Loaded principals"
        );
        f(Box::new(doc.principals.into_iter().map(Ok)))
    }
}

/// Newline-delimited JSON records. Blank lines are skipped.
#[derive(Debug, Clone)]
pub struct JsonLinesReader<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonLinesReader<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }
}

pub type RangerServiceReader = JsonLinesReader<Service>;
pub type RangerPolicyReader = JsonLinesReader<Policy>;
pub type RangerUserReader = JsonLinesReader<RangerUser>;
pub type RangerGroupReader = JsonLinesReader<RangerGroup>;
pub type RangerRoleReader = JsonLinesReader<RangerRole>;

/// Service and policy readers for a Ranger dump directory.
pub fn ranger_readers(dump_dir: &Path) -> (RangerServiceReader, RangerPolicyReader) {
    (
        JsonLinesReader::new(dump_dir.join(RANGER_SERVICES_FILE)),
        JsonLinesReader::new(dump_dir.join(RANGER_POLICIES_FILE)),
    )
}

impl<T: DeserializeOwned> RecordSource<T> for JsonLinesReader<T> {
    fn with_records(
        &self,
        f: &mut dyn FnMut(Records<'_, T>) -> Result<(), MigrationError>,
    ) -> Result<(), MigrationError> {
        let file = File::open(&self.path).map_err(|e| read_error(&self.path, e))?;
        let path = &self.path;
        let records = BufReader::new(file)
            .lines()
            .enumerate()
            .filter(|(_, line)| line.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true))
            .map(move |(index, line)| {
                let line = line.map_err(|e| read_error(path, e))?;
                serde_json::from_str(&line).map_err(|e| {
                    MigrationError::parse(format!("{}:{}", path.display(), index + 1), e)
                })
            });
        f(Box::new(records))
    }
}

/// HDFS permission dump, a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct HdfsPermissionReader {
    path: PathBuf,
}

impl HdfsPermissionReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource<HdfsPermission> for HdfsPermissionReader {
    fn with_records(
        &self,
        f: &mut dyn FnMut(Records<'_, HdfsPermission>) -> Result<(), MigrationError>,
    ) -> Result<(), MigrationError> {
        let file = File::open(&self.path).map_err(|e| read_error(&self.path, e))?;
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));
        let path = &self.path;
        let records = reader
            .into_deserialize::<HdfsPermission>()
            .map(move |row| row.map_err(|e| MigrationError::parse(path.display().to_string(), e)));
        f(Box::new(records))
    }
}

/// Distinct owners or groups found in an HDFS permission dump. The `other`
/// class always yields its single sentinel identity without reading the dump.
#[derive(Debug, Clone)]
pub struct HdfsIdentityReader {
    permissions: HdfsPermissionReader,
    kind: HdfsPrincipalType,
}

impl HdfsIdentityReader {
    pub fn new(path: impl Into<PathBuf>, kind: HdfsPrincipalType) -> Self {
        Self {
            permissions: HdfsPermissionReader::new(path),
            kind,
        }
    }
}

impl RecordSource<HdfsPrincipal> for HdfsIdentityReader {
    fn with_records(
        &self,
        f: &mut dyn FnMut(Records<'_, HdfsPrincipal>) -> Result<(), MigrationError>,
    ) -> Result<(), MigrationError> {
        let kind = self.kind;
        let names: BTreeSet<String> = match kind {
            HdfsPrincipalType::Other => BTreeSet::from([HDFS_OTHER_NAME.to_string()]),
            HdfsPrincipalType::User | HdfsPrincipalType::Group => {
                self.permissions.process(|records| {
                    records
                        .map(|row| row.map(|p| p.principal_for(kind).name))
                        .collect()
                })?
            }
        };
        tracing::debug!(kind = ?kind, identities = names.len(), "Collected HDFS identities");
        f(Box::new(
            names.into_iter().map(move |name| Ok(HdfsPrincipal::new(kind, name))),
        ))
    }
}
