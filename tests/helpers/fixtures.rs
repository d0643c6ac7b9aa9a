use permissions_migration::models::{HdfsPermission, Policy, Principal, Service, Table};
use permissions_migration::readers::{
    RANGER_GROUPS_FILE, RANGER_POLICIES_FILE, RANGER_ROLES_FILE, RANGER_SERVICES_FILE,
    RANGER_USERS_FILE,
};
use permissions_migration::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Input files for a build, laid out like the dumper outputs
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir(dir.path().join("tables")).expect("Failed to create tables dir");
        fs::create_dir(dir.path().join("ranger")).expect("Failed to create ranger dir");
        let fixture = Self { dir };
        fixture
            .principals(&[])
            .ranger(&[], &[])
            .ruleset("{}\n");
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tables(&self, tables: &[Table]) -> &Self {
        for table in tables {
            let bq_path = table.bq_path.clone().expect("test tables need a BigQuery name");
            let doc = serde_json::json!({
                "target_name": bq_path,
                "source_locations": [table.hdfs_path],
                "target_locations": table.gcs_path.iter().collect::<Vec<_>>(),
            });
            let file = self.path().join("tables").join(format!("{bq_path}.yaml"));
            fs::write(file, serde_yaml::to_string(&doc).expect("Failed to encode table"))
                .expect("Failed to write table");
        }
        self
    }

    pub fn principals(&self, principals: &[Principal]) -> &Self {
        let doc = serde_json::json!({ "principals": principals });
        fs::write(
            self.path().join("principals.yaml"),
            serde_yaml::to_string(&doc).expect("Failed to encode principals"),
        )
        .expect("Failed to write principals");
        self
    }

    pub fn ranger(&self, services: &[Service], policies: &[Policy]) -> &Self {
        let lines = |values: Vec<String>| values.join("\n") + "\n";
        fs::write(
            self.path().join("ranger").join(RANGER_SERVICES_FILE),
            lines(services.iter().map(|s| serde_json::to_string(s).unwrap()).collect()),
        )
        .expect("Failed to write services");
        fs::write(
            self.path().join("ranger").join(RANGER_POLICIES_FILE),
            lines(policies.iter().map(|p| serde_json::to_string(p).unwrap()).collect()),
        )
        .expect("Failed to write policies");
        self
    }

    /// Replace the policy dump with raw text.
    pub fn raw_policies(&self, contents: &str) -> &Self {
        fs::write(self.path().join("ranger").join(RANGER_POLICIES_FILE), contents)
            .expect("Failed to write policies");
        self
    }

    pub fn hdfs(&self, permissions: &[HdfsPermission]) -> &Self {
        let mut writer = csv::Writer::from_path(self.hdfs_path()).expect("Failed to open CSV");
        writer
            .write_record([
                "Path",
                "FileType",
                "FileSize",
                "Owner",
                "Group",
                "Permission",
                "ModificationTime",
                "FileCount",
                "DirCount",
                "StoragePolicy",
            ])
            .expect("Failed to write CSV header");
        for p in permissions {
            writer
                .write_record([
                    p.path.as_str(),
                    "D",
                    "0",
                    p.owner.as_str(),
                    p.group.as_str(),
                    p.permission.as_str(),
                    "2024-01-01 00:00",
                    "",
                    "",
                    "",
                ])
                .expect("Failed to write CSV row");
        }
        writer.flush().expect("Failed to flush CSV");
        self
    }

    /// Write the Ranger user, group and role dumps, one JSON object per line.
    pub fn identities(
        &self,
        users: &[serde_json::Value],
        groups: &[serde_json::Value],
        roles: &[serde_json::Value],
    ) -> &Self {
        for (file, values) in [
            (RANGER_USERS_FILE, users),
            (RANGER_GROUPS_FILE, groups),
            (RANGER_ROLES_FILE, roles),
        ] {
            let lines: Vec<String> = values.iter().map(|v| v.to_string() + "\n").collect();
            fs::write(self.path().join("ranger").join(file), lines.concat())
                .expect("Failed to write Ranger identities");
        }
        self
    }

    pub fn principal_ruleset(&self, yaml: &str) -> &Self {
        fs::write(self.path().join("principal-ruleset.yaml"), yaml)
            .expect("Failed to write principal ruleset");
        self
    }

    pub fn ruleset(&self, yaml: &str) -> &Self {
        fs::write(self.path().join("ruleset.yaml"), yaml).expect("Failed to write ruleset");
        self
    }

    pub fn hdfs_path(&self) -> PathBuf {
        self.path().join("hdfs.csv")
    }

    pub fn output_path(&self, file: &str) -> PathBuf {
        self.path().join(file)
    }

    pub fn settings(&self, output: &str) -> Settings {
        let mut settings = Settings::default();
        settings.inputs.tables = self.path().join("tables");
        settings.inputs.principals = self.path().join("principals.yaml");
        settings.inputs.ranger_dumper_output = self.path().join("ranger");
        settings.inputs.permissions_ruleset = self.path().join("ruleset.yaml");
        settings.inputs.principal_ruleset = self.path().join("principal-ruleset.yaml");
        if self.hdfs_path().exists() {
            settings.inputs.hdfs_dumper_output = Some(self.hdfs_path());
        }
        settings.output.permissions = self.output_path(output);
        settings.run.timeout_seconds = 60;
        settings
    }
}
