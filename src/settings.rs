use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::MigrationError;
use crate::models::{Target, TargetRoles};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub inputs: Inputs,
    pub output: Output,
    pub run: Run,
    pub roles: Roles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inputs {
    /// Directory of table translation documents (`*.yaml`)
    pub tables: PathBuf,
    /// Principal mapping document
    pub principals: PathBuf,
    /// Directory holding `services.jsonl` and `policies.jsonl`
    pub ranger_dumper_output: PathBuf,
    /// HDFS permission dump (CSV). The HDFS mappers are skipped without it.
    #[serde(default)]
    pub hdfs_dumper_output: Option<PathBuf>,
    pub permissions_ruleset: PathBuf,
    /// Rules turning source identities into principals, read by `expand`
    pub principal_ruleset: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    /// Written as JSON when the extension is `.json`, YAML otherwise.
    pub permissions: PathBuf,
    /// Principals document written by `expand`
    pub principals: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub timeout_seconds: u64,
}

/// Role identifiers granted on each target platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roles {
    pub gcs: TargetRoles,
    pub bq: TargetRoles,
}

impl Roles {
    pub fn for_target(&self, target: Target) -> &TargetRoles {
        match target {
            Target::Gcs => &self.gcs,
            Target::Bq => &self.bq,
        }
    }
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            tables: PathBuf::from("tables"),
            principals: PathBuf::from("principals.yaml"),
            ranger_dumper_output: PathBuf::from("ranger"),
            hdfs_dumper_output: None,
            permissions_ruleset: PathBuf::from("permissions-ruleset.yaml"),
            principal_ruleset: PathBuf::from("principal-ruleset.yaml"),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            permissions: PathBuf::from("permissions.yaml"),
            principals: PathBuf::from("principals.yaml"),
        }
    }
}

impl Default for Run {
    fn default() -> Self {
        Self {
            timeout_seconds: 3600,
        }
    }
}

impl Default for Roles {
    fn default() -> Self {
        Self {
            gcs: TargetRoles::gcs_defaults(),
            bq: TargetRoles::bq_defaults(),
        }
    }
}

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub tables: Option<PathBuf>,
    pub principals: Option<PathBuf>,
    pub ranger_dumper_output: Option<PathBuf>,
    pub hdfs_dumper_output: Option<PathBuf>,
    pub permissions_ruleset: Option<PathBuf>,
    pub output_permissions: Option<PathBuf>,
    pub principal_ruleset: Option<PathBuf>,
    pub output_principals: Option<PathBuf>,
    pub timeout_seconds: Option<u64>,
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().to_string())
}

fn path_default(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl Settings {
    pub fn load(path: &str, overrides: &Overrides) -> Result<Self, MigrationError> {
        let inputs = Inputs::default();
        let output = Output::default();
        let roles = Roles::default();
        let mut builder = config::Config::builder()
            .set_default("inputs.tables", path_default(&inputs.tables))?
            .set_default("inputs.principals", path_default(&inputs.principals))?
            .set_default(
                "inputs.ranger_dumper_output",
                path_default(&inputs.ranger_dumper_output),
            )?
            .set_default(
                "inputs.permissions_ruleset",
                path_default(&inputs.permissions_ruleset),
            )?
            .set_default(
                "inputs.principal_ruleset",
                path_default(&inputs.principal_ruleset),
            )?
            .set_default("output.permissions", path_default(&output.permissions))?
            .set_default("output.principals", path_default(&output.principals))?
            .set_default("run.timeout_seconds", Run::default().timeout_seconds)?
            .set_default("roles.gcs.read", roles.gcs.read)?
            .set_default("roles.gcs.write", roles.gcs.write)?
            .set_default("roles.bq.read", roles.bq.read)?
            .set_default("roles.bq.write", roles.bq.write)?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: PERMISSIONS_MIGRATION__RUN__TIMEOUT_SECONDS=60, etc.
        builder = builder
            .add_source(config::Environment::with_prefix("PERMISSIONS_MIGRATION").separator("__"));

        builder = builder
            .set_override_option("inputs.tables", path_value(&overrides.tables))?
            .set_override_option("inputs.principals", path_value(&overrides.principals))?
            .set_override_option(
                "inputs.ranger_dumper_output",
                path_value(&overrides.ranger_dumper_output),
            )?
            .set_override_option(
                "inputs.hdfs_dumper_output",
                path_value(&overrides.hdfs_dumper_output),
            )?
            .set_override_option(
                "inputs.permissions_ruleset",
                path_value(&overrides.permissions_ruleset),
            )?
            .set_override_option(
                "inputs.principal_ruleset",
                path_value(&overrides.principal_ruleset),
            )?
            .set_override_option("output.permissions", path_value(&overrides.output_permissions))?
            .set_override_option("output.principals", path_value(&overrides.output_principals))?
            .set_override_option("run.timeout_seconds", overrides.timeout_seconds)?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        if settings.run.timeout_seconds == 0 {
            return Err(MigrationError::InvalidConfig(
                "run.timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_settings_load_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load(config_path.to_str().unwrap(), &Overrides::default())
            .expect("Failed to load settings");

        assert_eq!(settings.inputs.tables, PathBuf::from("tables"));
        assert_eq!(settings.inputs.hdfs_dumper_output, None);
        assert_eq!(settings.output.permissions, PathBuf::from("permissions.yaml"));
        assert_eq!(settings.inputs.principal_ruleset, PathBuf::from("principal-ruleset.yaml"));
        assert_eq!(settings.output.principals, settings.inputs.principals);
        assert_eq!(settings.run.timeout_seconds, 3600);
        assert_eq!(settings.roles.gcs.write, "roles/storage.objectUser");
    }

    #[test]
    fn test_settings_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[inputs]
tables = "/srv/migration/tables"
hdfs_dumper_output = "/srv/migration/hdfs.csv"

[run]
timeout_seconds = 120

[roles.gcs]
read = "roles/custom.reader"
write = "roles/custom.writer"
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        let settings = Settings::load(config_path.to_str().unwrap(), &Overrides::default())
            .expect("Failed to load settings");

        assert_eq!(settings.inputs.tables, PathBuf::from("/srv/migration/tables"));
        assert_eq!(
            settings.inputs.hdfs_dumper_output,
            Some(PathBuf::from("/srv/migration/hdfs.csv"))
        );
        assert_eq!(settings.inputs.principals, PathBuf::from("principals.yaml"));
        assert_eq!(settings.run.timeout_seconds, 120);
        assert_eq!(settings.roles.gcs.read, "roles/custom.reader");
    }

    #[test]
    fn test_settings_cli_overrides_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");
        fs::write(
            &config_path,
            "[output]\npermissions = \"from-file.yaml\"\n[run]\ntimeout_seconds = 120\n",
        )
        .expect("Failed to write config");

        let overrides = Overrides {
            output_permissions: Some(PathBuf::from("from-cli.json")),
            output_principals: Some(PathBuf::from("expanded.yaml")),
            timeout_seconds: Some(30),
            ..Default::default()
        };
        let settings = Settings::load(config_path.to_str().unwrap(), &overrides)
            .expect("Failed to load settings");

        assert_eq!(settings.output.permissions, PathBuf::from("from-cli.json"));
        assert_eq!(settings.output.principals, PathBuf::from("expanded.yaml"));
        assert_eq!(settings.run.timeout_seconds, 30);
    }

    #[test]
    fn test_settings_env_override() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");
        fs::write(&config_path, "[roles.bq]\nread = \"roles/from.file\"\n")
            .expect("Failed to write config");

        env::set_var("PERMISSIONS_MIGRATION__ROLES__BQ__READ", "roles/from.env");

        let settings = Settings::load(config_path.to_str().unwrap(), &Overrides::default())
            .expect("Failed to load settings");
        assert_eq!(settings.roles.bq.read, "roles/from.env");

        env::remove_var("PERMISSIONS_MIGRATION__ROLES__BQ__READ");
    }

    #[test]
    fn test_settings_zero_timeout_rejected() {
        let overrides = Overrides {
            timeout_seconds: Some(0),
            ..Default::default()
        };
        let err = Settings::load("does-not-exist.toml", &overrides).unwrap_err();
        assert!(err.is_fatal());
    }
}
