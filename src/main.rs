use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use permissions_migration::{build, expand};
use permissions_migration::settings::{Overrides, Settings};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "permissions-migration",
    version,
    about = "Map Ranger policies and HDFS permissions to cloud IAM bindings"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "permissions-migration.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute IAM bindings and write them to the output file
    Build(BuildArgs),
    /// Map Ranger and HDFS identities to principals and write the principals document
    Expand(ExpandArgs),
}

#[derive(Args, Debug, Clone)]
struct BuildArgs {
    /// Directory of table translation documents
    #[arg(long)]
    tables: Option<PathBuf>,

    /// Principal mapping document
    #[arg(long)]
    principals: Option<PathBuf>,

    /// Ranger dump directory (services.jsonl, policies.jsonl)
    #[arg(long)]
    ranger_dumper_output: Option<PathBuf>,

    /// HDFS permission dump (CSV)
    #[arg(long)]
    hdfs_dumper_output: Option<PathBuf>,

    /// Permissions ruleset document
    #[arg(long)]
    permissions_ruleset: Option<PathBuf>,

    /// Output file, JSON when it ends in .json, YAML otherwise
    #[arg(long)]
    output_permissions: Option<PathBuf>,

    #[arg(long)]
    timeout_seconds: Option<u64>,
}

#[derive(Args, Debug, Clone)]
struct ExpandArgs {
    /// Ranger dump directory (users.jsonl, groups.jsonl, roles.jsonl)
    #[arg(long)]
    ranger_dumper_output: Option<PathBuf>,

    /// HDFS permission dump (CSV), source of HDFS owners and groups
    #[arg(long)]
    hdfs_dumper_output: Option<PathBuf>,

    /// Principal ruleset document
    #[arg(long)]
    principal_ruleset: Option<PathBuf>,

    /// Output principals document, JSON when it ends in .json, YAML otherwise
    #[arg(long)]
    output_principals: Option<PathBuf>,

    #[arg(long)]
    timeout_seconds: Option<u64>,
}

impl From<BuildArgs> for Overrides {
    fn from(args: BuildArgs) -> Self {
        Overrides {
            tables: args.tables,
            principals: args.principals,
            ranger_dumper_output: args.ranger_dumper_output,
            hdfs_dumper_output: args.hdfs_dumper_output,
            permissions_ruleset: args.permissions_ruleset,
            output_permissions: args.output_permissions,
            timeout_seconds: args.timeout_seconds,
            ..Default::default()
        }
    }
}

impl From<ExpandArgs> for Overrides {
    fn from(args: ExpandArgs) -> Self {
        Overrides {
            ranger_dumper_output: args.ranger_dumper_output,
            hdfs_dumper_output: args.hdfs_dumper_output,
            principal_ruleset: args.principal_ruleset,
            output_principals: args.output_principals,
            timeout_seconds: args.timeout_seconds,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let overrides: Overrides = match cli.command {
        Command::Build(ref args) => Overrides::from(args.clone()),
        Command::Expand(ref args) => Overrides::from(args.clone()),
    };

    let settings = Settings::load(&cli.config, &overrides)?;
    tracing::info!(?settings, "Loaded configuration");

    // A timed-out run leaves its worker running; don't wait for it on exit.
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = match cli.command {
        Command::Build(_) => runtime.block_on(build::run(settings)).map(|document| {
            tracing::info!(bindings = document.bindings.len(), "Build complete");
        }),
        Command::Expand(_) => runtime.block_on(expand::run(settings)).map(|document| {
            tracing::info!(principals = document.principals.len(), "Expand complete");
        }),
    };
    runtime.shutdown_background();

    result?;
    Ok(())
}
