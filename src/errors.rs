use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MigrationError {
    #[error("Failed to read `{path}`")]
    #[diagnostic(
        code(permissions_migration::read),
        help("Check that the file exists and is readable")
    )]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write `{path}`")]
    #[diagnostic(
        code(permissions_migration::write),
        help("Check that the output directory exists and is writable")
    )]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse `{path}`: {message}")]
    #[diagnostic(code(permissions_migration::parse))]
    ParseError { path: String, message: String },

    #[error("Invalid rule expression: {0}")]
    #[diagnostic(
        code(permissions_migration::rules::invalid_expression),
        help("Supported operators: ==, !=, >, <, >=, <=, &&, ||, !, in, +, ?:. Functions: matches, startsWith, endsWith, contains, size, lower, upper")
    )]
    InvalidCondition(String),

    #[error("Undefined variable `{name}` in expression `{expression}`")]
    #[diagnostic(
        code(permissions_migration::rules::undefined_variable),
        help("Binding rules may reference table, principal, source_principal and permission. Principal rules reference the identity they map: user, group, role or other")
    )]
    UndefinedVariable { name: String, expression: String },

    #[error("Invalid rule: {0}")]
    #[diagnostic(
        code(permissions_migration::rules::invalid_rule),
        help("A rule has an optional `when` and `log` condition and either `skip: true` or a `map` of output fields")
    )]
    InvalidRule(String),

    #[error("Rule evaluation failed: {0}")]
    #[diagnostic(code(permissions_migration::rules::evaluation))]
    Evaluation(String),

    #[error("No rule matches {source_system} item")]
    #[diagnostic(
        code(permissions_migration::rules::no_match),
        help("Add a final catch-all rule (`when: \"true\"`) to the rule set")
    )]
    NoRuleMatch { source_system: String },

    #[error("Ranger {plugin} policy '{policy}' refers to an invalid Ranger principal {kind} '{name}'")]
    #[diagnostic(
        code(permissions_migration::ranger::dangling_principal),
        help("Add a principal with a matching `ranger/<kind>` source, or give it `action: skip` to exclude it")
    )]
    DanglingPrincipal {
        plugin: String,
        policy: String,
        kind: String,
        name: String,
    },

    #[error("Source identity `{key}` is claimed by more than one principal")]
    #[diagnostic(
        code(permissions_migration::principals::duplicate),
        help("Each `system/kind` source name must appear in exactly one principal")
    )]
    DuplicatePrincipal { key: String },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(permissions_migration::config))]
    InvalidConfig(String),

    #[error("Config error: {0}")]
    #[diagnostic(code(permissions_migration::config))]
    Config(#[from] config::ConfigError),

    #[error("Build timed out after {0} seconds")]
    #[diagnostic(
        code(permissions_migration::timeout),
        help("Raise `run.timeout_seconds` or pass --timeout-seconds")
    )]
    Timeout(u64),

    #[error("I/O error: {0}")]
    #[diagnostic(code(permissions_migration::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(permissions_migration::serde))]
    Serde(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    #[diagnostic(code(permissions_migration::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    #[diagnostic(code(permissions_migration::csv))]
    Csv(#[from] csv::Error),
}

impl MigrationError {
    /// Broken configuration aborts the whole build. Everything else is a
    /// processing failure scoped to the mapper that hit it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigrationError::InvalidCondition(_)
                | MigrationError::UndefinedVariable { .. }
                | MigrationError::InvalidRule(_)
                | MigrationError::DanglingPrincipal { .. }
                | MigrationError::DuplicatePrincipal { .. }
                | MigrationError::InvalidConfig(_)
                | MigrationError::Config(_)
                | MigrationError::Timeout(_)
        )
    }

    pub(crate) fn parse(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        MigrationError::ParseError {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
