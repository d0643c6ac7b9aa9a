use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::MigrationError;
use crate::models::{
    HdfsPrincipal, Principal, PrincipalAction, PrincipalType, RangerGroup, RangerRole, RangerUser,
    Rule,
};
use crate::rules::{Action, CompiledRuleSet, RuleSetCompiler};
use crate::source::{RecordSource, RecordSourceExt};

/// A source-system identity that principal rules decide on.
pub trait IdentityRecord: Serialize {
    fn name(&self) -> &str;

    /// Address the source system already knows for this identity.
    fn email_address(&self) -> Option<&str> {
        None
    }
}

impl IdentityRecord for RangerUser {
    fn name(&self) -> &str {
        &self.name
    }

    fn email_address(&self) -> Option<&str> {
        self.email_address.as_deref().filter(|e| !e.is_empty())
    }
}

impl IdentityRecord for RangerGroup {
    fn name(&self) -> &str {
        &self.name
    }
}

impl IdentityRecord for RangerRole {
    fn name(&self) -> &str {
        &self.name
    }
}

impl IdentityRecord for HdfsPrincipal {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Produces principal entries for one kind of source identity.
pub trait PrincipalMapper: Send {
    fn name(&self) -> &str;

    fn run(&self) -> Result<Vec<Principal>, MigrationError>;
}

/// Fields a MAP rule may set on the principal.
#[derive(Debug, Deserialize)]
struct MappedFields {
    #[serde(default)]
    email_address: Option<String>,
    #[serde(default, rename = "type")]
    principal_type: Option<PrincipalType>,
}

/// Maps every identity of a source with a rule list. The rule variable is
/// the identity kind, e.g. `user.name` for Ranger users.
pub struct RulePrincipalMapper<T> {
    name: String,
    system: &'static str,
    kind: &'static str,
    default_type: Option<PrincipalType>,
    rules: CompiledRuleSet,
    source: Box<dyn RecordSource<T>>,
}

impl<T: IdentityRecord> RulePrincipalMapper<T> {
    pub fn new(
        system: &'static str,
        kind: &'static str,
        default_type: Option<PrincipalType>,
        rules: &[Rule],
        source: Box<dyn RecordSource<T>>,
    ) -> Result<Self, MigrationError> {
        let name = format!("{system}/{kind} principals");
        let rules = RuleSetCompiler::new([kind]).compile(rules)?;
        tracing::debug!(mapper = %name, rules = rules.len(), "Compiled principal rule set");
        Ok(Self {
            name,
            system,
            kind,
            default_type,
            rules,
            source,
        })
    }

    fn source_key(&self) -> String {
        format!("{}/{}", self.system, self.kind)
    }

    pub fn map(&self, record: &T) -> Result<Principal, MigrationError> {
        let mut facts = Map::new();
        facts.insert(self.kind.to_string(), serde_json::to_value(record)?);

        let source_key = self.source_key();
        let mut base = Map::new();
        let mut sources = Map::new();
        sources.insert(source_key.clone(), Value::from(vec![record.name()]));
        base.insert("sources".to_string(), Value::Object(sources));
        let mut defaults = Map::new();
        if let Some(principal_type) = self.default_type {
            defaults.insert("type".to_string(), serde_json::to_value(principal_type)?);
        }
        if let Some(email) = record.email_address() {
            defaults.insert("email_address".to_string(), Value::from(email));
        }

        let outcome = self.rules.eval(&Value::Object(facts), &base, &defaults)?;
        let sources = [(source_key.as_str(), record.name())];
        match outcome.action {
            Action::NoMatch => Err(MigrationError::NoRuleMatch {
                source_system: source_key.clone(),
            }),
            Action::Skip => Ok(Principal::skipped(&sources)),
            Action::Map => {
                let fields: MappedFields =
                    serde_json::from_value(Value::Object(outcome.mapped_object)).map_err(|e| {
                        MigrationError::Evaluation(format!(
                            "{source_key} '{}' mapped to an invalid principal: {e}",
                            record.name()
                        ))
                    })?;
                let (Some(email), Some(principal_type)) = (fields.email_address, fields.principal_type)
                else {
                    return Err(MigrationError::Evaluation(format!(
                        "{source_key} '{}' mapped without both `email_address` and `type`",
                        record.name()
                    )));
                };
                Ok(Principal::mapped(principal_type, email, &sources))
            }
        }
    }
}

impl<T: IdentityRecord + 'static> PrincipalMapper for RulePrincipalMapper<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self) -> Result<Vec<Principal>, MigrationError> {
        let principals = self.source.process(|records| {
            records
                .map(|record| self.map(&record?))
                .collect::<Result<Vec<_>, _>>()
        })?;
        let skipped = principals
            .iter()
            .filter(|p| p.action == PrincipalAction::Skip)
            .count();
        tracing::info!(
            mapper = %self.name,
            mapped = principals.len() - skipped,
            skipped,
            "Mapped {} {} items",
            principals.len(),
            self.source_key()
        );
        Ok(principals)
    }
}
