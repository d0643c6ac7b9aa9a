//! Rule-driven mappers from source permissions to IAM bindings.

pub mod hdfs;
pub mod merge_join;
pub mod path_pattern;
pub mod ranger;
pub mod ranger_hdfs;
pub mod ranger_hive;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::MigrationError;
use crate::models::{IamBinding, Principal, Rule, Table};
use crate::rules::{Action, CompiledRuleSet, RuleSetCompiler, MAPPER_VARIABLES};

pub use hdfs::HdfsMapper;
pub use ranger::RangerMapper;
pub use ranger_hdfs::RangerHdfsPlugin;
pub use ranger_hive::RangerHivePlugin;

/// A source of candidate bindings, each tagged with the rule verdict.
pub trait BindingMapper: Send {
    fn name(&self) -> &str;

    fn run(&self) -> Result<Vec<MapResult>, MigrationError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapResult {
    pub action: Action,
    pub binding: IamBinding,
}

/// Everything known about one candidate binding while rules decide on it.
#[derive(Debug, Clone)]
pub struct CorrelationContext {
    facts: Value,
    binding: IamBinding,
}

fn insert<T: Serialize + ?Sized>(
    map: &mut Map<String, Value>,
    key: &str,
    value: &T,
) -> Result<(), MigrationError> {
    map.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

impl CorrelationContext {
    pub fn new<P: Serialize, S: Serialize>(
        source_system: &str,
        table: &Table,
        principal: &Principal,
        source_principal: &P,
        source_permission: &S,
        binding: IamBinding,
    ) -> Result<Self, MigrationError> {
        let source_principal = serde_json::to_value(source_principal)?;
        let source_permission = serde_json::to_value(source_permission)?;

        let mut facts = Map::new();
        insert(&mut facts, "table", table)?;
        insert(&mut facts, "principal", principal)?;
        facts.insert("source_principal".to_string(), source_principal.clone());
        insert(&mut facts, "permission", &binding)?;

        Ok(Self {
            facts: Value::Object(facts),
            binding: binding.with_provenance(source_system, source_permission, source_principal),
        })
    }

    pub fn binding(&self) -> &IamBinding {
        &self.binding
    }

    /// Provenance keys. Rules cannot overwrite these.
    fn base_object(&self) -> Result<Map<String, Value>, MigrationError> {
        let mut base = Map::new();
        insert(&mut base, "source_permissions", &self.binding.source_permissions)?;
        insert(&mut base, "source_principals", &self.binding.source_principals)?;
        Ok(base)
    }

    /// The binding as proposed, which rule map fields may refine.
    fn default_object(&self) -> Result<Map<String, Value>, MigrationError> {
        let mut defaults = Map::new();
        insert(&mut defaults, "priority", &self.binding.priority)?;
        insert(&mut defaults, "principal", &self.binding.principal)?;
        insert(&mut defaults, "role", &self.binding.role)?;
        insert(&mut defaults, "resource_type", &self.binding.resource_type)?;
        insert(&mut defaults, "resource_path", &self.binding.resource_path)?;
        Ok(defaults)
    }
}

/// Compiled rules for one mapper plus the bookkeeping around evaluating them.
#[derive(Debug)]
pub struct RuleSetMapper {
    source_system: &'static str,
    name: String,
    rules: CompiledRuleSet,
}

impl RuleSetMapper {
    pub fn new(
        source_system: &'static str,
        name: impl Into<String>,
        rules: &[Rule],
    ) -> Result<Self, MigrationError> {
        let name = name.into();
        let rules = RuleSetCompiler::new(MAPPER_VARIABLES).compile(rules)?;
        tracing::debug!(mapper = %name, rules = rules.len(), "Compiled rule set");
        Ok(Self {
            source_system,
            name,
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn map(&self, context: CorrelationContext) -> Result<MapResult, MigrationError> {
        let defaults = context.default_object()?;
        let outcome = self
            .rules
            .eval(&context.facts, &context.base_object()?, &defaults)?;
        if outcome.action == Action::NoMatch {
            return Err(MigrationError::NoRuleMatch {
                source_system: self.source_system.to_string(),
            });
        }
        // Overrides are advisory: the emitted binding is the one already built.
        for (key, default) in &defaults {
            if let Some(mapped) = outcome.mapped_object.get(key).filter(|v| *v != default) {
                tracing::debug!(
                    mapper = %self.name,
                    field = %key,
                    %default,
                    %mapped,
                    "Ignoring rule override of binding field"
                );
            }
        }
        Ok(MapResult {
            action: outcome.action,
            binding: context.binding,
        })
    }

    /// Decide on every context. The first failure stops the mapper.
    pub fn map_all<I>(&self, contexts: I) -> Result<Vec<MapResult>, MigrationError>
    where
        I: IntoIterator<Item = Result<CorrelationContext, MigrationError>>,
    {
        let mut results = Vec::new();
        for context in contexts {
            results.push(self.map(context?)?);
        }
        let skipped = results
            .iter()
            .filter(|r| r.action == Action::Skip)
            .count();
        tracing::info!(
            mapper = %self.name,
            mapped = results.len() - skipped,
            skipped,
            "Mapped {} {} items",
            results.len(),
            self.source_system
        );
        Ok(results)
    }
}
