use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::MigrationError;
use crate::models::Rule;
use crate::rules::condition::CompiledExpression;

/// Variables every mapping rule can reference.
pub const MAPPER_VARIABLES: [&str; 4] = ["table", "principal", "source_principal", "permission"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Map,
    Skip,
    NoMatch,
}

/// Verdict of a rule set for one fact map.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOutcome {
    pub action: Action,
    /// Base object, then defaults, then the winning rule's map fields.
    pub mapped_object: Map<String, Value>,
    /// Position of the rule that decided, if any.
    pub rule_index: Option<usize>,
}

#[derive(Debug, Clone)]
enum CompiledField {
    Expression(CompiledExpression),
    Value(Value),
}

#[derive(Debug, Clone)]
enum RuleOutcome {
    Skip,
    Map(BTreeMap<String, CompiledField>),
}

#[derive(Debug, Clone)]
struct CompiledRule {
    when: CompiledExpression,
    log: CompiledExpression,
    outcome: RuleOutcome,
}

/// Compiles rule lists against a fixed variable universe.
#[derive(Debug, Clone)]
pub struct RuleSetCompiler {
    variables: Vec<String>,
}

impl RuleSetCompiler {
    pub fn new<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
        }
    }

    /// Every expression is parsed and checked here, so a rule set that
    /// compiles can only fail at evaluation time on data-dependent type errors.
    pub fn compile(&self, rules: &[Rule]) -> Result<CompiledRuleSet, MigrationError> {
        let variables: Vec<&str> = self.variables.iter().map(String::as_str).collect();
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| compile_rule(index, rule, &variables))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CompiledRuleSet { rules: compiled })
    }
}

fn compile_rule(index: usize, rule: &Rule, variables: &[&str]) -> Result<CompiledRule, MigrationError> {
    let when = CompiledExpression::compile(&rule.when, variables)?;
    let log = CompiledExpression::compile(&rule.log, variables)?;
    let outcome = match (rule.skip, &rule.map_fields) {
        (true, Some(_)) => {
            return Err(MigrationError::InvalidRule(format!(
                "rule #{index} declares both `skip` and `map`"
            )))
        }
        (true, None) => RuleOutcome::Skip,
        (false, fields) => {
            let mut compiled = BTreeMap::new();
            for (name, field) in fields.iter().flatten() {
                let field = match (&field.expression, &field.value) {
                    (Some(expr), None) => {
                        CompiledField::Expression(CompiledExpression::compile(expr, variables)?)
                    }
                    (None, Some(value)) => CompiledField::Value(value.clone()),
                    _ => {
                        return Err(MigrationError::InvalidRule(format!(
                            "rule #{index} field `{name}` needs exactly one of `expression` or `value`"
                        )))
                    }
                };
                compiled.insert(name.clone(), field);
            }
            RuleOutcome::Map(compiled)
        }
    };
    Ok(CompiledRule { when, log, outcome })
}

/// An ordered, immutable list of compiled rules. The first match decides.
#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    rules: Vec<CompiledRule>,
}

impl CompiledRuleSet {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn eval(
        &self,
        facts: &Value,
        base: &Map<String, Value>,
        defaults: &Map<String, Value>,
    ) -> Result<EvalOutcome, MigrationError> {
        let mut layered = base.clone();
        for (key, value) in defaults {
            if base.contains_key(key) {
                return Err(MigrationError::Evaluation(format!(
                    "default key '{key}' collides with a reserved key"
                )));
            }
            layered.insert(key.clone(), value.clone());
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.when.evaluate_bool(facts)? {
                continue;
            }
            let action = match &rule.outcome {
                RuleOutcome::Skip => Action::Skip,
                RuleOutcome::Map(fields) => {
                    for (name, field) in fields {
                        if base.contains_key(name) {
                            return Err(MigrationError::Evaluation(format!(
                                "Output key '{name}' is reserved"
                            )));
                        }
                        let value = match field {
                            CompiledField::Expression(expr) => expr.evaluate(facts)?,
                            CompiledField::Value(value) => value.clone(),
                        };
                        layered.insert(name.clone(), value);
                    }
                    Action::Map
                }
            };
            if rule.log.evaluate_bool(facts)? {
                let mapped = Value::Object(layered.clone());
                tracing::info!(
                    rule = index,
                    when = rule.when.source(),
                    ?action,
                    %mapped,
                    "Rule matched"
                );
            }
            return Ok(EvalOutcome {
                action,
                mapped_object: layered,
                rule_index: Some(index),
            });
        }

        Ok(EvalOutcome {
            action: Action::NoMatch,
            mapped_object: layered,
            rule_index: None,
        })
    }
}
