pub mod compiler;
pub mod condition;

pub use compiler::{Action, CompiledRuleSet, EvalOutcome, RuleSetCompiler, MAPPER_VARIABLES};
pub use condition::{parse_expression, CompiledExpression};
