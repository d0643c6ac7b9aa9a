//! Expression parser and evaluator for mapping rules.
//!
//! Supported syntax:
//! - Comparisons: `==`, `!=`, `>`, `<`, `>=`, `<=`
//! - Boolean operators: `&&`, `||`, `!` (short-circuiting)
//! - Membership: `x in list`, `key in object`, `needle in "haystack"`
//! - Concatenation / addition: `a + b`
//! - Conditional: `cond ? a : b`
//! - Dot-path access: `table.schema_name`, `source_principal.type`
//! - Function calls, either `f(x, y)` or `x.f(y)`:
//!   `matches`, `startsWith`, `endsWith`, `contains`, `size`, `lower`, `upper`
//! - Literals: integers, floats, `'strings'`, `"strings"`, `true`, `false`,
//!   `null`, `[lists]`
//! - Parentheses for grouping

use crate::errors::MigrationError;
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

// ─── AST ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LitValue),
    Path(Vec<String>),
    List(Vec<Expr>),
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryNot(Box<Expr>),
    In {
        element: Box<Expr>,
        collection: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    And,
    Or,
    Add,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LitValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Matches,
    StartsWith,
    EndsWith,
    Contains,
    Size,
    Lower,
    Upper,
}

impl Function {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "matches" => Function::Matches,
            "startsWith" => Function::StartsWith,
            "endsWith" => Function::EndsWith,
            "contains" => Function::Contains,
            "size" => Function::Size,
            "lower" => Function::Lower,
            "upper" => Function::Upper,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Function::Size | Function::Lower | Function::Upper => 1,
            _ => 2,
        }
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Null,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,       // ==
    Ne,       // !=
    Gt,       // >
    Lt,       // <
    Ge,       // >=
    Le,       // <=
    And,      // &&
    Or,       // ||
    Not,      // !
    In,       // in
    Plus,     // +
    Question, // ?
    Colon,    // :
}

fn invalid(message: impl Into<String>) -> MigrationError {
    MigrationError::InvalidCondition(message.into())
}

fn tokenize(input: &str) -> Result<Vec<Token>, MigrationError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let next = chars.get(i + 1).copied();
        match chars[i] {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '>' if next == Some('=') => {
                tokens.push(Token::Ge);
                i += 2;
            }
            '>' => {
                tokens.push(Token::Gt);
                i += 1;
            }
            '<' if next == Some('=') => {
                tokens.push(Token::Le);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            quote @ ('"' | '\'') => {
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        None => return Err(invalid("unterminated string literal")),
                        Some(&c) if c == quote => break,
                        Some(&'\\') => {
                            let escaped = *chars
                                .get(i + 1)
                                .ok_or_else(|| invalid("unterminated string literal"))?;
                            s.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                            i += 2;
                        }
                        Some(&c) => {
                            s.push(c);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(s));
                i += 1; // closing quote
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_digit()
                        || (chars[i] == '.'
                            && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())))
                {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                if num_str.contains('.') {
                    let f: f64 = num_str
                        .parse()
                        .map_err(|_| invalid(format!("invalid float `{num_str}`")))?;
                    tokens.push(Token::Float(f));
                } else {
                    let n: i64 = num_str
                        .parse()
                        .map_err(|_| invalid(format!("invalid integer `{num_str}`")))?;
                    tokens.push(Token::Int(n));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    "null" => tokens.push(Token::Null),
                    "in" => tokens.push(Token::In),
                    _ => tokens.push(Token::Ident(word)),
                }
            }
            c => return Err(invalid(format!("unexpected character `{c}`"))),
        }
    }
    Ok(tokens)
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), MigrationError> {
        if self.advance() != Some(token) {
            return Err(invalid(format!("expected {what}")));
        }
        Ok(())
    }

    /// Entry: parse_conditional
    fn parse_expr(&mut self) -> Result<Expr, MigrationError> {
        self.parse_conditional()
    }

    /// conditional = or_expr ("?" conditional ":" conditional)?
    fn parse_conditional(&mut self) -> Result<Expr, MigrationError> {
        let condition = self.parse_or()?;
        if self.peek() != Some(&Token::Question) {
            return Ok(condition);
        }
        self.advance();
        let then = self.parse_conditional()?;
        self.expect(Token::Colon, "`:` in conditional expression")?;
        let otherwise = self.parse_conditional()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// or_expr = and_expr ("||" and_expr)*
    fn parse_or(&mut self) -> Result<Expr, MigrationError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = binop(BinOp::Or, left, right);
        }
        Ok(left)
    }

    /// and_expr = comparison ("&&" comparison)*
    fn parse_and(&mut self) -> Result<Expr, MigrationError> {
        let mut left = self.parse_comparison()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_comparison()?;
            left = binop(BinOp::And, left, right);
        }
        Ok(left)
    }

    /// comparison = additive (("==" | "!=" | ">" | "<" | ">=" | "<=" | "in") additive)?
    fn parse_comparison(&mut self) -> Result<Expr, MigrationError> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::Le) => BinOp::Le,
            Some(Token::In) => {
                self.advance();
                let right = self.parse_additive()?;
                return Ok(Expr::In {
                    element: Box::new(left),
                    collection: Box::new(right),
                });
            }
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(binop(op, left, right))
    }

    /// additive = unary ("+" unary)*
    fn parse_additive(&mut self) -> Result<Expr, MigrationError> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::Plus) {
            self.advance();
            let right = self.parse_unary()?;
            left = binop(BinOp::Add, left, right);
        }
        Ok(left)
    }

    /// unary = "!" unary | postfix
    fn parse_unary(&mut self) -> Result<Expr, MigrationError> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let expr = self.parse_unary()?;
            return Ok(Expr::UnaryNot(Box::new(expr)));
        }
        self.parse_postfix()
    }

    /// postfix = primary ("." ident ("(" args ")")?)*
    fn parse_postfix(&mut self) -> Result<Expr, MigrationError> {
        let mut expr = self.parse_primary()?;
        while self.peek() == Some(&Token::Dot) {
            self.advance();
            let Some(Token::Ident(name)) = self.advance() else {
                return Err(invalid("expected identifier after `.`"));
            };
            if self.peek() == Some(&Token::LParen) {
                self.advance();
                let mut args = vec![expr];
                args.extend(self.parse_args(Token::RParen)?);
                expr = call(&name, args)?;
            } else if let Expr::Path(ref mut segments) = expr {
                segments.push(name);
            } else {
                return Err(invalid(format!(
                    "field access `.{name}` is only supported on variables"
                )));
            }
        }
        Ok(expr)
    }

    /// Comma-separated expressions up to `close`, which is consumed.
    fn parse_args(&mut self, close: Token) -> Result<Vec<Expr>, MigrationError> {
        let mut args = Vec::new();
        if self.peek() == Some(&close) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(ref t) if *t == close => return Ok(args),
                _ => return Err(invalid(format!("expected `,` or {close:?}"))),
            }
        }
    }

    /// primary = literal | ident ("(" args ")")? | "[" args "]" | "(" expr ")"
    fn parse_primary(&mut self) -> Result<Expr, MigrationError> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Literal(LitValue::Int(n))),
            Some(Token::Float(f)) => Ok(Expr::Literal(LitValue::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(LitValue::Str(s))),
            Some(Token::True) => Ok(Expr::Literal(LitValue::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(LitValue::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(LitValue::Null)),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.advance();
                    let args = self.parse_args(Token::RParen)?;
                    return call(&name, args);
                }
                Ok(Expr::Path(vec![name]))
            }
            Some(Token::LBracket) => Ok(Expr::List(self.parse_args(Token::RBracket)?)),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "closing parenthesis `)`")?;
                Ok(expr)
            }
            other => Err(invalid(format!("unexpected token: {other:?}"))),
        }
    }
}

fn binop(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::BinOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn call(name: &str, args: Vec<Expr>) -> Result<Expr, MigrationError> {
    let function = Function::parse(name).ok_or_else(|| invalid(format!("unknown function `{name}`")))?;
    if args.len() != function.arity() {
        return Err(invalid(format!(
            "`{name}` takes {} argument(s), got {}",
            function.arity(),
            args.len()
        )));
    }
    Ok(Expr::Call { function, args })
}

/// Parse an expression string into an AST.
pub fn parse_expression(input: &str) -> Result<Expr, MigrationError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(invalid("empty expression"));
    }
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(invalid(format!(
            "unexpected trailing token: {:?}",
            parser.tokens[parser.pos]
        )));
    }
    Ok(expr)
}

// ─── Compilation ────────────────────────────────────────────────────────

/// A parsed expression checked against a fixed set of root variables.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    expr: Expr,
    /// Literal `matches` patterns, compiled once.
    regexes: HashMap<String, Regex>,
}

impl CompiledExpression {
    pub fn compile(source: &str, variables: &[&str]) -> Result<Self, MigrationError> {
        let expr = parse_expression(source)?;
        let mut regexes = HashMap::new();
        check(&expr, source, variables, &mut regexes)?;
        Ok(Self {
            source: source.to_string(),
            expr,
            regexes,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, facts: &Value) -> Result<Value, MigrationError> {
        Evaluator {
            facts,
            regexes: &self.regexes,
        }
        .eval(&self.expr)
    }

    pub fn evaluate_bool(&self, facts: &Value) -> Result<bool, MigrationError> {
        match self.evaluate(facts)? {
            Value::Bool(b) => Ok(b),
            other => Err(MigrationError::Evaluation(format!(
                "`{}` must evaluate to a boolean, got {other}",
                self.source
            ))),
        }
    }
}

fn check(
    expr: &Expr,
    source: &str,
    variables: &[&str],
    regexes: &mut HashMap<String, Regex>,
) -> Result<(), MigrationError> {
    match expr {
        Expr::Literal(_) => Ok(()),
        Expr::Path(segments) => {
            let root = segments.first().map(String::as_str).unwrap_or_default();
            if variables.contains(&root) {
                Ok(())
            } else {
                Err(MigrationError::UndefinedVariable {
                    name: root.to_string(),
                    expression: source.to_string(),
                })
            }
        }
        Expr::List(items) => items
            .iter()
            .try_for_each(|e| check(e, source, variables, regexes)),
        Expr::BinOp { left, right, .. } => {
            check(left, source, variables, regexes)?;
            check(right, source, variables, regexes)
        }
        Expr::UnaryNot(inner) => check(inner, source, variables, regexes),
        Expr::In {
            element,
            collection,
        } => {
            check(element, source, variables, regexes)?;
            check(collection, source, variables, regexes)
        }
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => {
            check(condition, source, variables, regexes)?;
            check(then, source, variables, regexes)?;
            check(otherwise, source, variables, regexes)
        }
        Expr::Call { function, args } => {
            if let (Function::Matches, Some(Expr::Literal(LitValue::Str(pattern)))) =
                (function, args.get(1))
            {
                let regex = Regex::new(pattern)
                    .map_err(|e| invalid(format!("invalid regex `{pattern}`: {e}")))?;
                regexes.insert(pattern.clone(), regex);
            }
            args.iter()
                .try_for_each(|e| check(e, source, variables, regexes))
        }
    }
}

// ─── Evaluator ──────────────────────────────────────────────────────────

struct Evaluator<'a> {
    facts: &'a Value,
    regexes: &'a HashMap<String, Regex>,
}

fn eval_error(message: impl Into<String>) -> MigrationError {
    MigrationError::Evaluation(message.into())
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, MigrationError> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LitValue::Int(n) => Value::from(*n),
                LitValue::Float(f) => float(*f),
                LitValue::Str(s) => Value::String(s.clone()),
                LitValue::Bool(b) => Value::Bool(*b),
                LitValue::Null => Value::Null,
            }),
            Expr::Path(segments) => {
                let mut current = self.facts;
                for seg in segments {
                    current = current.get(seg).unwrap_or(&Value::Null);
                }
                Ok(current.clone())
            }
            Expr::List(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|e| self.eval(e))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::UnaryNot(inner) => match self.eval(inner)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Err(eval_error("`!` operator requires a boolean operand")),
            },
            Expr::In {
                element,
                collection,
            } => {
                let elem = self.eval(element)?;
                let found = match self.eval(collection)? {
                    Value::Array(items) => items.iter().any(|item| values_equal(item, &elem)),
                    Value::Object(map) => elem.as_str().is_some_and(|k| map.contains_key(k)),
                    Value::String(haystack) => elem.as_str().is_some_and(|n| haystack.contains(n)),
                    Value::Null => false,
                    _ => {
                        return Err(eval_error(
                            "`in` operator requires a list, object or string on the right side",
                        ))
                    }
                };
                Ok(Value::Bool(found))
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => match self.eval(condition)? {
                Value::Bool(true) => self.eval(then),
                Value::Bool(false) => self.eval(otherwise),
                _ => Err(eval_error("`?:` condition must be a boolean")),
            },
            Expr::BinOp { op, left, right } => self.eval_binop(*op, left, right),
            Expr::Call { function, args } => self.eval_call(*function, args),
        }
    }

    fn eval_binop(&self, op: BinOp, left: &Expr, right: &Expr) -> Result<Value, MigrationError> {
        let l = self.eval(left)?;
        match op {
            BinOp::And | BinOp::Or => {
                let Value::Bool(a) = l else {
                    return Err(eval_error("`&&` and `||` require boolean operands"));
                };
                // short-circuit
                if (op == BinOp::And && !a) || (op == BinOp::Or && a) {
                    return Ok(Value::Bool(a));
                }
                match self.eval(right)? {
                    Value::Bool(b) => Ok(Value::Bool(b)),
                    _ => Err(eval_error("`&&` and `||` require boolean operands")),
                }
            }
            BinOp::Eq => Ok(Value::Bool(values_equal(&l, &self.eval(right)?))),
            BinOp::Ne => Ok(Value::Bool(!values_equal(&l, &self.eval(right)?))),
            BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le => {
                let r = self.eval(right)?;
                let ordering = compare(&l, &r).ok_or_else(|| {
                    eval_error("comparison operator requires two numbers or two strings")
                })?;
                let result = match op {
                    BinOp::Gt => ordering == Ordering::Greater,
                    BinOp::Lt => ordering == Ordering::Less,
                    BinOp::Ge => ordering != Ordering::Less,
                    _ => ordering != Ordering::Greater,
                };
                Ok(Value::Bool(result))
            }
            BinOp::Add => add(l, self.eval(right)?),
        }
    }

    fn eval_call(&self, function: Function, args: &[Expr]) -> Result<Value, MigrationError> {
        let values = args
            .iter()
            .map(|e| self.eval(e))
            .collect::<Result<Vec<_>, _>>()?;
        let subject = &values[0];
        match function {
            Function::Size => Ok(Value::from(match subject {
                Value::String(s) => s.chars().count(),
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                Value::Null => 0,
                _ => return Err(eval_error("`size` requires a string, list or object")),
            })),
            Function::Lower | Function::Upper => match subject {
                Value::String(s) if function == Function::Lower => Ok(Value::String(s.to_lowercase())),
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                Value::Null => Ok(Value::Null),
                _ => Err(eval_error("`lower` and `upper` require a string")),
            },
            Function::Contains => match subject {
                Value::Array(items) => Ok(Value::Bool(items.iter().any(|i| values_equal(i, &values[1])))),
                _ => self.string_predicate(function, subject, &values[1]),
            },
            Function::Matches | Function::StartsWith | Function::EndsWith => {
                self.string_predicate(function, subject, &values[1])
            }
        }
    }

    /// Null subjects never match, so rules can test optional fields.
    fn string_predicate(
        &self,
        function: Function,
        subject: &Value,
        arg: &Value,
    ) -> Result<Value, MigrationError> {
        let s = match subject {
            Value::String(s) => s.as_str(),
            Value::Null => return Ok(Value::Bool(false)),
            _ => return Err(eval_error(format!("`{function:?}` requires a string subject"))),
        };
        let Value::String(arg) = arg else {
            return Err(eval_error(format!("`{function:?}` requires a string argument")));
        };
        let result = match function {
            Function::StartsWith => s.starts_with(arg.as_str()),
            Function::EndsWith => s.ends_with(arg.as_str()),
            Function::Contains => s.contains(arg.as_str()),
            _ => match self.regexes.get(arg) {
                Some(regex) => regex.is_match(s),
                None => Regex::new(arg)
                    .map_err(|e| eval_error(format!("invalid regex `{arg}`: {e}")))?
                    .is_match(s),
            },
        };
        Ok(Value::Bool(result))
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn add(l: Value, r: Value) -> Result<Value, MigrationError> {
    match (l, r) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x
                .checked_add(y)
                .map(Value::from)
                .ok_or_else(|| eval_error("integer overflow in `+`")),
            _ => Ok(float(x.as_f64().unwrap_or_default() + y.as_f64().unwrap_or_default())),
        },
        (Value::String(x), Value::String(y)) => Ok(Value::String(x + &y)),
        (Value::String(x), other @ (Value::Number(_) | Value::Bool(_))) => {
            Ok(Value::String(format!("{x}{other}")))
        }
        (other @ (Value::Number(_) | Value::Bool(_)), Value::String(y)) => {
            Ok(Value::String(format!("{other}{y}")))
        }
        _ => Err(eval_error("`+` requires numbers or strings")),
    }
}
