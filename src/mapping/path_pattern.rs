use regex::Regex;

use crate::errors::MigrationError;

/// A Ranger resource path expression, compiled to an anchored regex.
///
/// `*` matches any run of characters (including `/`), `?` matches one
/// character. A recursive pattern also covers everything below it.
#[derive(Debug, Clone)]
pub struct RangerPathPattern {
    regex: Regex,
}

impl RangerPathPattern {
    pub fn compile(pattern: &str, recursive: bool) -> Result<Self, MigrationError> {
        let alternatives: Vec<String> = expand(pattern, recursive)
            .iter()
            .map(|p| format!("(?:{})", wildcard_to_regex(p)))
            .collect();
        let full = format!("^(?:{})$", alternatives.join("|"));
        let regex = Regex::new(&full).map_err(|e| {
            MigrationError::InvalidConfig(format!("invalid Ranger path pattern `{pattern}`: {e}"))
        })?;
        Ok(Self { regex })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

fn expand(pattern: &str, recursive: bool) -> Vec<String> {
    if !recursive || pattern.ends_with('*') {
        vec![pattern.to_string()]
    } else if pattern.ends_with('/') {
        vec![format!("{pattern}*")]
    } else {
        vec![pattern.to_string(), format!("{pattern}/*")]
    }
}

/// Escape regex meta, then restore wildcards: * -> .*, ? -> .
fn wildcard_to_regex(pattern: &str) -> String {
    regex::escape(pattern)
        .replace("\\*", ".*")
        .replace("\\?", ".")
}
