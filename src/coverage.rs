//! Coverage Differ: which operations and named scopes an existing spec
//! already mentions, judged by quoted example titles.

use regex::Regex;

use crate::model::{NamedScope, Operation};

/// Quoted example title an operation's spec is expected to contain,
/// e.g. `'#hello'` or `'.build'`.
pub fn signature(op: &Operation) -> String {
    format!("'{}'", op.decorated_name())
}

/// `'.active'`
pub fn scope_signature(scope: &NamedScope) -> String {
    format!("'.{}'", scope.name)
}

/// Operations whose signature does not occur literally in `existing`.
pub fn missing_operations<'a>(ops: &[&'a Operation], existing: &str) -> Vec<&'a Operation> {
    ops.iter()
        .copied()
        .filter(|op| !existing.contains(&signature(op)))
        .collect()
}

pub fn missing_scopes<'a>(scopes: &'a [NamedScope], existing: &str) -> Vec<&'a NamedScope> {
    scopes
        .iter()
        .filter(|scope| !existing.contains(&scope_signature(scope)))
        .collect()
}

/// Whether any exclusion pattern matches the existing spec text, in which
/// case the spec is left alone entirely.
pub fn is_excluded(existing: &str, exclusions: &[Regex]) -> bool {
    exclusions.iter().any(|re| re.is_match(existing))
}
