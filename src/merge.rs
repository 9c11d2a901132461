//! Merge Engine: splices a delta fragment in front of the last closing `end`
//! of an existing spec without parsing it.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::MergeError;

static RE_LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#.*$").unwrap());

/// Whether a line is the closing construct once its comment is removed.
fn is_closing_line(line: &str) -> bool {
    RE_LINE_COMMENT.replace(line, "").trim() == "end"
}

/// Drop everything from the last closing `end` onward, append `delta`, and
/// close the file again with a single `end` line.
///
/// An empty delta just re-closes the file, so a spec ending in `end\n`
/// comes back unchanged.
pub fn merge(existing: &str, delta: &str) -> Result<String, MergeError> {
    let lines: Vec<&str> = existing.lines().collect();
    let closing = lines
        .iter()
        .rposition(|line| is_closing_line(line))
        .ok_or(MergeError::NoClosingLine)?;

    let has_prefix = closing > 0;
    let mut code = lines[..closing].join("\n");
    let delta = delta.strip_suffix('\n').unwrap_or(delta);
    if !delta.is_empty() {
        if has_prefix {
            code.push('\n');
        }
        code.push_str(delta);
    }
    if has_prefix || !delta.is_empty() {
        code.push('\n');
    }
    code.push_str("end\n");
    Ok(code)
}
