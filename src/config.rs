//! Generation settings, built once from the command line.

use regex::Regex;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for spec files, without a trailing `/`.
    pub spec_dir: String,
    /// Replaces the built-in frame for new spec files.
    pub full_template: Option<String>,
    /// Replaces the built-in frame for fragments appended to existing specs.
    pub delta_template: Option<String>,
    /// Rails conventions: `rails_helper`, typed specs, controller/model/helper styles.
    pub framework_mode: bool,
    /// Add missing examples to specs that already exist.
    pub append: bool,
    pub dry_run: bool,
    /// Existing specs matching any of these are never touched.
    pub exclusions: Vec<Regex>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new("./spec")
    }
}

impl Config {
    pub fn new(spec_dir: &str) -> Self {
        Self {
            spec_dir: normalize_dir(spec_dir),
            full_template: None,
            delta_template: None,
            framework_mode: false,
            append: false,
            dry_run: false,
            exclusions: Vec::new(),
        }
    }

    /// Compile exclusion patterns, failing on the first invalid one.
    pub fn with_exclusions(mut self, patterns: &[String]) -> Result<Self, regex::Error> {
        self.exclusions = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }
}

fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() && !dir.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
