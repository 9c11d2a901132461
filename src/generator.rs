//! Orchestrator: analyze a source file, then create its spec or append the
//! examples it is missing.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::coverage;
use crate::error::GenerateError;
use crate::merge::merge;
use crate::parser::{analyze, Analysis};
use crate::paths;
use crate::render::{create_renderer, RenderContext, Style};

/// What happened to the spec of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created(PathBuf),
    Modified(PathBuf),
    /// A spec exists and appending was not requested.
    AlreadyExists(PathBuf),
    /// Appending found nothing missing.
    UpToDate(PathBuf),
    /// The existing spec matched an exclusion pattern.
    Excluded(PathBuf),
    /// Text that would have been written.
    DryRun { path: PathBuf, code: String },
}

/// Write a new spec for `source`, or extend the existing one when
/// `config.append` is set.
pub fn write_spec(source: &Path, config: &Config) -> Result<Outcome, GenerateError> {
    let text = fs::read_to_string(source).map_err(|e| GenerateError::io(source, e))?;
    let analysis = analyze(&text, source)?.ok_or(GenerateError::TargetNotFound)?;

    let spec_path = paths::spec_path(source, &config.spec_dir);
    let style = Style::select(config.framework_mode, &source.to_string_lossy());
    debug!(
        source = %source.display(),
        spec = %spec_path.display(),
        ?style,
        "generating"
    );

    if config.append && spec_path.exists() {
        append_to_existing(&analysis, source, spec_path, style, config)
    } else {
        create_new(&analysis, source, spec_path, style, config)
    }
}

fn create_new(
    analysis: &Analysis,
    source: &Path,
    spec_path: PathBuf,
    style: Style,
    config: &Config,
) -> Result<Outcome, GenerateError> {
    let declaration = &analysis.declaration;
    let ctx = RenderContext {
        declaration,
        operations: declaration.generation_targets(),
        scopes: if style.renders_scopes() {
            analysis.scopes.iter().collect()
        } else {
            Vec::new()
        },
        style,
        source_path: source,
        spec_path: &spec_path,
        full: true,
        framework_mode: config.framework_mode,
    };
    let code = create_renderer(style, config.full_template.as_deref()).render(&ctx)?;
    let examples = ctx.operations.len() + ctx.scopes.len();

    if config.dry_run {
        return Ok(Outcome::DryRun {
            path: spec_path,
            code,
        });
    }
    if spec_path.exists() {
        return Ok(Outcome::AlreadyExists(spec_path));
    }
    if let Some(parent) = spec_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| GenerateError::io(parent, e))?;
    }
    fs::write(&spec_path, &code).map_err(|e| GenerateError::io(&spec_path, e))?;
    info!(spec = %spec_path.display(), examples, "created spec");
    Ok(Outcome::Created(spec_path))
}

fn append_to_existing(
    analysis: &Analysis,
    source: &Path,
    spec_path: PathBuf,
    style: Style,
    config: &Config,
) -> Result<Outcome, GenerateError> {
    let existing = read_artifact(&spec_path);
    if coverage::is_excluded(&existing, &config.exclusions) {
        info!(spec = %spec_path.display(), "existing spec matches an exclusion pattern");
        return Ok(Outcome::Excluded(spec_path));
    }

    let declaration = &analysis.declaration;
    let operations = coverage::missing_operations(&declaration.generation_targets(), &existing);
    let scopes = if style.renders_scopes() {
        coverage::missing_scopes(&analysis.scopes, &existing)
    } else {
        Vec::new()
    };
    if operations.is_empty() && scopes.is_empty() {
        debug!(spec = %spec_path.display(), "nothing missing");
        return Ok(Outcome::UpToDate(spec_path));
    }
    debug!(
        spec = %spec_path.display(),
        operations = operations.len(),
        scopes = scopes.len(),
        "appending missing examples"
    );

    let ctx = RenderContext {
        declaration,
        operations,
        scopes,
        style,
        source_path: source,
        spec_path: &spec_path,
        full: false,
        framework_mode: config.framework_mode,
    };
    let delta = create_renderer(style, config.delta_template.as_deref()).render(&ctx)?;
    let code = merge(&existing, &delta)?;

    if config.dry_run {
        return Ok(Outcome::DryRun {
            path: spec_path,
            code,
        });
    }
    fs::write(&spec_path, &code).map_err(|e| GenerateError::io(&spec_path, e))?;
    Ok(Outcome::Modified(spec_path))
}

/// Existing spec text; an unreadable spec counts as empty.
fn read_artifact(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        warn!(spec = %path.display(), error = %e, "could not read existing spec");
        String::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;
    use tempfile::TempDir;

    fn setup(source: &str) -> (TempDir, PathBuf, Config) {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("lib/foo.rb");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, source).unwrap();
        let config = Config::new(dir.path().join("spec").to_str().unwrap());
        (dir, src, config)
    }

    fn spec_for(src: &Path, config: &Config) -> PathBuf {
        paths::spec_path(src, &config.spec_dir)
    }

    #[test]
    fn creates_then_reports_existing() {
        let (_dir, src, config) = setup("class Foo\n  def hello; end\nend\n");
        let spec = spec_for(&src, &config);
        assert_eq!(write_spec(&src, &config).unwrap(), Outcome::Created(spec.clone()));
        let text = fs::read_to_string(&spec).unwrap();
        assert!(text.contains("describe '#hello' do"));
        assert_eq!(write_spec(&src, &config).unwrap(), Outcome::AlreadyExists(spec));
    }

    #[test]
    fn appends_only_missing_operations() {
        let (_dir, src, mut config) = setup("class Foo\n  def hello; end\nend\n");
        write_spec(&src, &config).unwrap();
        fs::write(&src, "class Foo\n  def hello; end\n  def bye?; end\nend\n").unwrap();

        config.append = true;
        let spec = spec_for(&src, &config);
        assert_eq!(write_spec(&src, &config).unwrap(), Outcome::Modified(spec.clone()));
        let text = fs::read_to_string(&spec).unwrap();
        assert_eq!(text.matches("describe '#hello'").count(), 1);
        assert_eq!(text.matches("describe '#bye?'").count(), 1);
        assert!(text.ends_with("  end\nend\n"));

        assert_eq!(write_spec(&src, &config).unwrap(), Outcome::UpToDate(spec.clone()));
        assert_eq!(fs::read_to_string(&spec).unwrap(), text);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let (_dir, src, mut config) = setup("class Foo\n  def hello; end\nend\n");
        config.dry_run = true;
        let spec = spec_for(&src, &config);
        match write_spec(&src, &config).unwrap() {
            Outcome::DryRun { path, code } => {
                assert_eq!(path, spec);
                assert!(code.starts_with("# frozen_string_literal: true\n"));
            }
            other => panic!("expected dry run, got {:?}", other),
        }
        assert!(!spec.exists());
    }

    #[test]
    fn excluded_spec_is_left_alone() {
        let (_dir, src, mut config) = setup("class Foo\n  def hello; end\nend\n");
        let spec = spec_for(&src, &config);
        fs::create_dir_all(spec.parent().unwrap()).unwrap();
        let original = "RSpec.describe Foo do\n  it_behaves_like 'a service'\nend\n";
        fs::write(&spec, original).unwrap();

        config.append = true;
        config = config.with_exclusions(&["it_behaves_like".to_string()]).unwrap();
        assert_eq!(write_spec(&src, &config).unwrap(), Outcome::Excluded(spec.clone()));
        assert_eq!(fs::read_to_string(&spec).unwrap(), original);
    }

    #[test]
    fn no_declaration_is_target_not_found() {
        let (_dir, src, config) = setup("puts 1\n");
        assert!(matches!(
            write_spec(&src, &config),
            Err(GenerateError::TargetNotFound)
        ));
        assert!(!spec_for(&src, &config).exists());
    }

    #[test]
    fn unclosed_existing_spec_is_merge_error() {
        let (_dir, src, mut config) = setup("class Foo\n  def hello; end\nend\n");
        let spec = spec_for(&src, &config);
        fs::create_dir_all(spec.parent().unwrap()).unwrap();
        fs::write(&spec, "# nothing here\n").unwrap();
        config.append = true;
        assert!(matches!(
            write_spec(&src, &config),
            Err(GenerateError::Merge(MergeError::NoClosingLine))
        ));
        assert_eq!(fs::read_to_string(&spec).unwrap(), "# nothing here\n");
    }

    #[test]
    fn missing_source_is_io_error() {
        let config = Config::default();
        let err = write_spec(Path::new("/nonexistent/dir/x.rb"), &config).unwrap_err();
        assert!(matches!(err, GenerateError::Io { .. }));
    }

    #[test]
    fn parse_error_aborts_file() {
        let (_dir, src, config) = setup("class Foo\n  def hello\nend\n");
        assert!(matches!(write_spec(&src, &config), Err(GenerateError::Parse(_))));
    }
}
