//! specgen: generate RSpec stubs from Ruby source files.
//!
//! Creates `spec/<path>_spec.rb` for each source file, or with `--force`
//! appends examples for methods the existing spec does not mention yet:
//!
//! - `specgen lib/foo/bar.rb`
//! - `specgen -f -o spec lib/`
//! - `specgen -r 'app/controllers/*.rb'`

mod config;
mod coverage;
mod error;
mod generator;
mod merge;
mod model;
mod parser;
mod paths;
mod render;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use config::Config;
use error::GenerateError;
use generator::Outcome;

#[derive(Parser)]
#[command(
    name = "specgen",
    about = "Generate RSpec stubs from Ruby source files and append missing examples"
)]
struct Cli {
    /// Ruby source files, directories or glob patterns
    #[arg(required = true)]
    files: Vec<String>,

    /// Directory the spec tree is written to
    #[arg(short = 'o', long, default_value = "./spec")]
    spec_dir: String,

    /// Append missing examples to specs that already exist
    #[arg(short = 'f', long)]
    force: bool,

    /// Print the spec to stdout instead of writing it
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Rails mode: rails_helper and controller/model/helper spec types
    #[arg(short = 'r', long)]
    rails: bool,

    /// Template file for new specs. Supports ${name} substitution.
    #[arg(long)]
    full_template: Option<PathBuf>,

    /// Template file for examples appended to existing specs.
    #[arg(long)]
    delta_template: Option<PathBuf>,

    /// Leave existing specs matching this regex untouched.
    /// Can be specified multiple times.
    #[arg(short = 'x', long = "exclude")]
    exclude: Vec<String>,

    /// Log analysis and generation details to stderr
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli)?;
    let input_files = expand_globs(&cli.files)?;
    if input_files.is_empty() {
        bail!("no Ruby source files found");
    }

    for path in &input_files {
        report(path, generator::write_spec(path, &config));
    }
    Ok(())
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose { "specgen=debug" } else { "specgen=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::new(&cli.spec_dir)
        .with_exclusions(&cli.exclude)
        .context("invalid --exclude pattern")?;
    config.append = cli.force;
    config.dry_run = cli.dry_run;
    config.framework_mode = cli.rails;
    config.full_template = read_template(cli.full_template.as_deref())?;
    config.delta_template = read_template(cli.delta_template.as_deref())?;
    Ok(config)
}

fn read_template(path: Option<&Path>) -> Result<Option<String>> {
    path.map(|p| {
        fs::read_to_string(p).with_context(|| format!("failed to read template: {}", p.display()))
    })
    .transpose()
}

/// Print the per-file status line. Failures never stop the remaining files.
fn report(source: &Path, result: Result<Outcome, GenerateError>) {
    match result {
        Ok(Outcome::Created(spec)) => println!("{} created.", spec.display()),
        Ok(Outcome::Modified(spec)) => println!("{} modified.", spec.display()),
        Ok(Outcome::AlreadyExists(spec)) => println!("{} already exists.", spec.display()),
        Ok(Outcome::Excluded(spec)) => println!("{} skipped (excluded).", spec.display()),
        Ok(Outcome::UpToDate(spec)) => {
            tracing::info!(spec = %spec.display(), "spec is up to date");
        }
        Ok(Outcome::DryRun { path, code }) => {
            println!("----- {} -----", path.display());
            print!("{}", code);
        }
        Err(GenerateError::TargetNotFound) => {
            eprintln!("{} skipped (Class/Module not found).", source.display());
        }
        Err(e) => eprintln!("{} aborted - {}", source.display(), e),
    }
}

/// Resolve command-line inputs into Ruby source files.
///
/// A directory stands for its own `*.rb` files (not recursive); anything
/// that is neither a file nor a directory is a glob pattern.
fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        let (expanded, warn_if_empty) = if path.is_dir() {
            let dir = glob::Pattern::escape(pattern.trim_end_matches('/'));
            (format!("{}/*.rb", dir), false)
        } else {
            (pattern.clone(), true)
        };
        let matches: Vec<PathBuf> = glob::glob(&expanded)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() && warn_if_empty {
            eprintln!("warning: no files matched: {}", pattern);
        }
        files.extend(matches);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn directory_scan_picks_ruby_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.rb"), "").unwrap();
        fs::write(dir.path().join("a.rb"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested.rb")).unwrap();

        let files = expand_globs(&[dir.path().to_str().unwrap().to_string()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.rb", "b.rb"]);
    }

    #[test]
    fn directory_name_is_taken_literally() {
        let dir = TempDir::new().unwrap();
        let odd = dir.path().join("lib[v1]");
        fs::create_dir(&odd).unwrap();
        fs::write(odd.join("a.rb"), "").unwrap();
        let dir_arg = format!("{}/", odd.to_str().unwrap());
        let files = expand_globs(&[dir_arg]).unwrap();
        assert_eq!(files, vec![odd.join("a.rb")]);
    }

    #[test]
    fn duplicates_are_removed() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.rb");
        fs::write(&file, "").unwrap();
        let as_file = file.to_str().unwrap().to_string();
        let as_glob = format!("{}/*.rb", dir.path().to_str().unwrap());
        assert_eq!(expand_globs(&[as_file, as_glob]).unwrap().len(), 1);
    }

    #[test]
    fn missing_template_is_error() {
        assert!(read_template(Some(Path::new("/nonexistent/template.erb"))).is_err());
        assert!(read_template(None).unwrap().is_none());
    }
}
