//! Error taxonomy for analysis, rendering, merging and per-file generation.

use std::path::PathBuf;
use thiserror::Error;

/// Source text could not be turned into a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("undefined template variable: {0}")]
    UndefinedVariable(String),

    #[error("invalid template at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("no closing `end` line found in existing spec")]
    NoClosingLine,
}

/// Everything that can abort generation for a single source file.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("class/module not found")]
    TargetNotFound,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerateError::Io {
            path: path.into(),
            source,
        }
    }
}
