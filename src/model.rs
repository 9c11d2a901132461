//! Declaration model extracted from a Ruby source file.

use std::path::PathBuf;

/// Name RDoc-style analysis gives to `initialize`.
pub const CONSTRUCTOR: &str = "new";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Class,
    Module,
}

/// The class or module chosen as the subject of generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Enclosing namespaces, outermost first, then the type name itself.
    pub qualified_name: Vec<String>,
    pub kind: DeclKind,
    /// Discovery order; duplicates only when the source defines a name twice.
    pub operations: Vec<Operation>,
    pub source_path: PathBuf,
}

impl Declaration {
    /// Terminal type name, e.g. `Bar` for `Foo::Bar`.
    pub fn name(&self) -> &str {
        self.qualified_name.last().map(String::as_str).unwrap_or_default()
    }

    /// `Foo::Bar`
    pub fn complete_name(&self) -> String {
        self.qualified_name.join("::")
    }

    pub fn constructor(&self) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.singleton && op.name == CONSTRUCTOR)
    }

    /// Public operations other than the constructor, in discovery order.
    pub fn generation_targets(&self) -> Vec<&Operation> {
        self.operations
            .iter()
            .filter(|op| op.is_generation_target())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    /// Defined on the type itself (`def self.x`, `class << self`, `module_function`).
    pub singleton: bool,
    pub params: Vec<Param>,
    /// Parameter text as written, parentheses included when present.
    pub raw_params: String,
    /// Arguments of the first `yield` in the body; `None` if the body never yields.
    pub block_params: Option<Vec<String>>,
    pub visibility: Visibility,
    pub line: usize,
}

impl Operation {
    pub fn is_generation_target(&self) -> bool {
        self.visibility == Visibility::Public && self.name != CONSTRUCTOR
    }

    /// `.name` for singleton operations, `#name` for instance operations.
    pub fn decorated_name(&self) -> String {
        let prefix = if self.singleton { '.' } else { '#' };
        format!("{}{}", prefix, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Required,
    Optional,
    /// `*args`, also `...` forwarding (unnamed)
    Rest,
    KeywordRequired,
    KeywordOptional,
    KeywordRest,
    Block,
}

/// A single declared parameter with default values and markers stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A `scope :name, ...` declaration found anywhere in the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedScope {
    pub name: String,
}
