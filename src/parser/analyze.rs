//! Source Analyzer: picks the generation target out of a syntax tree and
//! records its operations, plus every named scope in the file.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::syntax::{parse, Arg, Call, Def, Namespace, Node};
use crate::error::ParseError;
use crate::model::{DeclKind, Declaration, NamedScope, Operation, Visibility, CONSTRUCTOR};

static RE_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z_][A-Za-z0-9_]*").unwrap());

const RESERVED_BLOCK_NAMES: &[&str] = &["self", "nil", "true", "false"];

/// Result of analyzing one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub declaration: Declaration,
    /// Every `scope :name` in the file, first occurrence order, no duplicates.
    pub scopes: Vec<NamedScope>,
}

/// Parse `source` and extract its target declaration.
///
/// Returns `Ok(None)` when the file declares no class or module.
pub fn analyze(source: &str, path: &Path) -> Result<Option<Analysis>, ParseError> {
    let nodes = parse(source)?;
    let scopes = named_scopes(&nodes);

    let Some(target) = find_target(&[nodes.as_slice()], &[]) else {
        debug!(path = %path.display(), "no class or module declared");
        return Ok(None);
    };

    let operations = target
        .bodies
        .iter()
        .fold(Vec::new(), |ops, body| collect(body, DefListState::default(), ops).1);

    let declaration = Declaration {
        qualified_name: target.qualified_name,
        kind: target.kind,
        operations,
        source_path: path.to_path_buf(),
    };
    debug!(
        path = %path.display(),
        target = %declaration.complete_name(),
        openings = target.bodies.len(),
        operations = declaration.operations.len(),
        scopes = scopes.len(),
        "analyzed source"
    );
    Ok(Some(Analysis {
        declaration,
        scopes,
    }))
}

// -- Target selection ---------------------------------------------------------

struct Target<'n> {
    qualified_name: Vec<String>,
    kind: DeclKind,
    /// The body of every opening of the target at its nesting level.
    bodies: Vec<&'n [Node]>,
}

/// The first class at this level wins; otherwise descend into the first
/// module, which becomes the target itself when it holds no nested type.
fn find_target<'n>(bodies: &[&'n [Node]], enclosing: &[String]) -> Option<Target<'n>> {
    let found: Vec<(DeclKind, &'n Namespace)> =
        bodies.iter().flat_map(|body| declarations_at(body)).collect();

    let openings = |kind: DeclKind, path: &[String]| -> Vec<&'n [Node]> {
        found
            .iter()
            .filter(|(k, ns)| *k == kind && ns.path == path)
            .map(|(_, ns)| ns.body.as_slice())
            .collect()
    };
    let qualify = |path: &[String]| -> Vec<String> {
        enclosing.iter().chain(path).cloned().collect()
    };

    if let Some((_, class)) = found.iter().find(|(k, _)| *k == DeclKind::Class) {
        return Some(Target {
            qualified_name: qualify(&class.path),
            kind: DeclKind::Class,
            bodies: openings(DeclKind::Class, &class.path),
        });
    }

    let (_, module) = found.iter().find(|(k, _)| *k == DeclKind::Module)?;
    let name = qualify(&module.path);
    let module_bodies = openings(DeclKind::Module, &module.path);
    find_target(&module_bodies, &name).or(Some(Target {
        qualified_name: name,
        kind: DeclKind::Module,
        bodies: module_bodies,
    }))
}

/// Classes and modules declared directly at this level, looking through
/// conditionals and blocks but not into method or type bodies.
fn declarations_at(nodes: &[Node]) -> Vec<(DeclKind, &Namespace)> {
    nodes
        .iter()
        .flat_map(|node| match node {
            Node::Class(ns) => vec![(DeclKind::Class, ns)],
            Node::Module(ns) => vec![(DeclKind::Module, ns)],
            Node::Group(inner) => declarations_at(inner),
            Node::Call(call) => declarations_at(&call.body),
            _ => Vec::new(),
        })
        .collect()
}

// -- Operations ---------------------------------------------------------------

/// Visibility state of one definition list, threaded through the walk.
#[derive(Debug, Clone, Copy, Default)]
struct DefListState {
    visibility: Visibility,
    /// After a bare `module_function`.
    module_function: bool,
    /// Inside `class << self`.
    singleton: bool,
}

fn collect(
    nodes: &[Node],
    state: DefListState,
    ops: Vec<Operation>,
) -> (DefListState, Vec<Operation>) {
    nodes
        .iter()
        .fold((state, ops), |(state, ops), node| visit(node, state, ops))
}

fn visit(node: &Node, state: DefListState, mut ops: Vec<Operation>) -> (DefListState, Vec<Operation>) {
    match node {
        Node::Def(def) => {
            ops.push(operation(def, state, None));
            (state, ops)
        }
        Node::VCall { name, .. } => {
            let state = match (name.as_str(), visibility_of(name)) {
                (_, Some(visibility)) => DefListState {
                    visibility,
                    module_function: false,
                    ..state
                },
                ("module_function", None) => DefListState {
                    module_function: true,
                    ..state
                },
                _ => state,
            };
            (state, ops)
        }
        Node::Call(call) => apply_call(call, state, ops),
        Node::SingletonClass { body, .. } => {
            let inner = DefListState {
                singleton: true,
                ..DefListState::default()
            };
            (state, collect(body, inner, ops).1)
        }
        Node::Group(inner) => collect(inner, state, ops),
        Node::Class(_) | Node::Module(_) | Node::Yield { .. } => (state, ops),
    }
}

fn visibility_of(name: &str) -> Option<Visibility> {
    match name {
        "public" => Some(Visibility::Public),
        "private" => Some(Visibility::Private),
        "protected" => Some(Visibility::Protected),
        _ => None,
    }
}

fn apply_call(
    call: &Call,
    state: DefListState,
    mut ops: Vec<Operation>,
) -> (DefListState, Vec<Operation>) {
    let symbols: Vec<&str> = call
        .args
        .iter()
        .filter_map(|arg| match arg {
            Arg::Symbol(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    let defs = call.args.iter().filter_map(|arg| match arg {
        Arg::Def(def) => Some(def),
        _ => None,
    });

    match call.name.as_str() {
        "public" | "private" | "protected" => {
            let visibility = visibility_of(&call.name).unwrap_or_default();
            ops.extend(defs.map(|def| operation(def, state, Some(visibility))));
            let ops = mark(ops, &symbols, |op| op.singleton == state.singleton, |op| {
                op.visibility = visibility
            });
            (state, ops)
        }
        "private_class_method" | "public_class_method" => {
            let visibility = if call.name == "private_class_method" {
                Visibility::Private
            } else {
                Visibility::Public
            };
            let mut names = symbols;
            for def in defs {
                ops.push(operation(def, state, None));
                names.push(def.name.as_str());
            }
            let ops = mark(ops, &names, |op| op.singleton, |op| op.visibility = visibility);
            (state, ops)
        }
        "module_function" => {
            ops.extend(defs.map(|def| {
                let state = DefListState {
                    module_function: true,
                    ..state
                };
                operation(def, state, None)
            }));
            let ops = mark(ops, &symbols, |op| !op.singleton, |op| {
                op.singleton = true;
                op.visibility = Visibility::Public;
            });
            (state, ops)
        }
        _ => {
            // `memoize def x`, `included do ... end` and the like.
            // The block body is its own scope; directives inside it stay there.
            ops.extend(defs.map(|def| operation(def, state, None)));
            (state, collect(&call.body, state, ops).1)
        }
    }
}

/// Apply `change` to every operation named in `names` that passes `filter`.
fn mark(
    ops: Vec<Operation>,
    names: &[&str],
    filter: impl Fn(&Operation) -> bool,
    change: impl Fn(&mut Operation),
) -> Vec<Operation> {
    if names.is_empty() {
        return ops;
    }
    ops.into_iter()
        .map(|mut op| {
            if names.contains(&op.name.as_str()) && filter(&op) {
                change(&mut op);
            }
            op
        })
        .collect()
}

fn operation(def: &Def, state: DefListState, forced: Option<Visibility>) -> Operation {
    let explicit_receiver = def.receiver.is_some();
    let singleton = explicit_receiver || state.singleton || state.module_function;

    let (name, singleton, visibility) = if def.name == "initialize" && !singleton {
        (CONSTRUCTOR.to_string(), true, Visibility::Public)
    } else {
        let visibility = match forced {
            Some(v) => v,
            None if explicit_receiver || state.module_function => Visibility::Public,
            None => state.visibility,
        };
        (def.name.clone(), singleton, visibility)
    };

    Operation {
        name,
        singleton,
        params: def.params.clone(),
        raw_params: def.raw_params.clone(),
        block_params: first_yield(&def.body).map(|args| block_param_names(&args)),
        visibility,
        line: def.line,
    }
}

/// Arguments of the first `yield` in a method body, ignoring nested definitions.
fn first_yield(nodes: &[Node]) -> Option<Vec<String>> {
    nodes.iter().find_map(|node| match node {
        Node::Yield { args, .. } => Some(args.clone()),
        Node::Group(inner) => first_yield(inner),
        Node::Call(call) => first_yield(&call.body),
        _ => None,
    })
}

/// Turn yielded expressions into usable block parameter names:
/// `yield item, @total, hash[:key]` gives `item, total, key`.
fn block_param_names(args: &[String]) -> Vec<String> {
    args.iter()
        .enumerate()
        .fold(Vec::new(), |mut names, (i, arg)| {
            let name = RE_IDENT
                .find_iter(arg)
                .last()
                .map(|m| m.as_str().to_string())
                .filter(|n| !RESERVED_BLOCK_NAMES.contains(&n.as_str()) && !names.contains(n))
                .unwrap_or_else(|| format!("arg{}", i + 1));
            names.push(name);
            names
        })
}

// -- Named scopes -------------------------------------------------------------

fn named_scopes(nodes: &[Node]) -> Vec<NamedScope> {
    scope_names(nodes)
        .into_iter()
        .fold(Vec::new(), |mut scopes, name| {
            if !scopes.iter().any(|s: &NamedScope| s.name == name) {
                scopes.push(NamedScope {
                    name: name.to_string(),
                });
            }
            scopes
        })
}

/// Depth-first, at any nesting depth.
fn scope_names(nodes: &[Node]) -> Vec<&str> {
    nodes
        .iter()
        .flat_map(|node| match node {
            Node::Call(call) => {
                let own = match (call.name.as_str(), call.args.first()) {
                    ("scope", Some(Arg::Symbol(name))) => Some(name.as_str()),
                    _ => None,
                };
                let in_defs = call.args.iter().flat_map(|arg| match arg {
                    Arg::Def(def) => scope_names(&def.body),
                    _ => Vec::new(),
                });
                own.into_iter()
                    .chain(in_defs)
                    .chain(scope_names(&call.body))
                    .collect()
            }
            Node::Class(ns) | Node::Module(ns) => scope_names(&ns.body),
            Node::SingletonClass { body, .. } => scope_names(body),
            Node::Def(def) => scope_names(&def.body),
            Node::Group(inner) => scope_names(inner),
            Node::VCall { .. } | Node::Yield { .. } => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParamKind;
    use proptest::prelude::*;

    fn run(src: &str) -> Analysis {
        analyze(src, Path::new("lib/sample.rb")).unwrap().unwrap()
    }

    fn names(analysis: &Analysis) -> Vec<String> {
        analysis
            .declaration
            .operations
            .iter()
            .map(|op| op.decorated_name())
            .collect()
    }

    fn find<'a>(analysis: &'a Analysis, name: &str) -> &'a Operation {
        analysis
            .declaration
            .operations
            .iter()
            .find(|op| op.name == name)
            .unwrap()
    }

    #[test]
    fn single_public_method() {
        let a = run("class Foo; def hello; end; end");
        assert_eq!(a.declaration.qualified_name, vec!["Foo"]);
        assert_eq!(a.declaration.kind, DeclKind::Class);
        let op = find(&a, "hello");
        assert!(!op.singleton);
        assert_eq!(op.visibility, Visibility::Public);
        assert_eq!(a.declaration.operations.len(), 1);
    }

    #[test]
    fn predicate_method_added_later() {
        let a = run("class Foo\n  def hello; end\n  def bye?; end\nend\n");
        assert_eq!(names(&a), vec!["#hello", "#bye?"]);
    }

    #[test]
    fn scopes_found_at_any_depth() {
        let a = run(
            "class FooModel\n  scope :active, ->{}\n  scope :active, -> { all }\n  class Inner\n    scope :nested, -> {}\n  end\nend\n",
        );
        let scopes: Vec<_> = a.scopes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(scopes, vec!["active", "nested"]);
    }

    #[test]
    fn class_nested_in_modules_is_qualified() {
        let a = run("module Foo\n  module Bar\n    class Baz\n      def x; end\n    end\n  end\nend\n");
        assert_eq!(a.declaration.complete_name(), "Foo::Bar::Baz");
        assert_eq!(names(&a), vec!["#x"]);
    }

    #[test]
    fn class_preferred_over_earlier_module() {
        let a = run("module Helpers\n  def h; end\nend\n\nclass Widget\n  def w; end\nend\n");
        assert_eq!(a.declaration.complete_name(), "Widget");
    }

    #[test]
    fn module_without_nested_type_is_target() {
        let a = run("module Util\n  def self.tidy(text); end\n  def helper; end\nend\n");
        assert_eq!(a.declaration.kind, DeclKind::Module);
        assert_eq!(names(&a), vec![".tidy", "#helper"]);
    }

    #[test]
    fn constant_path_class() {
        let a = run("class ::Admin::UsersController < ApplicationController\n  def index; end\nend\n");
        assert_eq!(a.declaration.qualified_name, vec!["Admin", "UsersController"]);
    }

    #[test]
    fn reopened_class_concatenates_operations() {
        let a = run("class Foo\n  def a; end\nend\n\nclass Foo\n  def b; end\nend\n");
        assert_eq!(names(&a), vec!["#a", "#b"]);
    }

    #[test]
    fn initialize_becomes_constructor() {
        let a = run("class Foo\n  def initialize(a, b = 1)\n  end\n  def run; end\nend\n");
        let ctor = a.declaration.constructor().unwrap();
        assert_eq!(ctor.raw_params, "(a, b = 1)");
        let targets: Vec<_> = a
            .declaration
            .generation_targets()
            .iter()
            .map(|o| o.name.clone())
            .collect();
        assert_eq!(targets, vec!["run"]);
    }

    #[test]
    fn bare_private_flips_rest_of_body() {
        let a = run(
            "class Foo\n  def a; end\n  private\n  def b; end\n  def self.c; end\n  protected\n  def d; end\n  public\n  def e; end\nend\n",
        );
        assert_eq!(find(&a, "a").visibility, Visibility::Public);
        assert_eq!(find(&a, "b").visibility, Visibility::Private);
        assert_eq!(find(&a, "c").visibility, Visibility::Public);
        assert_eq!(find(&a, "d").visibility, Visibility::Protected);
        assert_eq!(find(&a, "e").visibility, Visibility::Public);
    }

    #[test]
    fn private_with_arguments() {
        let a = run(
            "class Foo\n  def a; end\n  def b; end\n  private :a\n  private def c; end\n  def d; end\nend\n",
        );
        assert_eq!(find(&a, "a").visibility, Visibility::Private);
        assert_eq!(find(&a, "b").visibility, Visibility::Public);
        assert_eq!(find(&a, "c").visibility, Visibility::Private);
        assert_eq!(find(&a, "d").visibility, Visibility::Public);
    }

    #[test]
    fn private_class_method_targets_singletons() {
        let a = run(
            "class Foo\n  def self.build; end\n  def build; end\n  private_class_method :build\n  private_class_method def self.hidden; end\nend\n",
        );
        let ops = &a.declaration.operations;
        assert_eq!(ops[0].visibility, Visibility::Private);
        assert_eq!(ops[1].visibility, Visibility::Public);
        assert_eq!(ops[2].name, "hidden");
        assert_eq!(ops[2].visibility, Visibility::Private);
    }

    #[test]
    fn class_self_block_is_singleton() {
        let a = run(
            "class Foo\n  class << self\n    def create; end\n    private\n    def secret; end\n  end\n  def after; end\nend\n",
        );
        assert_eq!(names(&a), vec![".create", ".secret", "#after"]);
        assert_eq!(find(&a, "secret").visibility, Visibility::Private);
        assert_eq!(find(&a, "after").visibility, Visibility::Public);
    }

    #[test]
    fn module_function_forms() {
        let a = run(
            "module Fmt\n  def a; end\n  module_function :a\n  module_function\n  def b; end\nend\n",
        );
        assert_eq!(names(&a), vec![".a", ".b"]);
        assert!(a.declaration.operations.iter().all(|o| o.visibility == Visibility::Public));
    }

    #[test]
    fn block_params_from_first_yield() {
        let a = run(
            "class Foo\n  def each\n    @items.each { |i| yield i, @total }\n    yield :other\n  end\n  def plain; end\n  def bare\n    yield\n  end\nend\n",
        );
        assert_eq!(
            find(&a, "each").block_params,
            Some(vec!["i".to_string(), "total".to_string()])
        );
        assert_eq!(find(&a, "plain").block_params, None);
        assert_eq!(find(&a, "bare").block_params, Some(Vec::new()));
    }

    #[test]
    fn yield_of_self_gets_placeholder_name() {
        assert_eq!(
            block_param_names(&["self".to_string(), "x".to_string(), "x".to_string()]),
            vec!["arg1", "x", "arg3"]
        );
    }

    #[test]
    fn parameter_kinds_are_kept() {
        let a = run("class Foo\n  def go(a, *rest, key:, &blk); end\nend\n");
        let kinds: Vec<_> = find(&a, "go").params.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ParamKind::Required,
                ParamKind::Rest,
                ParamKind::KeywordRequired,
                ParamKind::Block
            ]
        );
    }

    #[test]
    fn methods_in_conditionals_are_collected() {
        let a = run("class Foo\n  if RUBY_VERSION > '3'\n    def modern; end\n  end\nend\n");
        assert_eq!(names(&a), vec!["#modern"]);
    }

    #[test]
    fn nested_class_methods_are_not_collected() {
        let a = run("class Outer\n  def a; end\n  class Inner\n    def b; end\n  end\nend\n");
        assert_eq!(names(&a), vec!["#a"]);
    }

    #[test]
    fn no_declaration_is_none() {
        let result = analyze("puts 'hello'\n", Path::new("script.rb")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn parse_error_is_reported() {
        assert!(analyze("class Foo\n  def a\n", Path::new("broken.rb")).is_err());
    }

    #[test]
    fn private_inside_call_block_stays_in_block() {
        let a = run(
            "module Tracking\n  included do\n    private\n    def log_it; end\n  end\n  def track; end\nend\n",
        );
        assert_eq!(find(&a, "log_it").visibility, Visibility::Private);
        assert_eq!(find(&a, "track").visibility, Visibility::Public);
    }

    #[test]
    fn enclosing_private_still_applies_inside_call_block() {
        let a = run("class Foo\n  private\n  memoize do\n    def a; end\n  end\n  def b; end\nend\n");
        assert_eq!(find(&a, "a").visibility, Visibility::Private);
        assert_eq!(find(&a, "b").visibility, Visibility::Private);
    }

    #[test]
    fn byte_order_mark_source_is_analyzed() {
        let a = run("\u{feff}class Foo\n  def a; end\nend\n");
        assert_eq!(a.declaration.complete_name(), "Foo");
        assert_eq!(names(&a), vec!["#a"]);
    }

    #[test]
    fn non_ascii_percent_delimiter_does_not_abort() {
        let a = run("class Foo\n  X = %w«a b»\n  def a; end\nend\n");
        assert_eq!(names(&a), vec!["#a"]);
    }

    const FRAGMENTS: &[&str] = &[
        "class Foo", "module Bar", "def x", "def self.y(a, *b, k: 1, &c)", "end", "do", "|x|",
        "{", "}", "(", ")", "[", "]", "if", "unless", "while", "then", "yield", "private",
        "scope :s, -> {}", "class << self", ",", ";", "\n", " ", ":sym", "'str'", "\"a#{b}\"",
        "%w[a b]", "%q«", "<<~EOS\nbody\nEOS\n", "/re/", "?a", "@iv", "$g", "=", "==", "=>",
        "->", "::", ".", "&.", "\\", "#", "\u{feff}", "é", "«", "=begin\n", "=end\n",
    ];

    proptest! {
        #[test]
        fn arbitrary_text_never_panics(src in "\\PC{0,200}") {
            let _ = analyze(&src, Path::new("lib/any.rb"));
        }

        #[test]
        fn ruby_like_text_never_panics(
            parts in prop::collection::vec(prop::sample::select(FRAGMENTS), 0..40)
        ) {
            let src = parts.concat();
            let _ = analyze(&src, Path::new("lib/any.rb"));
        }
    }
}
