//! Pure code-generation helpers shared by the built-in renderers.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Declaration, Operation, Param, ParamKind};

static RE_ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());

static RE_WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z\d])([A-Z])").unwrap());

const INDENT: &str = "      ";

/// Variable name for the instance under test: `HTMLParser` gives `html_parser`.
pub fn instance_name(decl: &Declaration) -> String {
    snake_case(decl.name())
}

pub fn snake_case(name: &str) -> String {
    let name = RE_ACRONYM_BOUNDARY.replace_all(name, "${1}_${2}");
    let name = RE_WORD_BOUNDARY.replace_all(&name, "${1}_${2}");
    name.replace('-', "_").to_lowercase()
}

/// Parameters passed at the call site. A block parameter is dropped when a
/// literal block is generated instead.
pub fn call_params(op: &Operation) -> Vec<&Param> {
    let literal_block = !block_code(op).is_empty();
    op.params
        .iter()
        .filter(|p| !p.name.is_empty())
        .filter(|p| !(literal_block && p.kind == ParamKind::Block))
        .collect()
}

/// One `x = double('x')` line per named parameter.
pub fn params_initialization(params: &[&Param]) -> String {
    params
        .iter()
        .map(|p| format!("{}{} = double('{}')\n", INDENT, p.name, p.name))
        .collect()
}

/// `(a, *rest, key: key, **opts, &blk)`, or nothing for an empty list.
pub fn args_part(params: &[&Param]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let args: Vec<String> = params
        .iter()
        .map(|p| match p.kind {
            ParamKind::Required | ParamKind::Optional => p.name.clone(),
            ParamKind::Rest => format!("*{}", p.name),
            ParamKind::KeywordRequired | ParamKind::KeywordOptional => {
                format!("{}: {}", p.name, p.name)
            }
            ParamKind::KeywordRest => format!("**{}", p.name),
            ParamKind::Block => format!("&{}", p.name),
        })
        .collect();
    format!("({})", args.join(", "))
}

/// Doubles for the constructor's parameters followed by the instantiation
/// line; nothing for singleton operations.
pub fn instantiation(decl: &Declaration, op: &Operation) -> String {
    if op.singleton {
        return String::new();
    }
    let params: Vec<&Param> = decl
        .constructor()
        .map(call_params)
        .unwrap_or_default();
    format!(
        "{}{}{} = described_class.new{}\n",
        params_initialization(&params),
        INDENT,
        instance_name(decl),
        args_part(&params)
    )
}

/// ` { |a, b| }` for operations that yield values.
pub fn block_code(op: &Operation) -> String {
    match &op.block_params {
        Some(names) if !names.is_empty() => format!(" {{ |{}| }}", names.join(", ")),
        _ => String::new(),
    }
}

/// `described_class.build(a)` or `foo.run(a) { |x| }`
pub fn invocation(decl: &Declaration, op: &Operation) -> String {
    let receiver = if op.singleton {
        "described_class".to_string()
    } else {
        instance_name(decl)
    };
    format!(
        "{}.{}{}{}",
        receiver,
        op.name,
        args_part(&call_params(op)),
        block_code(op)
    )
}

/// Receiverless call used by helper specs: `format_date(date)`.
pub fn helper_invocation(op: &Operation) -> String {
    format!("{}{}{}", op.name, args_part(&call_params(op)), block_code(op))
}

/// HTTP verb conventionally routed to a resource controller action.
pub fn http_verb(action: &str) -> &'static str {
    match action {
        "index" | "new" | "show" | "edit" => "get",
        "create" => "post",
        "update" => "patch",
        "destroy" => "delete",
        _ => "get",
    }
}
