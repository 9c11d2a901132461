//! `${name}` template expansion.

use crate::error::TemplateError;

/// Replace every `${name}` in `template` with its value from `vars`.
///
/// `$$` yields a literal `$`; any other `$` is copied through unchanged so
/// Ruby globals such as `$stdout` survive. Unknown names are an error.
pub fn expand(template: &str, vars: &[(&str, String)]) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(dollar) = rest.find('$') {
        output.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        let consumed = if after.starts_with('$') {
            output.push('$');
            2
        } else if let Some(body) = after.strip_prefix('{') {
            let close = body.find('}').ok_or_else(|| TemplateError::Syntax {
                offset: offset + dollar,
                message: "unterminated `${`".to_string(),
            })?;
            let name = &body[..close];
            if !is_variable_name(name) {
                return Err(TemplateError::Syntax {
                    offset: offset + dollar,
                    message: format!("invalid variable name `{}`", name),
                });
            }
            let value = vars
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value)
                .ok_or_else(|| TemplateError::UndefinedVariable(name.to_string()))?;
            output.push_str(value);
            close + 3
        } else {
            output.push('$');
            1
        };
        offset += dollar + consumed;
        rest = &rest[dollar + consumed..];
    }
    output.push_str(rest);
    Ok(output)
}

fn is_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Vec<(&'static str, String)> {
        vec![
            ("class_name", "Foo::Bar".to_string()),
            ("examples", "  it { }\n".to_string()),
        ]
    }

    #[test]
    fn substitutes_known_names() {
        let out = expand("RSpec.describe ${class_name} do\n${examples}end\n", &vars()).unwrap();
        assert_eq!(out, "RSpec.describe Foo::Bar do\n  it { }\nend\n");
    }

    #[test]
    fn repeated_and_adjacent_variables() {
        let out = expand("${class_name}${class_name}", &vars()).unwrap();
        assert_eq!(out, "Foo::BarFoo::Bar");
    }

    #[test]
    fn dollar_escapes_and_globals() {
        let out = expand("$$ {x} $stdout ${class_name} $", &vars()).unwrap();
        assert_eq!(out, "$ {x} $stdout Foo::Bar $");
        assert_eq!(expand("$${class_name}", &vars()).unwrap(), "${class_name}");
    }

    #[test]
    fn undefined_variable() {
        assert_eq!(
            expand("${nope}", &vars()),
            Err(TemplateError::UndefinedVariable("nope".to_string()))
        );
    }

    #[test]
    fn unterminated_reference_reports_offset() {
        match expand("abc ${class_name", &vars()) {
            Err(TemplateError::Syntax { offset, .. }) => assert_eq!(offset, 4),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn offsets_account_for_earlier_substitutions() {
        match expand("${class_name} ${bad name}", &vars()) {
            Err(TemplateError::Syntax { offset, .. }) => assert_eq!(offset, 14),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn non_ascii_text_is_kept() {
        assert_eq!(expand("é ${class_name} ü", &vars()).unwrap(), "é Foo::Bar ü");
    }
}
