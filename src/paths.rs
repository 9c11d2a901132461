//! Path conventions linking a source file to its spec and to Ruby names.

use std::path::{Path, PathBuf};

/// Conventional source roots stripped from the front of a source path.
const SOURCE_ROOTS: &[&str] = &["lib/", "app/"];

/// `./lib/foo/bar.rb` with spec dir `spec` gives `spec/foo/bar_spec.rb`.
pub fn spec_path(source: &Path, spec_dir: &str) -> PathBuf {
    let relative = source_relative(source);
    let stem = relative.strip_suffix(".rb").unwrap_or(&relative);
    let dir = spec_dir.trim_end_matches('/');
    PathBuf::from(format!("{}/{}_spec.rb", dir, stem))
}

/// Value for `require`: `lib/foo/bar_baz.rb` gives `foo/bar_baz`.
pub fn require_path(source: &Path) -> String {
    let relative = source_relative(source);
    relative
        .strip_suffix(".rb")
        .map(str::to_string)
        .unwrap_or(relative)
}

fn source_relative(source: &Path) -> String {
    let text = source.to_string_lossy().replace('\\', "/");
    let mut rest = text.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    let rest = SOURCE_ROOTS
        .iter()
        .find_map(|root| rest.strip_prefix(root))
        .unwrap_or(rest);
    rest.to_string()
}

/// Namespace implied by the directories of a slash-separated path, without
/// its first segment and file name: `lib/foo_baz/bar_bar/bar.rb` gives
/// `["FooBaz", "BarBar"]`. Repeated segments appear once.
pub fn namespace_from_path(path: &str) -> Vec<String> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    if segments.len() < 3 {
        return Vec::new();
    }
    segments[1..segments.len() - 1]
        .iter()
        .map(|segment| camelize(segment))
        .fold(Vec::new(), |mut names, name| {
            if !names.contains(&name) {
                names.push(name);
            }
            names
        })
}

/// `foo_bar` gives `FooBar`.
pub fn camelize(word: &str) -> String {
    word.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect()
}
