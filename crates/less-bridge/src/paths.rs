use crate::vfs::ROOT_MARKER;
use regex::{Captures, Regex};
use std::path::Path;

/// The real directory standing in for the logical root during one compile.
/// Used to turn paths the compiler reports back into `~/...` paths.
#[derive(Debug, Clone)]
pub struct ApplicationRoot {
    prefix: String,
    pattern: Regex,
}

impl ApplicationRoot {
    /// Returns `None` for an empty path
    pub fn new(root: &Path) -> Option<Self> {
        let normalized = root.to_string_lossy().replace('\\', "/");
        let trimmed = normalized.trim_end_matches('/');
        if trimmed.is_empty() {
            return None;
        }

        let segments: Vec<String> = trimmed.split('/').map(regex::escape).collect();
        // Either slash style, any case, and only at a path boundary
        let source = format!(r"(?i){}(?P<tail>[\\/]|[^\w.\-]|$)", segments.join(r"[\\/]"));
        let pattern = Regex::new(&source).ok()?;

        Some(Self { prefix: lower_first(trimmed), pattern })
    }

    /// Normalized form of the root (forward slashes, lower-cased first character)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Replace every occurrence of the root in `text` with `~`
    pub fn rewrite(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &Captures| match &caps["tail"] {
                "\\" | "/" => format!("{ROOT_MARKER}/"),
                tail => format!("{ROOT_MARKER}{tail}"),
            })
            .into_owned()
    }
}

/// Normalize one line of the compiler's import listing into a logical path
pub fn normalize_import(line: &str, root: Option<&ApplicationRoot>) -> String {
    let path = lower_first(line.trim()).replace('\r', "").replace('\\', "/");
    match root {
        Some(root) => root.rewrite(&path),
        None => path,
    }
}

/// Imported paths listed on stdout, one per nonblank line
pub fn parse_imports(stdout: &str, root: Option<&ApplicationRoot>) -> Vec<String> {
    stdout
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| normalize_import(line, root))
        .collect()
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
