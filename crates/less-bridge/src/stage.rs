use crate::compiler::LessCompiler;
use crate::types::{CompileContext, CompileResult, LessError};
use crate::vfs::{LogicalPath, VirtualDirectory};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use rayon::prelude::*;

/// File search pattern matching LESS sources
pub const LESS_SEARCH_PATTERN: &str = "*.less";

/// Add LESS sources to a `;`-separated stylesheet search pattern
pub fn extend_search_pattern(pattern: &str) -> String {
    if pattern.split(';').any(|p| p.trim().eq_ignore_ascii_case(LESS_SEARCH_PATTERN)) {
        return pattern.to_string();
    }
    if pattern.trim().is_empty() {
        return LESS_SEARCH_PATTERN.to_string();
    }
    format!("{pattern};{LESS_SEARCH_PATTERN}")
}

/// A stylesheet asset handed over by the bundling pipeline
#[derive(Debug, Clone)]
pub struct StylesheetAsset {
    pub path: LogicalPath,
    pub source: String,
}

impl StylesheetAsset {
    pub fn new(path: impl Into<LogicalPath>, source: impl Into<String>) -> Self {
        Self { path: path.into(), source: source.into() }
    }
}

/// Outcome of compiling one asset
#[derive(Debug)]
pub struct CompiledAsset {
    pub path: LogicalPath,
    pub result: Result<CompileResult, LessError>,
}

/// Bundle step that compiles every `.less` asset of a stylesheet bundle
pub struct CompileLessAssets {
    compiler: LessCompiler,
    matcher: GlobSet,
}

impl CompileLessAssets {
    pub fn new(compiler: LessCompiler) -> Self {
        Self { compiler, matcher: less_matcher() }
    }

    /// Whether the asset at `path` is a LESS source (case-insensitive)
    pub fn is_less(&self, path: &LogicalPath) -> bool {
        self.matcher.is_match(path.relative())
    }

    /// Compile the LESS assets among `assets`, in parallel. Results keep the
    /// order of the input; non-LESS assets are skipped.
    pub fn process(
        &self,
        root: &dyn VirtualDirectory,
        assets: &[StylesheetAsset],
    ) -> Vec<CompiledAsset> {
        assets
            .par_iter()
            .filter(|asset| self.is_less(&asset.path))
            .map(|asset| {
                let context = CompileContext::new(root, &asset.path);
                CompiledAsset {
                    path: asset.path.clone(),
                    result: self.compiler.compile(&asset.source, context),
                }
            })
            .collect()
    }
}

fn less_matcher() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    if let Ok(glob) = GlobBuilder::new("**/*.less").case_insensitive(true).build() {
        builder.add(glob);
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}
