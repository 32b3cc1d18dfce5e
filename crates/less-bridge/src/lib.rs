pub mod cli;
pub mod compiler;
pub mod diagnostics;
pub mod materializer;
pub mod paths;
pub mod process;
pub mod reporter;
pub mod stage;
pub mod types;
pub mod vfs;

pub use compiler::LessCompiler;
pub use diagnostics::{CompilerError, ErrorGrammar};
pub use stage::{CompileLessAssets, CompiledAsset, StylesheetAsset};
pub use types::{
    CompileContext, CompileResult, CompilerConfig, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT,
    FileConfig, LessError,
};
pub use vfs::{DiskDirectory, LogicalPath, MemoryDirectory, VirtualDirectory};

/// Compile a LESS source with the given configuration
///
/// # Arguments
/// * `source` - LESS text to compile; authoritative over the file's content in `root`
/// * `root` - Source tree the file lives in (in memory or on disk)
/// * `path` - Logical path of the file inside `root`
///
/// # Returns
/// * `Ok(CompileResult)` - Generated CSS and every file the compile touched
/// * `Err(LessError)` - Materialization, launch, timeout or compiler error
///
/// # Example
/// ```no_run
/// use less_bridge::{compile, CompilerConfig, LogicalPath, MemoryDirectory};
///
/// let root = MemoryDirectory::new().with_file("site.less", ".a { color: red; }");
/// let result = compile(
///     ".a { color: red; }",
///     &root,
///     &LogicalPath::new("site.less"),
///     CompilerConfig::default(),
/// )
/// .unwrap();
/// println!("{}", result.css.unwrap_or_default());
/// ```
pub fn compile(
    source: &str,
    root: &dyn VirtualDirectory,
    path: &LogicalPath,
    config: CompilerConfig,
) -> Result<CompileResult, LessError> {
    LessCompiler::new(config).compile(source, CompileContext::new(root, path))
}
