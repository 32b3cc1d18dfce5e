use crate::diagnostics::parse_stderr;
use crate::materializer::{Materialized, Materializer, TREE_PREFIX};
use crate::paths::{ApplicationRoot, parse_imports};
use crate::process::{ProcessInvoker, ProcessOutcome};
use crate::types::{CompileContext, CompileResult, CompilerConfig, LessError};
use std::fs;
use std::io;
use std::path::Path;

/// Compiles LESS sources through the external compiler.
///
/// Holds configuration only, so one instance can serve concurrent compiles.
#[derive(Debug, Clone)]
pub struct LessCompiler {
    config: CompilerConfig,
    invoker: ProcessInvoker,
    materializer: Materializer,
}

impl LessCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        let invoker = ProcessInvoker::new(&config);
        let materializer = Materializer::new(config.temp_base());
        Self { config, invoker, materializer }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `source`, which lives at `context.source_path` inside
    /// `context.root`.
    ///
    /// Any temporary tree created for the compile is removed before this
    /// returns, whatever the outcome.
    pub fn compile(
        &self,
        source: &str,
        context: CompileContext<'_>,
    ) -> Result<CompileResult, LessError> {
        let Materialized { input, tree, app_root } =
            self.materializer.materialize(source, context)?;
        let root = app_root.as_deref().and_then(ApplicationRoot::new);

        let result = self.run(&input, root.as_ref());

        if let Some(tree) = tree {
            tree.cleanup();
        }

        match &result {
            Ok(compiled) => tracing::debug!(
                path = %context.source_path,
                imports = compiled.imports.len(),
                "compiled less source"
            ),
            Err(e) => {
                tracing::debug!(path = %context.source_path, error = %e, "less compile failed")
            }
        }

        result
    }

    fn run(
        &self,
        input: &Path,
        root: Option<&ApplicationRoot>,
    ) -> Result<CompileResult, LessError> {
        let base = self.config.temp_base();
        let output = std::path::absolute(&base)
            .and_then(|base| {
                tempfile::Builder::new().prefix(TREE_PREFIX).suffix(".css").tempfile_in(base)
            })
            .map_err(|source| LessError::Materialize { path: base.clone(), source })?
            .into_temp_path();

        let result = self
            .invoker
            .invoke(input, &output)
            .and_then(|outcome| read_outcome(&outcome, &output, root));

        if let Err(e) = output.close() {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(error = %e, "failed to remove compiler output file");
            }
        }

        result
    }
}

impl Default for LessCompiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

/// Turn a finished run into a result. Exit code 0 reads stdout and the
/// output file; anything else reads stderr only.
pub fn read_outcome(
    outcome: &ProcessOutcome,
    output: &Path,
    root: Option<&ApplicationRoot>,
) -> Result<CompileResult, LessError> {
    if !outcome.success() {
        let error = parse_stderr(&outcome.stderr).anonymize(root);
        return Err(LessError::Compile(error));
    }

    let css = match fs::read_to_string(output) {
        Ok(css) => Some(css),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(LessError::Output(e)),
    };

    Ok(CompileResult { css, imports: parse_imports(&outcome.stdout, root) })
}
