use crate::types::{CompileContext, LessError};
use crate::vfs::LogicalPath;
use rustc_hash::FxHashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Name prefix of every temporary source tree
pub const TREE_PREFIX: &str = "less-bridge-";

/// A temporary on-disk mirror of a source tree, owned by one compile.
/// Removed by `cleanup`, or on drop if cleanup never ran.
#[derive(Debug)]
pub struct MaterializedTree {
    dir: TempDir,
    files: FxHashMap<LogicalPath, PathBuf>,
}

impl MaterializedTree {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Real location of a mirrored file
    pub fn real_path(&self, path: &LogicalPath) -> Option<&Path> {
        self.files.get(path).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Recursively delete the tree. Failures are logged, never returned; a
    /// tree that is already gone counts as removed.
    pub fn cleanup(self) {
        let root = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!(root = %root.display(), "removed materialized tree"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                root = %root.display(),
                error = %e,
                "failed to remove materialized tree"
            ),
        }
    }

    fn write(&mut self, path: &LogicalPath, content: &[u8]) -> Result<PathBuf, LessError> {
        let dest = path.join_onto(self.dir.path());
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(materialize_error(parent))?;
        }
        fs::write(&dest, content).map_err(materialize_error(&dest))?;
        self.files.insert(path.clone(), dest.clone());
        Ok(dest)
    }
}

/// Result of making a compile's source file available on disk
#[derive(Debug)]
pub struct Materialized {
    /// Real path of the file to hand to the compiler
    pub input: PathBuf,

    /// The mirror, when one had to be created
    pub tree: Option<MaterializedTree>,

    /// Real directory standing in for the logical root
    pub app_root: Option<PathBuf>,
}

/// Mirrors source trees onto real temporary directories
#[derive(Debug, Clone)]
pub struct Materializer {
    temp_base: PathBuf,
}

impl Materializer {
    pub fn new(temp_base: impl Into<PathBuf>) -> Self {
        Self { temp_base: temp_base.into() }
    }

    /// Guarantee a real file holding `source` at the context's source path.
    ///
    /// A file that already exists on disk is returned as is. Anything else
    /// gets the whole root copied into a fresh temporary directory, with
    /// `source` written over the target.
    ///
    /// Returned paths are absolute, since the compiler runs in its own
    /// working directory.
    pub fn materialize(
        &self,
        source: &str,
        context: CompileContext<'_>,
    ) -> Result<Materialized, LessError> {
        let target = context.source_path;

        if let Some(real) = context.root.real_path(target) {
            let input = std::path::absolute(&real).map_err(materialize_error(&real))?;
            let app_root = match context.root.real_root() {
                Some(root) => Some(std::path::absolute(&root).map_err(materialize_error(&root))?),
                None => None,
            };
            tracing::debug!(path = %input.display(), "source is disk-backed, compiling in place");
            return Ok(Materialized { input, tree: None, app_root });
        }

        let base =
            std::path::absolute(&self.temp_base).map_err(materialize_error(&self.temp_base))?;

        // tempfile creates the directory exclusively and retries on a name collision
        let dir = tempfile::Builder::new()
            .prefix(TREE_PREFIX)
            .tempdir_in(&base)
            .map_err(materialize_error(&base))?;
        let mut tree = MaterializedTree { dir, files: FxHashMap::default() };

        let listing_error = materialize_error(Path::new(target.relative()));
        let files = context.root.files().map_err(listing_error)?;
        let mut target_written = false;

        for path in &files {
            let content = context
                .root
                .read(path)
                .map_err(materialize_error(Path::new(path.relative())))?;

            match content {
                Some(bytes) => {
                    tree.write(path, &bytes)?;
                }
                None if path == target => {
                    tree.write(path, source.as_bytes())?;
                }
                None => {
                    tree.write(path, &[])?;
                }
            }

            if path == target {
                target_written = true;
            }
        }

        if !target_written {
            tree.write(target, source.as_bytes())?;
        }

        let input = reconcile(&mut tree, target, source)?;
        tracing::debug!(
            root = %tree.root().display(),
            files = tree.len(),
            "materialized source tree"
        );

        let app_root = Some(tree.root().to_path_buf());
        Ok(Materialized { input, tree: Some(tree), app_root })
    }
}

/// The `source` argument wins over whatever the tree held for the target
fn reconcile(
    tree: &mut MaterializedTree,
    target: &LogicalPath,
    source: &str,
) -> Result<PathBuf, LessError> {
    let real = target.join_onto(tree.root());
    let on_disk = fs::read(&real).map_err(materialize_error(&real))?;

    if on_disk != source.as_bytes() {
        tracing::debug!(path = %target, "source differs from tree content, overwriting");
        return tree.write(target, source.as_bytes());
    }

    Ok(real)
}

fn materialize_error(path: &Path) -> impl FnOnce(io::Error) -> LessError + '_ {
    move |source| LessError::Materialize { path: path.to_path_buf(), source }
}
