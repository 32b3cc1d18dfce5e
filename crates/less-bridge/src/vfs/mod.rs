mod disk;
mod memory;

pub use disk::DiskDirectory;
pub use memory::MemoryDirectory;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Marker that stands for the logical root in rendered paths
pub const ROOT_MARKER: &str = "~";

/// A file path relative to the logical root of a source tree.
///
/// Always rendered as `~/dir/file.less` with forward slashes, whatever form
/// it was built from (`dir/file.less`, `/dir/file.less`, `~\dir\file.less`).
/// `..` segments are resolved and never climb above the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath(String);

impl LogicalPath {
    pub fn new(path: &str) -> Self {
        let normalized = path.replace('\\', "/");
        let relative = normalized.strip_prefix(ROOT_MARKER).unwrap_or(&normalized);
        let mut segments: Vec<&str> = Vec::new();
        for segment in relative.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                _ => segments.push(segment),
            }
        }
        Self(segments.join("/"))
    }

    /// Path without the root marker, e.g. `styles/site.less`
    pub fn relative(&self) -> &str {
        &self.0
    }

    /// Location of this path beneath a real directory
    pub fn join_onto(&self, base: &Path) -> PathBuf {
        self.0.split('/').filter(|s| !s.is_empty()).fold(base.to_path_buf(), |acc, s| acc.join(s))
    }

    /// File name component, if any
    pub fn file_name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|s| !s.is_empty())
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ROOT_MARKER}/{}", self.0)
    }
}

impl From<&str> for LogicalPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// A source tree the compiler reads from. Implementations may keep files in
/// memory or point at a real directory.
pub trait VirtualDirectory: Send + Sync {
    /// Logical paths of every file under the root, recursively
    fn files(&self) -> io::Result<Vec<LogicalPath>>;

    /// Whether the file is known to this directory
    fn exists(&self, path: &LogicalPath) -> bool;

    /// Contents of a file. `Ok(None)` means the file is known but has no
    /// backing content yet.
    fn read(&self, path: &LogicalPath) -> io::Result<Option<Vec<u8>>>;

    /// Real on-disk location of a file, when it is disk-backed and exists
    fn real_path(&self, path: &LogicalPath) -> Option<PathBuf>;

    /// Real on-disk location of the root, when the tree is disk-backed
    fn real_root(&self) -> Option<PathBuf>;
}
