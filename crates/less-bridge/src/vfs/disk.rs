use super::{LogicalPath, VirtualDirectory};
use ignore::WalkBuilder;
use std::io;
use std::path::{Path, PathBuf};

/// A source tree backed by a real directory
#[derive(Debug, Clone)]
pub struct DiskDirectory {
    root: PathBuf,
}

impl DiskDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl VirtualDirectory for DiskDirectory {
    fn files(&self) -> io::Result<Vec<LogicalPath>> {
        let mut files = Vec::new();

        // Every file is mirrored, so none of the walker's filters apply
        let walker = WalkBuilder::new(&self.root).standard_filters(false).build();

        for entry in walker {
            let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            files.push(LogicalPath::new(&relative.to_string_lossy()));
        }

        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &LogicalPath) -> bool {
        path.join_onto(&self.root).is_file()
    }

    fn read(&self, path: &LogicalPath) -> io::Result<Option<Vec<u8>>> {
        std::fs::read(path.join_onto(&self.root)).map(Some)
    }

    fn real_path(&self, path: &LogicalPath) -> Option<PathBuf> {
        let real = path.join_onto(&self.root);
        real.is_file().then_some(real)
    }

    fn real_root(&self) -> Option<PathBuf> {
        Some(self.root.clone())
    }
}
