use super::{LogicalPath, VirtualDirectory};
use rustc_hash::FxHashMap;
use std::io;
use std::path::PathBuf;

/// A source tree that lives entirely in memory.
///
/// Files may be declared without content (`declare`), which models an asset
/// the pipeline knows about but has not produced bytes for yet.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    files: FxHashMap<LogicalPath, Option<Vec<u8>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file with content
    pub fn insert(&mut self, path: impl Into<LogicalPath>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), Some(content.into()));
    }

    /// Add a file with no backing content
    pub fn declare(&mut self, path: impl Into<LogicalPath>) {
        self.files.insert(path.into(), None);
    }

    /// Builder-style `insert`
    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl VirtualDirectory for MemoryDirectory {
    fn files(&self) -> io::Result<Vec<LogicalPath>> {
        let mut paths: Vec<_> = self.files.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }

    fn exists(&self, path: &LogicalPath) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &LogicalPath) -> io::Result<Option<Vec<u8>>> {
        match self.files.get(path) {
            Some(content) => Ok(content.clone()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, format!("{path} not found"))),
        }
    }

    fn real_path(&self, _path: &LogicalPath) -> Option<PathBuf> {
        None
    }

    fn real_root(&self) -> Option<PathBuf> {
        None
    }
}
