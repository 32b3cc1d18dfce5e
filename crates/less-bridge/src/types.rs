use crate::diagnostics::CompilerError;
use crate::vfs::{LogicalPath, VirtualDirectory};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default ceiling for a single compiler run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between checks for process completion
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Input of a single compile
#[derive(Clone, Copy)]
pub struct CompileContext<'a> {
    /// Logical root of the source tree
    pub root: &'a dyn VirtualDirectory,

    /// File being compiled, relative to `root`
    pub source_path: &'a LogicalPath,
}

impl<'a> CompileContext<'a> {
    pub fn new(root: &'a dyn VirtualDirectory, source_path: &'a LogicalPath) -> Self {
        Self { root, source_path }
    }
}

/// Output of a successful compile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileResult {
    /// Generated CSS, `None` when the compiler produced no output file
    pub css: Option<String>,

    /// Every file the compile touched, as logical paths (`~/...`)
    pub imports: Vec<String>,
}

/// How to run the external compiler
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Executable to launch
    pub program: PathBuf,

    /// Arguments placed before the compiler flags (e.g. the lessc script)
    pub args: Vec<String>,

    /// Directory holding the compiler and its support files.
    /// Defaults to the program's parent directory.
    pub working_dir: Option<PathBuf>,

    /// Hard ceiling on a single compiler run
    pub timeout: Duration,

    /// How often the child is checked for completion
    pub poll_interval: Duration,

    /// Base directory for temporary trees and output files.
    /// Defaults to the OS temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("node"),
            args: vec!["less/bin/lessc".to_string()],
            working_dir: None,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            temp_dir: None,
        }
    }
}

impl CompilerConfig {
    /// Config running `program` directly, with no leading arguments
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), ..Default::default() }
    }

    pub fn temp_base(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Error types for less-bridge operations
#[derive(Error, Debug)]
pub enum LessError {
    #[error("Failed to materialize '{path}': {source}")]
    Materialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch less compiler '{program}': {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while waiting for less compiler: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Less compiler did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Compiler output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("{0}")]
    Compile(CompilerError),
}

impl LessError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LessError::Timeout(_))
    }

    /// Structured diagnostic, when the compiler itself rejected the source
    pub fn compiler_error(&self) -> Option<&CompilerError> {
        match self {
            LessError::Compile(error) => Some(error),
            _ => None,
        }
    }
}

/// Config file structure for less-bridge.json / less-bridge.jsonc
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(default)]
    pub program: Option<PathBuf>,

    #[serde(default)]
    pub args: Option<Vec<String>>,

    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub poll_interval_ms: Option<u64>,

    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Apply the values present in the file on top of `config`
    pub fn apply_to(self, mut config: CompilerConfig) -> CompilerConfig {
        if let Some(program) = self.program {
            config.program = program;
        }
        if let Some(args) = self.args {
            config.args = args;
        }
        if let Some(dir) = self.working_dir {
            config.working_dir = Some(dir);
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(dir) = self.temp_dir {
            config.temp_dir = Some(dir);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_runs_lessc_through_node() {
        let config = CompilerConfig::default();
        assert_eq!(config.program, PathBuf::from("node"));
        assert_eq!(config.args, vec!["less/bin/lessc".to_string()]);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(20));
    }

    #[test]
    fn test_file_config_overrides_only_present_fields() {
        let file: FileConfig =
            serde_json::from_str(r#"{ "program": "/opt/lessc", "args": [], "timeoutMs": 500 }"#)
                .unwrap();
        let config = file.apply_to(CompilerConfig::default());

        assert_eq!(config.program, PathBuf::from("/opt/lessc"));
        assert!(config.args.is_empty());
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(config.working_dir.is_none());
    }

    #[test]
    fn test_timeout_is_distinct_from_compile_error() {
        let timeout = LessError::Timeout(DEFAULT_TIMEOUT);
        assert!(timeout.is_timeout());
        assert!(timeout.compiler_error().is_none());

        let compile = LessError::Compile(CompilerError::new("bad"));
        assert!(!compile.is_timeout());
        assert_eq!(compile.compiler_error().map(|e| e.message.as_str()), Some("bad"));
    }
}
