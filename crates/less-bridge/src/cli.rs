use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "less-bridge")]
#[command(about = "Compile a LESS stylesheet through an external lessc process")]
pub struct Cli {
    /// LESS file to compile, relative to the root directory
    pub file: String,

    /// Root directory of the source tree
    #[arg(short = 'C', long, default_value = ".")]
    pub root: PathBuf,

    /// Read the source from stdin instead of the file on disk
    #[arg(long, default_value = "false")]
    pub stdin: bool,

    /// Path to config file (less-bridge.json or less-bridge.jsonc)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Compiler executable [default: node]
    #[arg(long)]
    pub program: Option<PathBuf>,

    /// Arguments placed before the compiler flags [default: less/bin/lessc]
    #[arg(long = "arg", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Directory holding the compiler and its support files
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Compiler timeout in milliseconds [default: 30000]
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
