use clap::Parser;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use less_bridge::cli::{Cli, OutputFormat};
use less_bridge::reporter::{report_json, report_text};
use less_bridge::{
    CompileContext, CompilerConfig, DiskDirectory, FileConfig, LessCompiler, LessError, LogicalPath,
};

/// Find default config file in directory
fn find_default_config(dir: &Path) -> Option<PathBuf> {
    let json_path = dir.join("less-bridge.json");
    if json_path.exists() {
        return Some(json_path);
    }

    let jsonc_path = dir.join("less-bridge.jsonc");
    if jsonc_path.exists() {
        return Some(jsonc_path);
    }

    None
}

/// Load config from file path, supporting .json and .jsonc
fn load_config_file(path: &Path) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let mut content = fs::read_to_string(path)?;
    json_strip_comments::strip(&mut content)?;
    let config: FileConfig = serde_json::from_str(&content)?;
    Ok(config)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).compact().init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    // Load config file
    let file_config = if let Some(config_path) = &cli.config {
        // Use specified config file (error if not found)
        if !config_path.exists() {
            eprintln!("Error: Config file not found: {}", config_path.display());
            std::process::exit(1);
        }
        Some(load_config_file(config_path)?)
    } else {
        // Look for default config file in the root directory
        match find_default_config(&cli.root) {
            Some(path) => match load_config_file(&path) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    tracing::warn!("Failed to parse config file '{}': {}", path.display(), e);
                    None
                }
            },
            None => None,
        }
    };

    // Merge config: CLI args override file config
    let mut config = file_config.unwrap_or_default().apply_to(CompilerConfig::default());
    if let Some(program) = cli.program {
        config.program = program;
    }
    if !cli.args.is_empty() {
        config.args = cli.args;
    }
    if let Some(dir) = cli.working_dir {
        config.working_dir = Some(dir);
    }
    if let Some(ms) = cli.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }

    let root = DiskDirectory::new(cli.root.canonicalize()?);
    let path = LogicalPath::new(&cli.file);

    let source = if cli.stdin {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        source
    } else {
        match fs::read_to_string(path.join_onto(root.root())) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("Error: Cannot read {path}: {e}");
                std::process::exit(1);
            }
        }
    };

    let compiler = LessCompiler::new(config);

    match compiler.compile(&source, CompileContext::new(&root, &path)) {
        Ok(result) => match cli.format {
            OutputFormat::Text => report_text(&result),
            OutputFormat::Json => report_json(&result)?,
        },
        Err(LessError::Timeout(limit)) => {
            eprintln!("Error: lessc did not answer within {limit:?} (is the runtime installed?)");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}
