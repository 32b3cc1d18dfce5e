#![cfg(unix)]

use less_bridge::{
    CompileContext, CompileLessAssets, CompilerConfig, DiskDirectory, LessCompiler, LessError,
    LogicalPath, MemoryDirectory, StylesheetAsset,
};
use less_bridge::materializer::TREE_PREFIX;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::{TempDir, tempdir};

/// Stand-in for lessc: copies the input (and each imported file) to the
/// output, lists imports on stdout, and reports missing imports the way
/// lessc 3.x does.
const FAKE_LESSC: &str = r#"
input="$3"
output="$4"
dir=$(dirname "$input")
imports=$(sed -n 's/^@import "\(.*\)";.*$/\1/p' "$input")
for f in $imports; do
  if [ ! -f "$dir/$f" ]; then
    echo "FileError: '$f' wasn't found. Tried - $dir/$f in $input on line 1, column 1:" >&2
    echo "1 @import \"$f\";" >&2
    exit 1
  fi
done
cat "$input" > "$output"
for f in $imports; do
  cat "$dir/$f" >> "$output"
  echo "$dir/$f"
done
"#;

struct Harness {
    tools: TempDir,
    temp_base: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self { tools: tempdir().unwrap(), temp_base: tempdir().unwrap() }
    }

    fn compiler(&self, script: &str, timeout: Duration) -> LessCompiler {
        let path = self.tools.path().join("lessc.sh");
        fs::write(&path, script).unwrap();
        LessCompiler::new(CompilerConfig {
            program: PathBuf::from("/bin/sh"),
            args: vec![path.to_string_lossy().into_owned()],
            working_dir: Some(self.tools.path().to_path_buf()),
            timeout,
            poll_interval: Duration::from_millis(10),
            temp_dir: Some(self.temp_base.path().to_path_buf()),
        })
    }

    fn fake_lessc(&self) -> LessCompiler {
        self.compiler(FAKE_LESSC, Duration::from_secs(30))
    }

    fn leftovers(&self) -> Vec<PathBuf> {
        fs::read_dir(self.temp_base.path()).unwrap().map(|e| e.unwrap().path()).collect()
    }
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/less")
}

#[test]
fn test_compiles_in_memory_source_without_imports() {
    let harness = Harness::new();
    let mut root = MemoryDirectory::new();
    root.declare("site.less");
    let path = LogicalPath::new("site.less");

    let result = harness
        .fake_lessc()
        .compile(".a{color:red;}", CompileContext::new(&root, &path))
        .expect("compile should succeed");

    assert_eq!(result.css.as_deref(), Some(".a{color:red;}"));
    assert!(result.imports.is_empty(), "unexpected imports: {:?}", result.imports);
    assert!(harness.leftovers().is_empty(), "temp files left: {:?}", harness.leftovers());
}

#[test]
fn test_reports_imports_as_logical_paths() {
    let harness = Harness::new();
    let mut root = MemoryDirectory::new().with_file("partials/_vars.less", "@c: red;\n");
    root.declare("styles.less");
    let path = LogicalPath::new("styles.less");
    let source = "@import \"partials/_vars.less\";\n.a{color:@c;}\n";

    let result = harness.fake_lessc().compile(source, CompileContext::new(&root, &path)).unwrap();

    assert_eq!(result.imports, vec!["~/partials/_vars.less".to_string()]);
    let css = result.css.unwrap();
    assert!(css.contains("@c: red;"), "imported content missing from {css:?}");
    assert!(harness.leftovers().is_empty());
}

#[test]
fn test_missing_import_is_structured_error_without_temp_paths() {
    let harness = Harness::new();
    let mut root = MemoryDirectory::new();
    root.declare("main.less");
    let path = LogicalPath::new("main.less");

    let err = harness
        .fake_lessc()
        .compile("@import \"missing.less\";\n", CompileContext::new(&root, &path))
        .unwrap_err();

    let error = err.compiler_error().expect("compiler error expected");
    assert_eq!(error.file_name, "~/main.less");
    assert_eq!(error.line, 1);
    assert_eq!(error.column, 1);
    let message = &error.message;
    assert!(message.starts_with("FileError: 'missing.less' wasn't found"), "message: {message}");
    assert!(message.contains("~/missing.less"), "message: {message}");

    let rendered = err.to_string();
    let base = harness.temp_base.path().to_string_lossy().into_owned();
    assert!(!rendered.contains(&base), "temp path leaked: {rendered}");
    assert!(!rendered.contains(TREE_PREFIX), "temp path leaked: {rendered}");
    let location = "on line 1, column 1 in file '~/main.less'";
    assert!(rendered.ends_with(location), "rendered: {rendered}");
    assert!(harness.leftovers().is_empty());
}

#[test]
fn test_disk_backed_source_compiles_in_place() {
    let harness = Harness::new();
    let root = DiskDirectory::new(fixture_path());
    let path = LogicalPath::new("site.less");
    let source = fs::read_to_string(fixture_path().join("site.less")).unwrap();

    let result = harness.fake_lessc().compile(&source, CompileContext::new(&root, &path)).unwrap();

    assert_eq!(result.imports, vec!["~/partials/_colors.less".to_string()]);
    assert!(result.css.unwrap().contains("@brand: #336699;"));
    assert!(harness.leftovers().is_empty());
}

#[test]
fn test_relative_disk_root_compiles_from_compiler_working_dir() {
    let harness = Harness::new();
    // Relative to the package directory; the compiler runs in the tools dir
    let root = DiskDirectory::new("tests/fixtures/less");
    let path = LogicalPath::new("site.less");
    let source = fs::read_to_string(fixture_path().join("site.less")).unwrap();

    let result = harness.fake_lessc().compile(&source, CompileContext::new(&root, &path)).unwrap();

    assert_eq!(result.imports, vec!["~/partials/_colors.less".to_string()]);
    assert!(result.css.unwrap().contains(".site { color: @brand; }"));
    assert!(harness.leftovers().is_empty());
}

#[test]
fn test_concurrent_compiles_do_not_interfere() {
    let harness = Harness::new();
    let compiler = harness.fake_lessc();

    let compile = |name: &str, body: &str| {
        let mut root = MemoryDirectory::new().with_file("shared.less", "");
        root.declare(name);
        let path = LogicalPath::new(name);
        compiler.compile(body, CompileContext::new(&root, &path))
    };

    let (first, second) = std::thread::scope(|s| {
        let a = s.spawn(|| compile("one.less", ".one{color:red;}"));
        let b = s.spawn(|| compile("two.less", ".two{color:blue;}"));
        (a.join().unwrap(), b.join().unwrap())
    });

    assert_eq!(first.unwrap().css.as_deref(), Some(".one{color:red;}"));
    assert_eq!(second.unwrap().css.as_deref(), Some(".two{color:blue;}"));
    assert!(harness.leftovers().is_empty());
}

#[test]
fn test_stage_compiles_only_less_assets_in_order() {
    let harness = Harness::new();
    let stage = CompileLessAssets::new(harness.fake_lessc());
    let root = MemoryDirectory::new().with_file("_base.less", ".base{}\n");

    let assets: Vec<StylesheetAsset> = (0..6)
        .map(|i| StylesheetAsset::new(format!("page{i}.less").as_str(), format!(".p{i}{{}}")))
        .chain(std::iter::once(StylesheetAsset::new("plain.css", ".css{}")))
        .collect();

    let compiled = stage.process(&root, &assets);

    assert_eq!(compiled.len(), 6);
    for (i, asset) in compiled.iter().enumerate() {
        assert_eq!(asset.path, LogicalPath::new(&format!("page{i}.less")));
        let result = asset.result.as_ref().expect("asset should compile");
        assert_eq!(result.css.as_deref(), Some(format!(".p{i}{{}}").as_str()));
    }
    assert!(harness.leftovers().is_empty());
}

#[test]
fn test_hung_compiler_times_out_and_cleans_up() {
    let harness = Harness::new();
    let compiler = harness.compiler("exec sleep 30\n", Duration::from_millis(300));
    let mut root = MemoryDirectory::new();
    root.declare("slow.less");
    let path = LogicalPath::new("slow.less");

    let start = Instant::now();
    let err = compiler.compile(".a{}", CompileContext::new(&root, &path)).unwrap_err();

    assert!(matches!(err, LessError::Timeout(_)), "expected timeout, got {err:?}");
    assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());
    assert!(harness.leftovers().is_empty(), "temp files left: {:?}", harness.leftovers());
}

#[test]
fn test_missing_compiler_is_launch_error_and_cleans_up() {
    let harness = Harness::new();
    let compiler = LessCompiler::new(CompilerConfig {
        temp_dir: Some(harness.temp_base.path().to_path_buf()),
        ..CompilerConfig::with_program(Path::new("/nonexistent/lessc"))
    });
    let mut root = MemoryDirectory::new();
    root.declare("a.less");
    let path = LogicalPath::new("a.less");

    let err = compiler.compile(".a{}", CompileContext::new(&root, &path)).unwrap_err();

    assert!(matches!(err, LessError::Launch { .. }), "got {err:?}");
    assert!(harness.leftovers().is_empty());
}
