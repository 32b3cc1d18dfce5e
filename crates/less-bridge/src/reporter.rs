use crate::types::CompileResult;

/// Print the CSS to stdout and the imported files to stderr
pub fn report_text(result: &CompileResult) {
    if let Some(css) = &result.css {
        print!("{css}");
        if !css.ends_with('\n') {
            println!();
        }
    }

    if !result.imports.is_empty() {
        eprintln!("Imported files ({}):", result.imports.len());
        for import in &result.imports {
            eprintln!("  {import}");
        }
    }
}

pub fn report_json(result: &CompileResult) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
