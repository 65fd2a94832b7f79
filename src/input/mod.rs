use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::Language;

/// Map a caller-declared language name onto the family that decides how it runs.
pub fn detect_language(declared: &str) -> Language {
    let declared = declared.trim().to_lowercase();

    match declared.as_str() {
        "javascript" | "js" | "typescript" | "ts" | "node" => Language::Script,
        "html" | "htm" => Language::Markup,
        "css" => Language::Stylesheet,
        _ => Language::Other(declared),
    }
}

/// Guess a declared language name from a file extension
pub fn language_from_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();

    match ext.as_str() {
        "js" | "mjs" | "cjs" => Some("javascript"),
        "ts" | "mts" => Some("typescript"),
        "html" | "htm" => Some("html"),
        "css" => Some("css"),
        "py" => Some("python"),
        _ => None,
    }
}

/// Read source text from a file, or from stdin when the path is absent or `-`.
pub fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file {}", path.display())),
        _ => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read source from stdin")?;
            Ok(source)
        }
    }
}
