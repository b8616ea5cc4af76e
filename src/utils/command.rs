//! Writing the markdown report and converting it with pandoc.

use std::fs;
use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Write `content` to `path`, creating parent directories as needed.
pub fn save_markdown_to_file(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write '{}'", path.display()))
}

/// Convert a markdown file to `.docx` by running `program` (pandoc or compatible).
///
/// A missing program or a non-zero exit is an error carrying the converter's stderr.
pub async fn convert_markdown_to_docx(program: &str, markdown: &Path, output: &Path) -> Result<()> {
    debug!(program, input = %markdown.display(), output = %output.display(), "running converter");
    let result = Command::new(program)
        .arg(markdown)
        .args(["-f", "markdown", "-t", "docx", "-o"])
        .arg(output)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to run '{}'; is it installed?", program))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        bail!("'{}' exited with {}: {}", program, result.status, stderr.trim());
    }
    info!(output = %output.display(), "converted report to docx");
    Ok(())
}
