//! PDF text extraction for style examples.
//!
//! `pdftotext` is preferred when it is on PATH; otherwise `pdf-extract` does the work.
//! Form feeds between pages become blank lines so the text reads as one document.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Result};
use tracing::debug;

pub fn extract_pdf_text(path: &Path) -> Result<String> {
    if let Ok(output) = Command::new("pdftotext")
        .args(["-q", "-enc", "UTF-8", "-layout"])
        .arg(path)
        .arg("-")
        .stderr(Stdio::null())
        .output()
    {
        if output.status.success() {
            debug!(path = %path.display(), "extracted pdf text with pdftotext");
            return Ok(join_pages(&String::from_utf8_lossy(&output.stdout)));
        }
    }

    let raw = pdf_extract::extract_text(path)
        .map_err(|e| anyhow!("Failed to extract text from PDF '{}': {}", path.display(), e))?;
    Ok(join_pages(&raw))
}

fn join_pages(raw: &str) -> String {
    raw.split('\u{000C}')
        .map(|page| page.trim_end())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
