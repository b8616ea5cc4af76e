//! Reading input documents and folding them into the master text.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

const SEPARATOR_WIDTH: usize = 50;

/// A source document: its file name and extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub content: String,
}

/// Read a single document and return its text.
///
/// `.docx` files yield their paragraph text, `.txt` and `.md` are read verbatim and
/// `.pdf` goes through text extraction. Any other extension is rejected before the
/// file is opened.
pub fn read_document(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "docx" => super::docx::read_docx(path),
        "txt" | "md" => fs::read_to_string(path)
            .with_context(|| format!("Failed to read file '{}'", path.display())),
        "pdf" => super::pdf::extract_pdf_text(path),
        _ => bail!(
            "Unsupported file type: .{}\nCurrently supported: .docx, .txt, .md, .pdf",
            extension
        ),
    }
}

/// Read every `.docx` file in `directory`, in directory listing order.
///
/// The listing order is whatever the platform returns; it is not sorted.
pub fn process_input_docs(directory: &Path) -> Result<Vec<Document>> {
    let entries = fs::read_dir(directory)
        .with_context(|| format!("Failed to list input directory '{}'", directory.display()))?;

    let mut docs = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".docx") {
            debug!(file = %name, "skipping non-docx entry");
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let content = super::docx::read_docx(&path)?;
        debug!(file = %name, chars = content.len(), "read input document");
        docs.push(Document { name, content });
    }

    info!(directory = %directory.display(), documents = docs.len(), "processed input documents");
    Ok(docs)
}

/// Fold documents into the master text, one delimited block per document.
pub fn build_master_text(docs: &[Document]) -> String {
    let mut master = String::new();
    for doc in docs {
        master.push_str(&format_document_block(doc));
        master.push_str("\n\n");
    }
    master
}

/// The `File:`/`Content:` block for one document, ending with the dash separator line.
pub fn format_document_block(doc: &Document) -> String {
    format!(
        "File: {}\nContent: {}\n{}\n",
        doc.name,
        doc.content,
        "-".repeat(SEPARATOR_WIDTH)
    )
}

/// Write the master text, creating parent directories as needed.
pub fn write_master_file(master: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }
    fs::write(path, master)
        .with_context(|| format!("Failed to write master file '{}'", path.display()))
}
