//! Paragraph text extraction from `.docx` files.
//!
//! Only paragraphs that sit directly in the document body count. Text inside tables,
//! text boxes and headers is left out, and each paragraph's text is the concatenation
//! of its runs (including runs wrapped in hyperlinks).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

const DOCUMENT_PART: &str = "word/document.xml";

/// Read a `.docx` file and return its body paragraphs joined by newlines.
pub fn read_docx(path: &Path) -> Result<String> {
    Ok(docx_paragraphs(path)?.join("\n"))
}

pub fn docx_paragraphs(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("'{}' is not a valid .docx archive", path.display()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .with_context(|| format!("'{}' has no {}", path.display(), DOCUMENT_PART))?
        .read_to_string(&mut xml)
        .with_context(|| format!("Failed to read {} from '{}'", DOCUMENT_PART, path.display()))?;

    parse_paragraphs(&xml).with_context(|| format!("Malformed document XML in '{}'", path.display()))
}

fn parse_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"w:p" if parent_is(&stack, b"w:body") => current = Some(String::new()),
                    b"w:t" if current.is_some() && in_paragraph_run(&stack) => in_text = true,
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" if parent_is(&stack, b"w:body") => paragraphs.push(String::new()),
                b"w:tab" if in_paragraph_run(&stack) => {
                    if let Some(text) = current.as_mut() {
                        text.push('\t');
                    }
                }
                b"w:br" if in_paragraph_run(&stack) => {
                    if let Some(text) = current.as_mut() {
                        if is_line_break(&e) {
                            text.push('\n');
                        }
                    }
                }
                b"w:cr" if in_paragraph_run(&stack) => {
                    if let Some(text) = current.as_mut() {
                        text.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.name().as_ref() {
                    b"w:t" => in_text = false,
                    b"w:p" if parent_is(&stack, b"w:body") => {
                        if let Some(text) = current.take() {
                            paragraphs.push(text);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Page and column breaks carry no text; only plain text-wrapping breaks do.
fn is_line_break(e: &BytesStart<'_>) -> bool {
    match e.try_get_attribute("w:type") {
        Ok(Some(attr)) => !matches!(attr.value.as_ref(), b"page" | b"column"),
        _ => true,
    }
}

fn parent_is(stack: &[Vec<u8>], tag: &[u8]) -> bool {
    stack.last().is_some_and(|top| top.as_slice() == tag)
}

/// True when the innermost open element is a run of a body-level paragraph.
fn in_paragraph_run(stack: &[Vec<u8>]) -> bool {
    let tags: Vec<&[u8]> = stack.iter().rev().take(4).map(|t| t.as_slice()).collect();
    match tags.as_slice() {
        [b"w:r", b"w:p", b"w:body", ..] => true,
        [b"w:r", b"w:hyperlink", b"w:p", b"w:body"] => true,
        _ => false,
    }
}

/// Write a minimal `.docx` with one body paragraph per entry.
#[cfg(test)]
pub(crate) fn write_docx(path: &Path, paragraphs: &[&str]) -> Result<()> {
    use std::io::Write;

    let mut body = String::new();
    for p in paragraphs {
        body.push_str(&format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p));
    }
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}<w:sectPr/></w:body></w:document>",
        body
    );

    let mut writer = zip::ZipWriter::new(File::create(path)?);
    writer.start_file(DOCUMENT_PART, zip::write::SimpleFileOptions::default())?;
    writer.write_all(xml.as_bytes())?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(
            "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        )
    }

    #[test]
    fn runs_are_concatenated_per_paragraph() {
        let xml = wrap(
            "<w:p><w:r><w:t>Hel</w:t></w:r><w:r><w:t>lo</w:t></w:r></w:p>\
             <w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:t>World</w:t></w:r></w:p>",
        );
        assert_eq!(parse_paragraphs(&xml).unwrap(), vec!["Hello", "World"]);
    }

    #[test]
    fn empty_paragraphs_are_kept() {
        let xml = wrap("<w:p><w:r><w:t>A</w:t></w:r></w:p><w:p/><w:p></w:p><w:p><w:r><w:t>B</w:t></w:r></w:p>");
        assert_eq!(parse_paragraphs(&xml).unwrap(), vec!["A", "", "", "B"]);
    }

    #[test]
    fn tabs_breaks_and_entities() {
        let xml = wrap("<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>Q&amp;A</w:t></w:r></w:p>");
        assert_eq!(parse_paragraphs(&xml).unwrap(), vec!["a\tb\nQ&A"]);
    }

    #[test]
    fn page_and_column_breaks_add_no_text() {
        let xml = wrap(
            "<w:p><w:r><w:t>a</w:t><w:br w:type=\"page\"/><w:t>b</w:t><w:br w:type=\"column\"/>\
             <w:t>c</w:t><w:br w:type=\"textWrapping\"/><w:t>d</w:t></w:r></w:p>",
        );
        assert_eq!(parse_paragraphs(&xml).unwrap(), vec!["abc\nd"]);
    }

    #[test]
    fn hyperlink_runs_count_and_tables_do_not() {
        let xml = wrap(
            "<w:p><w:r><w:t>See </w:t></w:r><w:hyperlink><w:r><w:t>docs</w:t></w:r></w:hyperlink></w:p>\
             <w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
             <w:p><w:r><w:t>after</w:t></w:r></w:p>",
        );
        assert_eq!(parse_paragraphs(&xml).unwrap(), vec!["See docs", "after"]);
    }

    #[test]
    fn round_trips_written_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.docx");
        write_docx(&path, &["Hello", "Second line"]).unwrap();
        assert_eq!(read_docx(&path).unwrap(), "Hello\nSecond line");
    }

    #[test]
    fn non_zip_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, "plain text").unwrap();
        let err = read_docx(&path).unwrap_err();
        assert!(err.to_string().contains("not a valid .docx"), "{err}");
    }
}
