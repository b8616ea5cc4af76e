//! Utilities (document reading, report files, external converter).

pub mod command;
pub mod docx;
pub mod document;
pub mod pdf;

pub use command::{convert_markdown_to_docx, save_markdown_to_file};
pub use document::{build_master_text, format_document_block, process_input_docs, read_document, write_master_file};
