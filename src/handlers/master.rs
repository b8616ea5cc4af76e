//! Master handler: scans the input folder and writes the combined master file.

use anyhow::Result;

use crate::handlers::RunPaths;
use crate::printer::{TextPrinter, Tone};
use crate::utils::{build_master_text, format_document_block, process_input_docs, write_master_file};

pub struct MasterHandler;

impl MasterHandler {
    /// Build and write the master text, returning it.
    ///
    /// With `echo`, every document block is printed as well.
    pub fn run(paths: &RunPaths, echo: bool) -> Result<String> {
        let docs = process_input_docs(&paths.input_dir)?;
        let master = build_master_text(&docs);
        write_master_file(&master, &paths.master_file)?;

        TextPrinter::new(Tone::Info).print(&format!(
            "Combined documents exported to: {}",
            paths.master_file.display()
        ));

        if echo {
            for doc in &docs {
                println!("{}\n\n", format_document_block(doc).trim_end());
            }
        }
        Ok(master)
    }
}
