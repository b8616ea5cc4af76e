//! Report handler: master text + example + prompt -> vendor -> markdown -> docx.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::handlers::master::MasterHandler;
use crate::handlers::RunPaths;
use crate::llm::{generate_report, generator_for, Vendor};
use crate::printer::{MarkdownPrinter, TextPrinter, Tone};
use crate::prompt::PromptTemplate;
use crate::utils::{convert_markdown_to_docx, read_document, save_markdown_to_file};

pub struct ReportOptions {
    pub vendor: Option<Vendor>,
    pub prompt_name: String,
    pub temperature: f32,
    pub convert: bool,
    pub render_markdown: bool,
}

/// Files produced by one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutputs {
    pub markdown: PathBuf,
    pub docx: Option<PathBuf>,
}

pub struct ReportHandler;

impl ReportHandler {
    pub async fn run(cfg: &Config, paths: &RunPaths, opts: ReportOptions) -> Result<ReportOutputs> {
        let master = MasterHandler::run(paths, false)?;
        let example = read_document(&paths.example)?;

        let vendor = match opts.vendor {
            Some(v) => v,
            None => {
                let stdin = std::io::stdin();
                choose_vendor(&mut stdin.lock(), &mut std::io::stdout())?
            }
        };

        let template = PromptTemplate::load(&paths.prompts_dir, &opts.prompt_name)?;
        debug!(name = %opts.prompt_name, chars = template.text().len(), "loaded prompt template");
        let prompt = template.render_report(&master, &example)?;
        let generator = generator_for(vendor, cfg, opts.temperature)?;
        let report = generate_report(generator.as_ref(), &prompt).await;

        let stem = output_stem(&paths.input_dir, vendor);
        let markdown = paths.output_dir.join(format!("{}.md", stem));
        save_markdown_to_file(&report, &markdown)?;
        info!(path = %markdown.display(), "saved markdown report");

        let docx = if opts.convert {
            let docx = paths.output_dir.join(format!("{}.docx", stem));
            convert_markdown_to_docx(&cfg.pandoc_program(), &markdown, &docx).await?;
            TextPrinter::new(Tone::Success).print(&format!(
                "Monthly Status Report has been generated using {} and saved to '{}'",
                vendor,
                docx.display()
            ));
            Some(docx)
        } else {
            TextPrinter::new(Tone::Success).print(&format!(
                "Monthly Status Report has been generated using {} and saved to '{}'",
                vendor,
                markdown.display()
            ));
            None
        };

        if opts.render_markdown && !report.is_empty() {
            MarkdownPrinter::default().print(&report);
        }

        Ok(ReportOutputs { markdown, docx })
    }
}

/// Ask for a vendor until a valid one is entered. End of input is an error.
pub fn choose_vendor<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<Vendor> {
    loop {
        write!(out, "Choose a model (gemini/claude/gpt4): ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            bail!("No model chosen: input closed");
        }
        match line.parse::<Vendor>() {
            Ok(v) => return Ok(v),
            Err(_) => writeln!(out, "Invalid choice. Please choose gemini, claude, or gpt4.")?,
        }
    }
}

/// `<input folder name>_<vendor>`, used for both output files.
pub fn output_stem(input_dir: &Path, vendor: Vendor) -> String {
    let folder = input_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "report".into());
    format!("{}_{}", folder, vendor)
}
