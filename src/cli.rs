use std::path::PathBuf;

use clap::{ArgGroup, Parser, ValueEnum};

use crate::llm::{parse_vendor, Vendor};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "reportsmith",
    about = "Turn a folder of Word documents into a monthly status report with a hosted LLM",
    version
)]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
pub struct Cli {
    /// Folder of .docx files to summarise.
    #[arg(long = "input-dir", value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Example report whose style the model should follow (.txt, .md, .docx or .pdf).
    #[arg(long, value_name = "FILE")]
    pub example: Option<PathBuf>,

    /// Model vendor to use (gemini, claude, gpt4). Asked interactively when omitted.
    #[arg(long, value_parser = parse_vendor)]
    pub vendor: Option<Vendor>,

    /// Name of the prompt template in the prompts folder, without `.txt`.
    #[arg(long, default_value = "monthly_status_report")]
    pub prompt: String,

    /// Folder holding prompt templates.
    #[arg(long = "prompts-dir", value_name = "DIR")]
    pub prompts_dir: Option<PathBuf>,

    /// Where the combined master text is written.
    #[arg(long = "master-file", value_name = "FILE")]
    pub master_file: Option<PathBuf>,

    /// Folder for the generated .md and .docx reports.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Randomness of generated output.
    #[arg(long, default_value_t = 0.0, value_parser = clap::value_parser!(f32))]
    pub temperature: f32,

    /// Only write the markdown report; skip the pandoc conversion.
    #[arg(long = "no-convert")]
    pub no_convert: bool,

    /// Build the master file, print the documents and stop.
    #[arg(long = "master-only")]
    pub master_only: bool,

    /// Render the generated report in the terminal.
    #[arg(long)]
    pub md: bool,
    /// Do not render the generated report in the terminal.
    #[arg(long = "no-md")]
    pub no_md: bool,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log line format on stderr.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
