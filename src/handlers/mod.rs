pub mod master;
pub mod report;

use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::Config;

/// File locations for one run: CLI flags first, then config, then built-in defaults.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub input_dir: PathBuf,
    pub example: PathBuf,
    pub prompts_dir: PathBuf,
    pub master_file: PathBuf,
    pub output_dir: PathBuf,
}

impl RunPaths {
    pub fn resolve(args: &Cli, cfg: &Config) -> Self {
        let pick = |flag: &Option<PathBuf>, key: &str, fallback: &str| {
            flag.clone()
                .or_else(|| cfg.get_path(key))
                .unwrap_or_else(|| PathBuf::from(fallback))
        };
        Self {
            input_dir: pick(&args.input_dir, "INPUT_DIR", "./data_files/inputs"),
            example: pick(&args.example, "EXAMPLE_PATH", "./example/example.txt"),
            prompts_dir: pick(&args.prompts_dir, "PROMPTS_PATH", "./prompts"),
            master_file: pick(
                &args.master_file,
                "MASTER_FILE_PATH",
                "./data_files/master_file/master_file.txt",
            ),
            output_dir: pick(&args.output_dir, "OUTPUT_DIR", "./data_files/outputs"),
        }
    }
}
