mod cli;
mod config;
mod handlers;
mod llm;
mod printer;
mod prompt;
mod utils;

use anyhow::Result;
use cli::{Cli, LogFormat};
use config::Config;
use handlers::master::MasterHandler;
use handlers::report::{ReportHandler, ReportOptions};
use handlers::RunPaths;
use is_terminal::IsTerminal;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args);

    let cfg = Config::load();
    tracing::debug!(config = %cfg.config_path.display(), "loaded configuration");
    let paths = RunPaths::resolve(&args, &cfg);

    if args.master_only {
        MasterHandler::run(&paths, true)?;
        return Ok(());
    }

    // Rendering defaults to on only when stdout is a terminal.
    let render_markdown = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        std::io::stdout().is_terminal()
    };

    let outputs = ReportHandler::run(
        &cfg,
        &paths,
        ReportOptions {
            vendor: args.vendor,
            prompt_name: args.prompt.clone(),
            temperature: args.temperature,
            convert: !args.no_convert,
            render_markdown,
        },
    )
    .await?;
    tracing::debug!(
        markdown = %outputs.markdown.display(),
        docx = outputs.docx.as_ref().map(|p| p.display().to_string()).unwrap_or_default(),
        "run complete"
    );
    Ok(())
}

fn init_tracing(args: &Cli) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match args.verbose {
        0 => "reportsmith=info",
        1 => "reportsmith=debug",
        _ => "reportsmith=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match args.log_format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}
