use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::process;
use tracing_subscriber::EnvFilter;

use reqlog::cli::Cli;
use reqlog::formatters::create_formatter;
use reqlog::readers::open_input;
use reqlog::{run_analysis, AnalyzerConfig};

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    GeneralError = 1,
}

impl ExitCode {
    fn exit(self) -> ! {
        process::exit(self as i32)
    }
}

/// Initialize tracing on stderr; RUST_LOG overrides the -v level
fn init_logging(config: &AnalyzerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(config.output.verbose >= 2)
        .with_line_number(config.output.verbose >= 3)
        .init();

    tracing::debug!("reqlog started with verbosity level: {}", config.output.verbose);
}

fn run(config: &AnalyzerConfig) -> Result<()> {
    let reader = open_input(config.input.file.as_deref())?;
    let analysis = run_analysis(config, reader)?;

    let rendered = create_formatter(config.output.format).format(&analysis.report)?;
    match &config.output.file {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path))?;
            file.write_all(rendered.as_bytes())
                .with_context(|| format!("Failed to write output file '{}'", path))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .and_then(|_| handle.flush())
                .context("Failed to write report to stdout")?;
        }
    }

    if config.output.stats {
        eprintln!("{}", analysis.stats.format_stats());
    }

    Ok(())
}

fn main() {
    // Exits with status 2 on invalid usage
    let cli = Cli::parse();
    let config = AnalyzerConfig::from_cli(&cli);
    init_logging(&config);

    match run(&config) {
        Ok(()) => ExitCode::Success.exit(),
        Err(e) => {
            eprintln!("reqlog: Error: {:#}", e);
            ExitCode::GeneralError.exit();
        }
    }
}
