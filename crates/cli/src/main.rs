//! e2e-reports - Main Entry Point
//!
//! Housekeeping for the audit reports the end-to-end suite leaves behind.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use console_e2e_cli::commands::{clean, index};
use console_e2e_cli::output::{self, print_error};

/// Manage generated Lighthouse reports
#[derive(Parser)]
#[command(name = "e2e-reports")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Reports directory
    #[arg(long, env = "E2E_REPORTS_DIR", default_value = "reports", global = true)]
    reports_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Delete generated reports
    Clean(clean::CleanArgs),

    /// Write an HTML index of the reports
    Index(index::IndexArgs),
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Clean(args) => clean::execute(args, &cli.reports_dir, cli.format),
        Commands::Index(args) => index::execute(args, &cli.reports_dir),
    };

    if let Err(e) = result {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
