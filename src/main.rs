//! Recessive gene analysis worker main executable

pub mod common;
pub mod err;
pub mod rga;

use std::process::{ExitCode, Termination};

use clap::{Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Recessive gene analysis worker",
    long_about = "This tool indexes and queries the gene knockouts of individuals"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Bulk-load knockouts of individuals.
    Load(rga::cli::load::Args),
    /// Query individuals, genes or variants.
    Query(rga::cli::query::Args),
    /// Summarise individuals, genes or variants.
    Summary(rga::cli::query::Args),
}

fn run(cli: &Cli) -> Result<(), anyhow::Error> {
    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Load(args) => rga::cli::load::run(&cli.common, args)?,
            Commands::Query(args) => rga::cli::query::run(&cli.common, args)?,
            Commands::Summary(args) => rga::cli::summary::run(&cli.common, args)?,
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            match e.downcast::<err::RgaError>() {
                Ok(e) => e.report(),
                Err(_) => ExitCode::FAILURE,
            }
        }
    }
}
