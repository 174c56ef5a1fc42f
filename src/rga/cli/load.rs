//! Implementation of the `load` subcommand.

use std::path::PathBuf;

use clap::Parser;

use super::Index;
use crate::rga::load::read_individuals;

/// Command line arguments for `load` sub command.
#[derive(Parser, Debug)]
#[command(about = "Bulk-load knockouts of individuals into the index", long_about = None)]
pub struct Args {
    /// Directory of the index.
    #[arg(long, required = true)]
    pub path_index: PathBuf,
    /// Study to load into.
    #[arg(long, required = true)]
    pub study: String,
    /// Newline-delimited JSON of individuals, `.json` or `.json.gz`.
    #[arg(long, required = true)]
    pub path_input: PathBuf,
    /// Optional JSON configuration.
    #[arg(long)]
    pub path_config: Option<PathBuf>,
}

/// Main entry point for the `load` command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let index = Index::open(&args.path_index, &args.study, args.path_config.as_deref())?;
    let individuals = read_individuals(&args.path_input)?;
    tracing::info!("read {} individuals", individuals.len());

    index.variants.add_individuals(&args.study, &individuals)?;
    let stats = index.manager.load(&args.study, &individuals)?;
    index.variants.save(&args.study, &index.path_variants)?;

    tracing::info!("load stats = {:#?}", &stats);
    tracing::info!(
        "All of `load` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
