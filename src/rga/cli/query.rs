//! Implementation of the `query` subcommand.

use std::path::{Path, PathBuf};

use clap::Parser;

use super::{write_output, Index};
use crate::rga::convert::ConverterKind;
use crate::rga::query::{QueryOptions, RgaQuery};

/// Command line arguments for the `query` and `summary` sub commands.
#[derive(Parser, Debug)]
#[command(about = "Query the knockouts of a study", long_about = None)]
pub struct Args {
    /// Entity to report on: individual, gene or variant.
    pub kind: ConverterKind,
    /// Directory of the index.
    #[arg(long, required = true)]
    pub path_index: PathBuf,
    /// Study to query.
    #[arg(long, required = true)]
    pub study: String,
    /// JSON object mapping query parameters to values.
    #[arg(long, required = true)]
    pub path_query: PathBuf,
    /// JSON object with paging and projection options.
    #[arg(long)]
    pub path_options: Option<PathBuf>,
    /// Optional JSON configuration.
    #[arg(long)]
    pub path_config: Option<PathBuf>,
    /// User to check sample permissions for.
    #[arg(long, default_value = "anonymous")]
    pub user: String,
    /// Path to the JSON output, `.gz` for compressed output.
    #[arg(long, required = true)]
    pub path_output: PathBuf,
}

/// Read the query and the options named in `args`.
pub(crate) fn load_request(args: &Args) -> Result<(RgaQuery, QueryOptions), anyhow::Error> {
    let query = read_json(&args.path_query)?;
    let options = match &args.path_options {
        Some(path) => read_json(path)?,
        None => QueryOptions::default(),
    };
    tracing::debug!("query = {:?}, options = {:?}", &query, &options);
    Ok((query, options))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, anyhow::Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("could not read {}: {}", path.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid JSON in {}: {}", path.display(), e))
}

/// Main entry point for the `query` command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = std::time::Instant::now();
    tracing::info!("args_common = {:#?}", &args_common);
    tracing::info!("args = {:#?}", &args);

    let index = Index::open(&args.path_index, &args.study, args.path_config.as_deref())?;
    let (query, options) = load_request(args)?;
    let manager = &index.manager;
    match args.kind {
        ConverterKind::Individual => write_output(
            &args.path_output,
            &manager.individual_query(&args.study, &query, &options, &args.user)?,
        )?,
        ConverterKind::Gene => write_output(
            &args.path_output,
            &manager.gene_query(&args.study, &query, &options, &args.user)?,
        )?,
        ConverterKind::Variant => write_output(
            &args.path_output,
            &manager.variant_query(&args.study, &query, &options, &args.user)?,
        )?,
    }

    tracing::info!(
        "All of `query {}` completed in {:?}",
        args.kind,
        before_anything.elapsed()
    );
    Ok(())
}
