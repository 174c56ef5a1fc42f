//! Implementation of the `summary` subcommand.

use super::query::{load_request, Args};
use super::{write_output, Index};
use crate::rga::convert::ConverterKind;

/// Main entry point for the `summary` command.
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
            &manager.individual_summary(&args.study, &query, &options, &args.user)?,
        )?,
        ConverterKind::Gene => write_output(
            &args.path_output,
            &manager.gene_summary(&args.study, &query, &options)?,
        )?,
        ConverterKind::Variant => write_output(
            &args.path_output,
            &manager.variant_summary(&args.study, &query, &options)?,
        )?,
    }

    tracing::info!(
        "All of `summary {}` completed in {:?}",
        args.kind,
        before_anything.elapsed()
    );
    Ok(())
}
