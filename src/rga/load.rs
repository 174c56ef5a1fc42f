//! Bulk load of individual-centric knockouts into the index of a study.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use crate::common::io::read_json_lines;
use crate::rga::convert::StorageConverter;
use crate::rga::manager::RgaManager;
use crate::rga::model::KnockoutByIndividual;

/// Counters of one load.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    pub num_individuals: usize,
    /// Individuals that failed to convert.
    pub num_skipped: usize,
    pub num_records: usize,
    pub num_batches: usize,
}

impl RgaManager {
    /// Convert `individuals` into flat records and insert them batch-wise.
    ///
    /// The samples of a batch are marked as indexed once it is inserted.
    pub fn load(
        &self,
        study: &str,
        individuals: &[KnockoutByIndividual],
    ) -> Result<LoadStats, anyhow::Error> {
        let before = Instant::now();
        let collection = self.config.collection_name(study);
        if !self.engine.exists(&collection)? {
            tracing::info!("creating collection {}", &collection);
            self.engine.create(&collection)?;
        }

        let converter = StorageConverter::new(self.codec());
        let mut stats = LoadStats::default();
        for batch in individuals.chunks(self.config.insert_batch_size.max(1)) {
            let converted = self.pool.install(|| {
                batch
                    .par_iter()
                    .map(|individual| (individual, converter.convert_individual(individual)))
                    .collect::<Vec<_>>()
            });

            let mut records = Vec::new();
            let mut sample_ids = Vec::new();
            for (individual, result) in converted {
                stats.num_individuals += 1;
                match result {
                    Ok(converted) => {
                        sample_ids.push(individual.sample_id.clone());
                        records.extend(converted);
                    }
                    Err(e) => {
                        tracing::warn!("skipping individual {}: {}", &individual.id, e);
                        stats.num_skipped += 1;
                    }
                }
            }

            stats.num_records += records.len();
            stats.num_batches += 1;
            self.engine.insert(&collection, records)?;
            self.catalog.mark_indexed(study, &sample_ids)?;
            tracing::debug!(
                "inserted batch {} with {} samples",
                stats.num_batches,
                sample_ids.len()
            );
        }

        tracing::info!(
            "loaded {} individuals into {} records in {:?}",
            stats.num_individuals - stats.num_skipped,
            stats.num_records,
            before.elapsed()
        );
        Ok(stats)
    }

    /// Load a file of individuals as read by [`read_individuals`].
    pub fn load_file<P: AsRef<Path>>(&self, study: &str, path: P) -> Result<LoadStats, anyhow::Error> {
        let individuals = read_individuals(path)?;
        self.load(study, &individuals)
    }
}

/// Read newline-delimited JSON of [`KnockoutByIndividual`], plain or
/// gzip-compressed.
pub fn read_individuals<P: AsRef<Path>>(path: P) -> Result<Vec<KnockoutByIndividual>, anyhow::Error> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    if !file_name.ends_with("json") && !file_name.ends_with("json.gz") {
        anyhow::bail!(
            "File format {} not supported. Please, use JSON file format.",
            path.display()
        );
    }

    tracing::info!("reading individuals from {}", path.display());
    read_json_lines(path)
}
