//! Configuration of the knockout index and its queries.

use std::path::Path;

use crate::rga::query::CompHetQueryMode;

/// Tunables of loading, querying and summarising.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RgaConfig {
    /// Prefix of the collection names.
    pub database_prefix: String,
    /// Size of the worker pool.
    pub num_threads: usize,
    /// Number of individuals converted and inserted at once.
    pub insert_batch_size: usize,
    /// Number of variant ids per detail fetch.
    pub variant_batch_size: usize,
    /// Deepest skip into the individuals of a study.
    pub max_skip: usize,
    /// Number of sample ids per authorisation request.
    pub authorisation_batch_size: usize,
    /// Number of distinct ids collected before counts are extrapolated.
    pub approximate_count_sample_size: usize,
    /// Below this number of variants, an individual summary lists them.
    pub max_summary_variant_ids: usize,
    /// Largest per-transcript CH set for which pairs are counted.
    pub max_paired_comp_het_set: usize,
    pub default_limit: usize,
    pub default_individual_limit: usize,
    pub comp_het_query_mode: CompHetQueryMode,
    /// Consequence types never matched for deletion overlaps.
    pub deletion_overlap_excluded_consequence_types: Vec<String>,
}

impl Default for RgaConfig {
    fn default() -> Self {
        Self {
            database_prefix: "rga".to_string(),
            num_threads: 4,
            insert_batch_size: 25,
            variant_batch_size: 500,
            max_skip: 10_000,
            authorisation_batch_size: 1000,
            approximate_count_sample_size: 10_000,
            max_summary_variant_ids: 100,
            max_paired_comp_het_set: 50,
            default_limit: 10,
            default_individual_limit: 1000,
            comp_het_query_mode: CompHetQueryMode::Single,
            deletion_overlap_excluded_consequence_types: vec!["missense_variant".to_string()],
        }
    }
}

impl RgaConfig {
    /// Load from a JSON file; missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        tracing::debug!("loading configuration from {:?}", path.as_ref());
        let contents = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&contents).map_err(|e| {
            anyhow::anyhow!("invalid configuration in {:?}: {}", path.as_ref(), e)
        })
    }

    /// Load from `path` if given, else use the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self, anyhow::Error> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Name of the collection holding the records of `study`.
    pub fn collection_name(&self, study: &str) -> String {
        format!("{}-rga-{}", self.database_prefix, study).replace(['@', ':'], "_")
    }
}
