//! Source of the variant details that the flat records only reference by id.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use indexmap::IndexMap;

use crate::common::io::{read_json_lines, write_json_lines};
use crate::rga::codec::KnockoutType;
use crate::rga::model::{KnockoutByIndividual, KnockoutVariant, SequenceOntologyTerm};

/// Call of a variant in one sample.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleCall {
    pub genotype: String,
    pub depth: Option<i32>,
    pub filter: String,
    pub qual: Option<f32>,
    pub parental_origin: String,
}

/// Details of one variant.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariantDetail {
    /// Sample- and transcript-independent attributes.
    pub variant: KnockoutVariant,
    /// Calls by sample id.
    pub samples: IndexMap<String, SampleCall>,
    /// Consequences by transcript id.
    pub consequences: IndexMap<String, Vec<SequenceOntologyTerm>>,
}

impl VariantDetail {
    /// The variant as seen in `sample_id` and `transcript_id`.
    pub fn knockout_variant(
        &self,
        sample_id: &str,
        transcript_id: &str,
        knockout_type: Option<KnockoutType>,
    ) -> KnockoutVariant {
        let mut result = self.variant.clone();
        if let Some(call) = self.samples.get(sample_id) {
            result.genotype = call.genotype.clone();
            result.depth = call.depth;
            result.filter = call.filter.clone();
            result.qual = call.qual;
            result.parental_origin = call.parental_origin.clone();
        }
        if let Some(terms) = self.consequences.get(transcript_id) {
            result.sequence_ontology_terms = terms.clone();
        }
        result.knockout_type = knockout_type;
        result
    }

    /// Merge the observation of `variant` in `sample_id` and `transcript_id`.
    fn add_observation(&mut self, sample_id: &str, transcript_id: &str, variant: &KnockoutVariant) {
        if self.variant.id.is_empty() {
            self.variant = KnockoutVariant {
                genotype: String::new(),
                depth: None,
                filter: String::new(),
                qual: None,
                knockout_type: None,
                parental_origin: String::new(),
                sequence_ontology_terms: Vec::new(),
                ..variant.clone()
            };
        }
        self.samples.insert(
            sample_id.to_string(),
            SampleCall {
                genotype: variant.genotype.clone(),
                depth: variant.depth,
                filter: variant.filter.clone(),
                qual: variant.qual,
                parental_origin: variant.parental_origin.clone(),
            },
        );
        self.consequences.insert(
            transcript_id.to_string(),
            variant.sequence_ontology_terms.clone(),
        );
    }
}

/// Variant details keyed by variant id.
pub type VariantMap = HashMap<String, VariantDetail>;

/// Bulk lookup of variant details.
pub trait VariantSource: Send + Sync {
    /// Details of the variants with the given ids; unknown ids are ignored.
    fn fetch(&self, study: &str, ids: &[String]) -> Result<Vec<VariantDetail>, anyhow::Error>;
}

/// In-memory variant source, persisted as JSONL next to the index.
#[derive(Debug, Default)]
pub struct MemoryVariantSource {
    /// Details by study and variant id.
    studies: RwLock<HashMap<String, VariantMap>>,
}

impl MemoryVariantSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the details of all variants of `individuals` into `study`.
    pub fn add_individuals(
        &self,
        study: &str,
        individuals: &[KnockoutByIndividual],
    ) -> Result<(), anyhow::Error> {
        let mut studies = self
            .studies
            .write()
            .map_err(|e| anyhow::anyhow!("variant source lock poisoned: {}", e))?;
        let variants = studies.entry(study.to_string()).or_default();
        for individual in individuals {
            for gene in &individual.genes {
                for transcript in &gene.transcripts {
                    for variant in &transcript.variants {
                        variants
                            .entry(variant.id.clone())
                            .or_default()
                            .add_observation(&individual.sample_id, &transcript.id, variant);
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of variants known for `study`.
    pub fn len(&self, study: &str) -> usize {
        self.studies
            .read()
            .map(|studies| studies.get(study).map(|v| v.len()).unwrap_or_default())
            .unwrap_or_default()
    }

    /// Load the details of `study` from `path`, if it exists.
    pub fn load(&self, study: &str, path: &Path) -> Result<(), anyhow::Error> {
        if !path.exists() {
            tracing::debug!("no variant details at {}", path.display());
            return Ok(());
        }
        let variants = read_json_lines::<VariantDetail, _>(path)?
            .into_iter()
            .map(|detail| (detail.variant.id.clone(), detail))
            .collect::<VariantMap>();
        tracing::debug!("loaded {} variant details from {}", variants.len(), path.display());
        self.studies
            .write()
            .map_err(|e| anyhow::anyhow!("variant source lock poisoned: {}", e))?
            .insert(study.to_string(), variants);
        Ok(())
    }

    /// Write the details of `study` to `path`, sorted by variant id.
    pub fn save(&self, study: &str, path: &Path) -> Result<(), anyhow::Error> {
        let studies = self
            .studies
            .read()
            .map_err(|e| anyhow::anyhow!("variant source lock poisoned: {}", e))?;
        let mut details = studies
            .get(study)
            .map(|variants| variants.values().collect::<Vec<_>>())
            .unwrap_or_default();
        details.sort_by(|a, b| a.variant.id.cmp(&b.variant.id));
        write_json_lines(path, details)?;
        Ok(())
    }
}

impl VariantSource for MemoryVariantSource {
    fn fetch(&self, study: &str, ids: &[String]) -> Result<Vec<VariantDetail>, anyhow::Error> {
        let studies = self
            .studies
            .read()
            .map_err(|e| anyhow::anyhow!("variant source lock poisoned: {}", e))?;
        Ok(studies
            .get(study)
            .map(|variants| {
                ids.iter()
                    .filter_map(|id| variants.get(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rga::model::{KnockoutGene, KnockoutTranscript};

    fn individual(sample_id: &str, transcript_id: &str, genotype: &str) -> KnockoutByIndividual {
        KnockoutByIndividual {
            id: sample_id.into(),
            sample_id: sample_id.into(),
            genes: vec![KnockoutGene {
                id: "G1".into(),
                transcripts: vec![KnockoutTranscript {
                    id: transcript_id.into(),
                    variants: vec![KnockoutVariant {
                        genotype: genotype.into(),
                        filter: "PASS".into(),
                        db_snp: "rs1".into(),
                        sequence_ontology_terms: vec![SequenceOntologyTerm::new(
                            "SO:0001583".into(),
                            "missense_variant".into(),
                        )],
                        ..KnockoutVariant::with_id("1:100:A:G")
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn collect_and_fetch() -> Result<(), anyhow::Error> {
        let source = MemoryVariantSource::new();
        source.add_individuals("S", &[individual("S1", "T1", "1/1"), individual("S2", "T2", "0/1")])?;
        assert_eq!(source.len("S"), 1);

        let details = source.fetch("S", &["1:100:A:G".to_string(), "1:1:C:T".to_string()])?;
        assert_eq!(details.len(), 1);
        let detail = &details[0];
        assert_eq!(detail.variant.db_snp, "rs1");
        assert_eq!(detail.variant.genotype, "");
        assert_eq!(detail.samples.len(), 2);

        let variant = detail.knockout_variant("S2", "T2", Some(KnockoutType::HetAlt));
        assert_eq!(variant.genotype, "0/1");
        assert_eq!(variant.filter, "PASS");
        assert_eq!(variant.knockout_type, Some(KnockoutType::HetAlt));
        assert_eq!(variant.sequence_ontology_terms.len(), 1);
        assert!(detail
            .knockout_variant("S3", "T3", None)
            .sequence_ontology_terms
            .is_empty());
        assert!(source.fetch("other", &["1:100:A:G".to_string()])?.is_empty());
        Ok(())
    }

    #[test]
    fn save_and_load() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("variants.jsonl");

        let source = MemoryVariantSource::new();
        source.add_individuals("S", &[individual("S1", "T1", "1/1")])?;
        source.save("S", &path)?;

        let loaded = MemoryVariantSource::new();
        loaded.load("S", &path)?;
        assert_eq!(
            loaded.fetch("S", &["1:100:A:G".to_string()])?,
            source.fetch("S", &["1:100:A:G".to_string()])?
        );
        loaded.load("T", &tmp_dir.join("missing.jsonl"))?;
        assert_eq!(loaded.len("T"), 0);
        Ok(())
    }
}
