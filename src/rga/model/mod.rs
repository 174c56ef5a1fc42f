//! Domain objects handed out by the converters and read by the loader.

use crate::rga::codec::KnockoutType;

pub mod record;
pub mod result;
pub mod summary;

/// Ontology term of a phenotype or disorder.
///
/// Only `id` and `name` are interpreted, all other attributes are kept
/// verbatim.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct OntologyTerm {
    /// Term identifier, e.g., `HP:0000118`.
    pub id: String,
    /// Term label.
    #[serde(default)]
    pub name: String,
    /// Remaining attributes.
    #[serde(flatten)]
    #[new(default)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Allele frequency of a variant in one population of a study.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
#[serde(rename_all = "camelCase")]
pub struct PopulationFrequency {
    /// Population study name, e.g., `GNOMAD_GENOMES`.
    pub study: String,
    /// Population within the study, e.g., `ALL`.
    pub population: String,
    /// Alternative allele frequency.
    #[serde(default)]
    pub alt_allele_freq: f32,
}

/// Sequence Ontology term of a consequence.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
#[serde(rename_all = "camelCase")]
pub struct SequenceOntologyTerm {
    /// Accession, e.g., `SO:0001583`.
    pub accession: String,
    /// Term name, e.g., `missense_variant`.
    pub name: String,
}

/// A variant knocking out a transcript.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnockoutVariant {
    /// Variant identifier `chrom:pos:ref:alt`.
    pub id: String,
    pub db_snp: String,
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
    pub length: i32,
    pub reference: String,
    pub alternate: String,
    /// Variant type, e.g., `SNV`.
    #[serde(rename = "type")]
    pub type_: String,
    pub genotype: String,
    pub depth: Option<i32>,
    /// Filter value of the call, e.g., `PASS`.
    pub filter: String,
    pub qual: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knockout_type: Option<KnockoutType>,
    /// `MATERNAL`, `PATERNAL` or unknown.
    pub parental_origin: String,
    pub sequence_ontology_terms: Vec<SequenceOntologyTerm>,
    pub clinical_significance: Vec<String>,
    pub population_frequencies: Vec<PopulationFrequency>,
}

impl KnockoutVariant {
    /// Construct with coordinates parsed from a `chrom:pos:ref:alt` id.
    ///
    /// Ids of other shapes only set `id`.
    pub fn with_id(id: &str) -> Self {
        let mut result = Self {
            id: id.to_string(),
            ..Default::default()
        };
        let parts: Vec<&str> = id.split(':').collect();
        if parts.len() == 4 {
            if let Ok(start) = parts[1].parse::<i32>() {
                let reference = parts[2].trim_matches('-');
                let alternate = parts[3].trim_matches('-');
                result.chromosome = parts[0].to_string();
                result.start = start;
                result.end = start + (reference.len().max(1) as i32) - 1;
                result.length = reference.len().max(alternate.len()) as i32;
                result.reference = reference.to_string();
                result.alternate = alternate.to_string();
            }
        }
        result
    }
}

/// A transcript knocked out by one or more variants.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnockoutTranscript {
    pub id: String,
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
    pub biotype: String,
    pub strand: String,
    pub variants: Vec<KnockoutVariant>,
}

impl KnockoutTranscript {
    pub fn with_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }
}

/// A gene knocked out in an individual.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnockoutGene {
    pub id: String,
    pub name: String,
    pub biotype: String,
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
    pub strand: String,
    pub transcripts: Vec<KnockoutTranscript>,
}

/// Individual-centric view of the knockouts; this is also the load format.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnockoutByIndividual {
    pub id: String,
    pub sample_id: String,
    pub sex: String,
    pub father_id: String,
    pub mother_id: String,
    pub father_sample_id: String,
    pub mother_sample_id: String,
    pub phenotypes: Vec<OntologyTerm>,
    pub disorders: Vec<OntologyTerm>,
    pub genes: Vec<KnockoutGene>,
}

impl KnockoutByIndividual {
    /// Number of parents with a sample.
    pub fn num_parents(&self) -> i32 {
        [&self.father_sample_id, &self.mother_sample_id]
            .iter()
            .filter(|id| !id.is_empty())
            .count() as i32
    }

    /// Blank the parent identifiers.
    pub fn clear_parents(&mut self) {
        self.father_id.clear();
        self.mother_id.clear();
        self.father_sample_id.clear();
        self.mother_sample_id.clear();
    }
}

/// An individual below a gene in the gene-centric view.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnockoutIndividual {
    pub id: String,
    pub sample_id: String,
    pub sex: String,
    pub father_id: String,
    pub mother_id: String,
    pub father_sample_id: String,
    pub mother_sample_id: String,
    pub phenotypes: Vec<OntologyTerm>,
    pub disorders: Vec<OntologyTerm>,
    pub transcripts: Vec<KnockoutTranscript>,
}

/// Gene-centric view of the knockouts.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnockoutByGene {
    pub id: String,
    pub name: String,
    pub biotype: String,
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
    pub strand: String,
    pub individuals: Vec<KnockoutIndividual>,
    /// Number of individuals seen for this gene.
    pub num_individuals: usize,
    /// Whether there are more individuals than returned.
    pub has_next_individual: bool,
}

/// Variant-centric view of the knockouts.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnockoutByVariant {
    pub id: String,
    pub db_snp: String,
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
    pub length: i32,
    pub reference: String,
    pub alternate: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub clinical_significance: Vec<String>,
    pub sequence_ontology_terms: Vec<SequenceOntologyTerm>,
    pub population_frequencies: Vec<PopulationFrequency>,
    pub individuals: Vec<KnockoutByIndividual>,
    pub num_individuals: usize,
    pub has_next_individual: bool,
}

impl KnockoutByVariant {
    /// Copy the variant attributes of `variant`.
    pub fn with_variant(variant: &KnockoutVariant) -> Self {
        Self {
            id: variant.id.clone(),
            db_snp: variant.db_snp.clone(),
            chromosome: variant.chromosome.clone(),
            start: variant.start,
            end: variant.end,
            length: variant.length,
            reference: variant.reference.clone(),
            alternate: variant.alternate.clone(),
            type_: variant.type_.clone(),
            clinical_significance: variant.clinical_significance.clone(),
            sequence_ontology_terms: variant.sequence_ontology_terms.clone(),
            population_frequencies: variant.population_frequencies.clone(),
            ..Default::default()
        }
    }
}
