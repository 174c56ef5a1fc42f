//! Aggregated summaries per individual, gene and variant.

use std::collections::BTreeMap;

use crate::rga::codec::count::KnockoutTypeCount;

use super::{KnockoutVariant, OntologyTerm, PopulationFrequency, SequenceOntologyTerm};

/// Variant counts by knockout type.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantKnockoutStats {
    pub count: usize,
    pub num_hom_alt: usize,
    pub num_comp_het: usize,
    /// Number of compound heterozygous pairs, `-1000` if not computed.
    pub num_pair_comp_het: i64,
    pub num_het_alt: usize,
    pub num_del_overlap: usize,
}

impl From<&KnockoutTypeCount> for VariantKnockoutStats {
    fn from(count: &KnockoutTypeCount) -> Self {
        Self {
            count: count.num_ids(),
            num_hom_alt: count.num_hom_ids(),
            num_comp_het: count.num_comp_het_ids(),
            num_pair_comp_het: count.num_paired_comp_het_ids(),
            num_het_alt: count.num_het_ids(),
            num_del_overlap: count.num_del_overlap_ids(),
        }
    }
}

/// Individual counts by knockout type.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnockoutStats {
    pub count: usize,
    pub num_hom_alt: usize,
    pub num_comp_het: usize,
    pub num_het_alt: usize,
    pub num_del_overlap: usize,
}

impl From<&KnockoutTypeCount> for KnockoutStats {
    fn from(count: &KnockoutTypeCount) -> Self {
        Self {
            count: count.num_ids(),
            num_hom_alt: count.num_hom_ids(),
            num_comp_het: count.num_comp_het_ids(),
            num_het_alt: count.num_het_ids(),
            num_del_overlap: count.num_del_overlap_ids(),
        }
    }
}

/// Individual counts split by the number of parents with a sample.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_new::new)]
#[serde(rename_all = "camelCase")]
pub struct IndividualKnockoutStats {
    pub missing_parents: KnockoutStats,
    pub single_parent: KnockoutStats,
    pub both_parents: KnockoutStats,
}

/// Summary of the knockouts of one individual.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnockoutByIndividualSummary {
    pub id: String,
    pub sample_id: String,
    pub sex: String,
    pub father_id: String,
    pub mother_id: String,
    pub father_sample_id: String,
    pub mother_sample_id: String,
    pub phenotypes: Vec<OntologyTerm>,
    pub disorders: Vec<OntologyTerm>,
    /// Names of the knocked out genes.
    pub genes: Vec<String>,
    pub variant_stats: VariantKnockoutStats,
}

/// Summary of the knockouts of one gene.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnockoutByGeneSummary {
    pub id: String,
    pub name: String,
    pub chromosome: String,
    pub start: i32,
    pub end: i32,
    pub strand: String,
    pub biotype: String,
    pub variant_stats: VariantKnockoutStats,
    pub individual_stats: IndividualKnockoutStats,
}

/// Summary of the knockouts caused by one variant.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnockoutByVariantSummary {
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
    pub clinical_significances: Vec<String>,
    pub sequence_ontology_terms: Vec<SequenceOntologyTerm>,
    pub population_frequencies: Vec<PopulationFrequency>,
    /// Names of the knocked out genes.
    pub genes: Vec<String>,
    pub individual_stats: IndividualKnockoutStats,
    /// The variant itself and, if compound heterozygous, its partners.
    pub allele_pairs: Vec<KnockoutVariant>,
    /// Compound heterozygous variant ids by transcript.
    pub transcript_ch_pairs: BTreeMap<String, Vec<String>>,
}
