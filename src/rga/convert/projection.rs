//! Output field paths and the flat record fields needed to populate them.

use std::collections::BTreeSet;

use crate::rga::model::record::fields::*;

/// Maps dotted output field paths to the required flat record fields.
pub type ProjectionTable = &'static [(&'static str, &'static [&'static str])];

/// Flat fields needed for all output paths starting with any of `include`.
pub fn include_fields(table: ProjectionTable, include: &[String]) -> Vec<String> {
    let mut result = BTreeSet::new();
    for prefix in include {
        for (path, required) in table {
            if path.starts_with(prefix.as_str()) {
                result.extend(required.iter().map(|field| field.to_string()));
            }
        }
    }
    result.into_iter().collect()
}

/// Flat fields needed for all output paths not starting with any of `exclude`.
pub fn include_from_exclude_fields(table: ProjectionTable, exclude: &[String]) -> Vec<String> {
    let mut result = BTreeSet::new();
    for (path, required) in table {
        if !exclude.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            result.extend(required.iter().map(|field| field.to_string()));
        }
    }
    result.into_iter().collect()
}

pub const INDIVIDUAL: ProjectionTable = &[
    ("id", &[INDIVIDUAL_ID]),
    ("sampleId", &[INDIVIDUAL_ID, SAMPLE_ID]),
    ("sex", &[INDIVIDUAL_ID, SEX]),
    ("motherId", &[INDIVIDUAL_ID, MOTHER_ID]),
    ("fatherId", &[INDIVIDUAL_ID, FATHER_ID]),
    ("fatherSampleId", &[INDIVIDUAL_ID, FATHER_SAMPLE_ID]),
    ("motherSampleId", &[INDIVIDUAL_ID, MOTHER_SAMPLE_ID]),
    ("phenotypes", &[INDIVIDUAL_ID, PHENOTYPES, PHENOTYPE_JSON]),
    ("disorders", &[INDIVIDUAL_ID, DISORDERS, DISORDER_JSON]),
    ("numParents", &[INDIVIDUAL_ID, NUM_PARENTS]),
    ("genes.id", &[INDIVIDUAL_ID, GENE_ID]),
    ("genes.name", &[INDIVIDUAL_ID, GENE_ID, GENE_NAME]),
    ("genes.chromosome", &[INDIVIDUAL_ID, GENE_ID, CHROMOSOME]),
    ("genes.biotype", &[INDIVIDUAL_ID, GENE_ID, GENE_BIOTYPE]),
    ("genes.start", &[INDIVIDUAL_ID, GENE_ID, START]),
    ("genes.end", &[INDIVIDUAL_ID, GENE_ID, END]),
    ("genes.strand", &[INDIVIDUAL_ID, GENE_ID, STRAND]),
    ("genes.transcripts.id", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID]),
    ("genes.transcripts.chromosome", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, CHROMOSOME]),
    ("genes.transcripts.start", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, START]),
    ("genes.transcripts.end", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, END]),
    ("genes.transcripts.biotype", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, TRANSCRIPT_BIOTYPE]),
    ("genes.transcripts.strand", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, STRAND]),
    ("genes.transcripts.variants.id", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, VARIANTS, VARIANT_SUMMARY]),
    ("genes.transcripts.variants.dbSnp", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, DB_SNPS, VARIANTS, VARIANT_SUMMARY]),
    ("genes.transcripts.variants.filter", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, FILTERS, VARIANTS, VARIANT_SUMMARY]),
    ("genes.transcripts.variants.type", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, TYPES, VARIANTS, VARIANT_SUMMARY]),
    ("genes.transcripts.variants.knockoutType", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, KNOCKOUT_TYPES, VARIANTS, VARIANT_SUMMARY]),
    ("genes.transcripts.variants.populationFrequencies", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, POPULATION_FREQUENCIES, VARIANTS, VARIANT_SUMMARY]),
    ("genes.transcripts.variants.clinicalSignificance", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, CLINICAL_SIGNIFICANCES, VARIANTS, VARIANT_SUMMARY]),
    ("genes.transcripts.variants.sequenceOntologyTerms", &[INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, CONSEQUENCE_TYPES, VARIANTS, VARIANT_SUMMARY]),
];

pub const GENE: ProjectionTable = &[
    ("id", &[GENE_ID]),
    ("name", &[GENE_ID, GENE_NAME]),
    ("biotype", &[GENE_ID, GENE_BIOTYPE]),
    ("chromosome", &[GENE_ID, CHROMOSOME]),
    ("start", &[GENE_ID, START]),
    ("end", &[GENE_ID, END]),
    ("strand", &[GENE_ID, STRAND]),
    ("individuals.id", &[GENE_ID, INDIVIDUAL_ID]),
    ("individuals.sampleId", &[GENE_ID, INDIVIDUAL_ID, SAMPLE_ID]),
    ("individuals.sex", &[GENE_ID, INDIVIDUAL_ID, SEX]),
    ("individuals.motherId", &[GENE_ID, INDIVIDUAL_ID, MOTHER_ID]),
    ("individuals.fatherId", &[GENE_ID, INDIVIDUAL_ID, FATHER_ID]),
    ("individuals.fatherSampleId", &[GENE_ID, INDIVIDUAL_ID, FATHER_SAMPLE_ID]),
    ("individuals.motherSampleId", &[GENE_ID, INDIVIDUAL_ID, MOTHER_SAMPLE_ID]),
    ("individuals.phenotypes", &[GENE_ID, INDIVIDUAL_ID, PHENOTYPES, PHENOTYPE_JSON]),
    ("individuals.disorders", &[GENE_ID, INDIVIDUAL_ID, DISORDERS, DISORDER_JSON]),
    ("individuals.numParents", &[GENE_ID, INDIVIDUAL_ID, NUM_PARENTS]),
    ("individuals.transcripts.id", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID]),
    ("individuals.transcripts.chromosome", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, CHROMOSOME]),
    ("individuals.transcripts.start", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, START]),
    ("individuals.transcripts.end", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, END]),
    ("individuals.transcripts.biotype", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, TRANSCRIPT_BIOTYPE]),
    ("individuals.transcripts.strand", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, STRAND]),
    ("individuals.transcripts.variants.id", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, SAMPLE_ID, VARIANTS, VARIANT_SUMMARY]),
    ("individuals.transcripts.variants.dbSnp", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, SAMPLE_ID, DB_SNPS, VARIANTS, VARIANT_SUMMARY]),
    ("individuals.transcripts.variants.filter", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, SAMPLE_ID, FILTERS, VARIANTS, VARIANT_SUMMARY]),
    ("individuals.transcripts.variants.type", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, SAMPLE_ID, TYPES, VARIANTS, VARIANT_SUMMARY]),
    ("individuals.transcripts.variants.knockoutType", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, SAMPLE_ID, KNOCKOUT_TYPES, VARIANTS, VARIANT_SUMMARY]),
    ("individuals.transcripts.variants.populationFrequencies", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, SAMPLE_ID, POPULATION_FREQUENCIES, VARIANTS, VARIANT_SUMMARY]),
    ("individuals.transcripts.variants.clinicalSignificance", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, SAMPLE_ID, CLINICAL_SIGNIFICANCES, VARIANTS, VARIANT_SUMMARY]),
    ("individuals.transcripts.variants.sequenceOntologyTerms", &[GENE_ID, INDIVIDUAL_ID, TRANSCRIPT_ID, SAMPLE_ID, CONSEQUENCE_TYPES, VARIANTS, VARIANT_SUMMARY]),
];

pub const VARIANT: ProjectionTable = &[
    ("id", &[VARIANTS, VARIANT_SUMMARY]),
    ("dbSnp", &[VARIANTS, DB_SNPS, VARIANT_SUMMARY]),
    ("type", &[VARIANTS, TYPES, VARIANT_SUMMARY]),
    ("clinicalSignificance", &[VARIANTS, CLINICAL_SIGNIFICANCES, VARIANT_SUMMARY]),
    ("sequenceOntologyTerms", &[VARIANTS, CONSEQUENCE_TYPES, VARIANT_SUMMARY]),
    ("populationFrequencies", &[VARIANTS, POPULATION_FREQUENCIES, VARIANT_SUMMARY]),
    ("individuals.id", &[VARIANTS, INDIVIDUAL_ID]),
    ("individuals.sampleId", &[VARIANTS, INDIVIDUAL_ID, SAMPLE_ID]),
    ("individuals.sex", &[VARIANTS, INDIVIDUAL_ID, SEX]),
    ("individuals.motherId", &[VARIANTS, INDIVIDUAL_ID, MOTHER_ID]),
    ("individuals.fatherId", &[VARIANTS, INDIVIDUAL_ID, FATHER_ID]),
    ("individuals.fatherSampleId", &[VARIANTS, INDIVIDUAL_ID, FATHER_SAMPLE_ID]),
    ("individuals.motherSampleId", &[VARIANTS, INDIVIDUAL_ID, MOTHER_SAMPLE_ID]),
    ("individuals.phenotypes", &[VARIANTS, INDIVIDUAL_ID, PHENOTYPES, PHENOTYPE_JSON]),
    ("individuals.disorders", &[VARIANTS, INDIVIDUAL_ID, DISORDERS, DISORDER_JSON]),
    ("individuals.numParents", &[VARIANTS, INDIVIDUAL_ID, NUM_PARENTS]),
    ("individuals.genes.id", &[VARIANTS, INDIVIDUAL_ID, GENE_ID]),
    ("individuals.genes.name", &[VARIANTS, INDIVIDUAL_ID, GENE_ID, GENE_NAME]),
    ("individuals.genes.chromosome", &[VARIANTS, INDIVIDUAL_ID, GENE_ID, CHROMOSOME]),
    ("individuals.genes.biotype", &[VARIANTS, INDIVIDUAL_ID, GENE_ID, GENE_BIOTYPE]),
    ("individuals.genes.transcripts.id", &[VARIANTS, INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID]),
    ("individuals.genes.transcripts.biotype", &[VARIANTS, INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, TRANSCRIPT_BIOTYPE]),
    ("individuals.genes.transcripts.strand", &[VARIANTS, INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, STRAND]),
    ("individuals.genes.transcripts.variants.filter", &[VARIANTS, INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, FILTERS, VARIANT_SUMMARY]),
    ("individuals.genes.transcripts.variants.knockoutType", &[VARIANTS, INDIVIDUAL_ID, GENE_ID, TRANSCRIPT_ID, SAMPLE_ID, KNOCKOUT_TYPES, VARIANT_SUMMARY]),
];
