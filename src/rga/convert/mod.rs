//! Conversion between flat records and the nested domain objects.
//!
//! The converters fold a record stream in a single pass.  Results are
//! returned in the order their grouping key was first seen.

use std::str::FromStr;

use crate::rga::codec::coded::CodedVariant;
use crate::rga::codec::{Codec, KnockoutType, SEPARATOR};
use crate::rga::model::record::RgaRecord;
use crate::rga::model::{
    KnockoutTranscript, KnockoutVariant, OntologyTerm, PopulationFrequency, SequenceOntologyTerm,
};
use crate::rga::query::QueryOptions;
use crate::rga::variants::VariantMap;

pub mod gene;
pub mod individual;
pub mod paging;
pub mod projection;
pub mod storage;
pub mod variant;

pub use gene::GeneConverter;
pub use individual::IndividualConverter;
pub use paging::ProcessedIndividuals;
pub use storage::StorageConverter;
pub use variant::VariantConverter;

/// Common interface of the record-to-domain converters.
pub trait RgaConverter {
    type Output;

    /// The output field paths and their required record fields.
    fn projection(&self) -> projection::ProjectionTable;

    /// Fold `records` into domain objects.
    fn convert(
        &mut self,
        records: &mut dyn Iterator<Item = RgaRecord>,
        context: &ConvertContext,
    ) -> Vec<Self::Output>;

    fn include_fields(&self, include: &[String]) -> Vec<String> {
        projection::include_fields(self.projection(), include)
    }

    fn include_from_exclude_fields(&self, exclude: &[String]) -> Vec<String> {
        projection::include_from_exclude_fields(self.projection(), exclude)
    }
}

/// The three record-to-domain converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConverterKind {
    Individual,
    Gene,
    Variant,
}

impl ConverterKind {
    pub fn projection(&self) -> projection::ProjectionTable {
        match self {
            ConverterKind::Individual => projection::INDIVIDUAL,
            ConverterKind::Gene => projection::GENE,
            ConverterKind::Variant => projection::VARIANT,
        }
    }

    /// Record fields to fetch for `options`; empty for all fields.
    pub fn fields(&self, options: &QueryOptions) -> Vec<String> {
        if !options.include.is_empty() {
            projection::include_fields(self.projection(), &options.include)
        } else if !options.exclude.is_empty() {
            projection::include_from_exclude_fields(self.projection(), &options.exclude)
        } else {
            Vec::new()
        }
    }
}

/// Side data shared by the converters of one query.
#[derive(Debug, Clone, Copy)]
pub struct ConvertContext<'a> {
    pub codec: &'a Codec,
    /// Variant details by id, fetched before the fold.
    pub variants: &'a VariantMap,
}

/// Ontology terms from their raw JSON, dropping unparseable ones.
pub(crate) fn ontology_terms(json: &[String], record_id: &str) -> Vec<OntologyTerm> {
    json.iter()
        .filter_map(|value| match serde_json::from_str::<OntologyTerm>(value) {
            Ok(term) => Some(term),
            Err(e) => {
                tracing::warn!("skipping invalid ontology term {} in {}: {}", value, record_id, e);
                None
            }
        })
        .collect()
}

/// The variants of `record`, optionally restricted to the id `only`.
///
/// Details are taken from the side-loaded variant map, then from the coded
/// variant summary of the record.  Variants found in neither are omitted.
pub(crate) fn knockout_variants(
    record: &RgaRecord,
    context: &ConvertContext,
    only: Option<&str>,
) -> Vec<KnockoutVariant> {
    let mut result = Vec::new();
    for (i, variant_id) in record.variants.iter().enumerate() {
        if only.map(|only| only != variant_id).unwrap_or(false) {
            continue;
        }
        let knockout_type = match record.knockout_types.get(i).filter(|kt| !kt.is_empty()) {
            Some(literal) => match KnockoutType::from_str(literal) {
                Ok(knockout_type) => Some(knockout_type),
                Err(_) => {
                    tracing::warn!(
                        "skipping variant {} of {} with unknown knockout type {}",
                        variant_id,
                        record.id,
                        literal
                    );
                    continue;
                }
            },
            None => None,
        };

        if let Some(detail) = context.variants.get(variant_id) {
            result.push(detail.knockout_variant(
                &record.sample_id,
                &record.transcript_id,
                knockout_type,
            ));
        } else if let Some(summary) = record.variant_summary.get(i) {
            match variant_from_summary(summary, context.codec) {
                Ok(mut variant) => {
                    if let Some(filter) = record.filters.get(i) {
                        variant.filter = filter.clone();
                    }
                    result.push(variant);
                }
                Err(e) => {
                    tracing::warn!("skipping variant {} of {}: {}", variant_id, record.id, e);
                }
            }
        } else {
            tracing::trace!("no details for variant {} of {}", variant_id, record.id);
        }
    }
    result
}

/// Reconstruct the basic variant attributes from a coded variant summary.
fn variant_from_summary(summary: &str, codec: &Codec) -> Result<KnockoutVariant, anyhow::Error> {
    let coded = CodedVariant::parse(summary)?;
    let knockout_type = KnockoutType::from_str(&coded.knockout_type)
        .map_err(|_| anyhow::anyhow!("unknown knockout type {}", &coded.knockout_type))?;

    let mut sequence_ontology_terms = Vec::new();
    for token in &coded.consequence_types {
        let accession = token.parse::<u32>()?;
        sequence_ontology_terms.push(SequenceOntologyTerm::new(
            crate::rga::codec::so_accession(accession),
            codec.consequence_type_name(accession)?.to_string(),
        ));
    }
    let mut population_frequencies = Vec::new();
    for token in coded.population_frequencies.iter().filter(|t| !t.is_empty()) {
        let literal = codec.decode(token)?;
        if let Some((study, freq)) = literal.split_once(SEPARATOR) {
            population_frequencies.push(PopulationFrequency::new(
                study.to_string(),
                "ALL".to_string(),
                freq.parse::<f32>()?,
            ));
        }
    }

    Ok(KnockoutVariant {
        db_snp: coded.db_snp,
        type_: coded.type_,
        knockout_type: Some(knockout_type),
        parental_origin: coded.parental_origin,
        clinical_significance: coded.clinical_significances,
        sequence_ontology_terms,
        population_frequencies,
        ..KnockoutVariant::with_id(&coded.id)
    })
}

/// Transcript of `record` with the given variants.
pub(crate) fn transcript(record: &RgaRecord, variants: Vec<KnockoutVariant>) -> KnockoutTranscript {
    KnockoutTranscript {
        id: record.transcript_id.clone(),
        chromosome: record.chromosome.clone(),
        start: record.start,
        end: record.end,
        biotype: record.transcript_biotype.clone(),
        strand: record.strand.clone(),
        variants,
    }
}

/// Add `transcript` to `transcripts`, merging with a transcript of the same id.
pub(crate) fn merge_transcript(transcripts: &mut Vec<KnockoutTranscript>, transcript: KnockoutTranscript) {
    match transcripts.iter_mut().find(|t| t.id == transcript.id) {
        Some(existing) => {
            for variant in transcript.variants {
                if !existing.variants.iter().any(|v| v.id == variant.id) {
                    existing.variants.push(variant);
                }
            }
        }
        None => transcripts.push(transcript),
    }
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rga::variants::VariantDetail;

    /// Flat record of `individual` in `gene` and `transcript` with variants
    /// given as `(id, knockout type)`.
    pub fn record(individual: &str, gene: &str, transcript: &str, variants: &[(&str, &str)]) -> RgaRecord {
        RgaRecord {
            id: format!("{}_{}_{}", individual, gene, transcript),
            individual_id: individual.into(),
            sample_id: individual.into(),
            gene_id: gene.into(),
            gene_name: format!("{}-name", gene),
            transcript_id: transcript.into(),
            variants: variants.iter().map(|(id, _)| id.to_string()).collect(),
            knockout_types: variants.iter().map(|(_, kt)| kt.to_string()).collect(),
            filters: variants.iter().map(|_| "PASS".to_string()).collect(),
            variant_summary: variants
                .iter()
                .map(|(id, kt)| {
                    format!("{}__{}__rs1__SNV__{}--__pathogenic__1583__P1-1--P2-3", transcript, id, kt)
                })
                .collect(),
            phenotype_json: vec![r#"{"id":"HP:0000118","name":"Phenotypic abnormality"}"#.into()],
            ..Default::default()
        }
    }

    #[test]
    fn variants_from_summary() {
        let codec = Codec::new();
        let variants = VariantMap::new();
        let context = ConvertContext { codec: &codec, variants: &variants };
        let record = record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]);

        let result = knockout_variants(&record, &context, None);
        assert_eq!(result.len(), 1);
        let variant = &result[0];
        assert_eq!(variant.id, "1:100:A:G");
        assert_eq!(variant.chromosome, "1");
        assert_eq!(variant.db_snp, "rs1");
        assert_eq!(variant.filter, "PASS");
        assert_eq!(variant.knockout_type, Some(KnockoutType::HomAlt));
        assert_eq!(variant.clinical_significance, vec!["pathogenic".to_string()]);
        assert_eq!(
            variant.sequence_ontology_terms,
            vec![SequenceOntologyTerm::new("SO:0001583".into(), "missense_variant".into())]
        );
        assert_eq!(
            variant.population_frequencies,
            vec![
                PopulationFrequency::new("1kG_phase3".into(), "ALL".into(), 0.0),
                PopulationFrequency::new("GNOMAD_GENOMES".into(), "ALL".into(), 0.0005),
            ]
        );
    }

    #[tracing_test::traced_test]
    #[test]
    fn variants_from_details_and_missing() {
        let codec = Codec::new();
        let mut variants = VariantMap::new();
        variants.insert(
            "1:100:A:G".into(),
            VariantDetail {
                variant: KnockoutVariant {
                    db_snp: "rs99".into(),
                    ..KnockoutVariant::with_id("1:100:A:G")
                },
                ..Default::default()
            },
        );
        let context = ConvertContext { codec: &codec, variants: &variants };
        let mut record = record("I1", "G1", "T1", &[("1:100:A:G", "COMP_HET"), ("1:200:C:T", "COMP_HET")]);
        record.variant_summary.clear();

        let result = knockout_variants(&record, &context, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].db_snp, "rs99");
        assert_eq!(result[0].knockout_type, Some(KnockoutType::CompHet));
        assert!(knockout_variants(&record, &context, Some("1:200:C:T")).is_empty());
    }

    #[tracing_test::traced_test]
    #[test]
    fn variants_with_bad_knockout_type_are_skipped() {
        let codec = Codec::new();
        let variants = VariantMap::new();
        let context = ConvertContext { codec: &codec, variants: &variants };
        let record = record("I1", "G1", "T1", &[("1:100:A:G", "HOMALT"), ("1:200:C:T", "HET_ALT")]);
        let result = knockout_variants(&record, &context, None);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "1:200:C:T");
        assert!(logs_contain("unknown knockout type HOMALT"));
    }

    #[tracing_test::traced_test]
    #[test]
    fn ontology_terms_skip_invalid() {
        let terms = ontology_terms(
            &[r#"{"id":"HP:1","name":"a"}"#.to_string(), "{".to_string()],
            "R1",
        );
        assert_eq!(terms, vec![OntologyTerm::new("HP:1".into(), "a".into())]);
        assert!(logs_contain("skipping invalid ontology term"));
    }

    #[test]
    fn merge_transcripts_by_id() {
        let mut transcripts = Vec::new();
        let variant = |id: &str| KnockoutVariant::with_id(id);
        merge_transcript(
            &mut transcripts,
            KnockoutTranscript { id: "T1".into(), variants: vec![variant("v1")], ..Default::default() },
        );
        merge_transcript(
            &mut transcripts,
            KnockoutTranscript { id: "T1".into(), variants: vec![variant("v1"), variant("v2")], ..Default::default() },
        );
        merge_transcript(&mut transcripts, KnockoutTranscript::with_id("T2"));
        assert_eq!(transcripts.len(), 2);
        assert_eq!(transcripts[0].variants.len(), 2);
    }

    #[test]
    fn converter_kind_fields() {
        let options = QueryOptions {
            include: vec!["genes.name".into()],
            ..Default::default()
        };
        assert_eq!(
            ConverterKind::Individual.fields(&options),
            vec!["geneId".to_string(), "geneName".to_string(), "individualId".to_string()]
        );
        assert!(ConverterKind::Gene.fields(&QueryOptions::default()).is_empty());
        assert_eq!("variant".parse::<ConverterKind>().ok(), Some(ConverterKind::Variant));
    }
}
