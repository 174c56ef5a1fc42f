//! Individual-centric folding of flat records.

use std::collections::HashMap;

use super::{knockout_variants, merge_transcript, ontology_terms, transcript};
use super::{projection, ConvertContext, RgaConverter};
use crate::rga::model::record::RgaRecord;
use crate::rga::model::{KnockoutByIndividual, KnockoutGene};

/// Folds records into individuals, genes and transcripts.
#[derive(Debug, Default)]
pub struct IndividualConverter {
    /// Individual ids in the order first seen.
    order: Vec<String>,
    /// In-progress individuals by id.
    individuals: HashMap<String, KnockoutByIndividual>,
}

impl IndividualConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record; with `only`, the transcript keeps that variant only.
    pub(crate) fn add_record(
        &mut self,
        record: &RgaRecord,
        context: &ConvertContext,
        only: Option<&str>,
    ) {
        if !self.individuals.contains_key(&record.individual_id) {
            self.order.push(record.individual_id.clone());
            self.individuals
                .insert(record.individual_id.clone(), individual(record));
        }
        let Some(individual) = self.individuals.get_mut(&record.individual_id) else {
            return;
        };

        let position = match individual
            .genes
            .iter()
            .position(|gene| gene.id == record.gene_id)
        {
            Some(position) => position,
            None => {
                individual.genes.push(gene(record));
                individual.genes.len() - 1
            }
        };

        if !record.transcript_id.is_empty() {
            let variants = knockout_variants(record, context, only);
            merge_transcript(
                &mut individual.genes[position].transcripts,
                transcript(record, variants),
            );
        }
    }

    /// Hand out the folded individuals in first-seen order and reset.
    pub(crate) fn finish(&mut self) -> Vec<KnockoutByIndividual> {
        let mut individuals = std::mem::take(&mut self.individuals);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|id| individuals.remove(&id))
            .collect()
    }
}

impl RgaConverter for IndividualConverter {
    type Output = KnockoutByIndividual;

    fn projection(&self) -> projection::ProjectionTable {
        projection::INDIVIDUAL
    }

    fn convert(
        &mut self,
        records: &mut dyn Iterator<Item = RgaRecord>,
        context: &ConvertContext,
    ) -> Vec<KnockoutByIndividual> {
        for record in records {
            self.add_record(&record, context, None);
        }
        self.finish()
    }
}

/// Individual with the scalar attributes of `record`.
pub(crate) fn individual(record: &RgaRecord) -> KnockoutByIndividual {
    KnockoutByIndividual {
        id: record.individual_id.clone(),
        sample_id: record.sample_id.clone(),
        sex: record.sex.clone(),
        father_id: record.father_id.clone(),
        mother_id: record.mother_id.clone(),
        father_sample_id: record.father_sample_id.clone(),
        mother_sample_id: record.mother_sample_id.clone(),
        phenotypes: ontology_terms(&record.phenotype_json, &record.id),
        disorders: ontology_terms(&record.disorder_json, &record.id),
        genes: Vec::new(),
    }
}

fn gene(record: &RgaRecord) -> KnockoutGene {
    KnockoutGene {
        id: record.gene_id.clone(),
        name: record.gene_name.clone(),
        biotype: record.gene_biotype.clone(),
        chromosome: record.chromosome.clone(),
        start: record.start,
        end: record.end,
        strand: record.strand.clone(),
        transcripts: Vec::new(),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rga::codec::Codec;
    use crate::rga::convert::test::record;
    use crate::rga::variants::VariantMap;

    fn convert(records: Vec<RgaRecord>) -> Vec<KnockoutByIndividual> {
        let codec = Codec::new();
        let variants = VariantMap::new();
        let context = ConvertContext {
            codec: &codec,
            variants: &variants,
        };
        IndividualConverter::new().convert(&mut records.into_iter(), &context)
    }

    #[test]
    fn first_seen_order() {
        let result = convert(vec![
            record("I2", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]),
            record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]),
            record("I2", "G2", "T2", &[("1:300:A:G", "HOM_ALT")]),
        ]);
        assert_eq!(
            result.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            vec!["I2", "I1"]
        );
        assert_eq!(result[0].genes.len(), 2);
        assert_eq!(result[0].phenotypes[0].id, "HP:0000118");
    }

    #[test]
    fn fold_is_idempotent() {
        let once = convert(vec![record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")])]);
        let twice = convert(vec![
            record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]),
            record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]),
        ]);
        assert_eq!(once, twice);
    }

    #[test]
    fn two_transcripts_under_one_individual() {
        let result = convert(vec![
            record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]),
            record("I1", "G1", "T2", &[("1:100:A:G", "HOM_ALT")]),
        ]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].genes.len(), 1);
        assert_eq!(
            result[0].genes[0]
                .transcripts
                .iter()
                .map(|t| t.id.as_str())
                .collect::<Vec<_>>(),
            vec!["T1", "T2"]
        );
    }

    #[test]
    fn records_without_transcript_only_add_the_gene() {
        let mut without = record("I1", "G1", "", &[]);
        without.transcript_id.clear();
        let result = convert(vec![without]);
        assert_eq!(result[0].genes[0].id, "G1");
        assert!(result[0].genes[0].transcripts.is_empty());
    }

    #[test]
    fn converter_is_reusable() {
        let codec = Codec::new();
        let variants = VariantMap::new();
        let context = ConvertContext {
            codec: &codec,
            variants: &variants,
        };
        let mut converter = IndividualConverter::new();
        let records = vec![record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")])];
        let first = converter.convert(&mut records.clone().into_iter(), &context);
        let second = converter.convert(&mut records.into_iter(), &context);
        assert_eq!(first, second);
    }
}
