//! Variant-centric folding of flat records.
//!
//! Each record fans out to one group per qualifying variant.  Every group
//! folds its records like the individual-centric converter, restricted to
//! the group's variant, and prunes the genes and transcripts left empty.

use std::collections::{HashMap, HashSet};

use super::individual::IndividualConverter;
use super::{knockout_variants, projection, ConvertContext, ProcessedIndividuals, RgaConverter};
use crate::rga::model::record::RgaRecord;
use crate::rga::model::{KnockoutByVariant, KnockoutVariant};

/// In-progress state of one variant.
#[derive(Debug)]
struct VariantGroup {
    variant: KnockoutByVariant,
    paging: ProcessedIndividuals,
    individuals: IndividualConverter,
}

/// Folds records into variants with a page of individuals each.
#[derive(Debug, Default)]
pub struct VariantConverter {
    /// Variant ids to report; all variants of the records if empty.
    variant_ids: Vec<String>,
    individual_skip: usize,
    individual_limit: usize,
    include_individuals: HashSet<String>,
    order: Vec<String>,
    groups: HashMap<String, VariantGroup>,
}

impl VariantConverter {
    pub fn new(
        variant_ids: Vec<String>,
        individual_skip: usize,
        individual_limit: usize,
        include_individuals: HashSet<String>,
    ) -> Self {
        Self {
            variant_ids,
            individual_skip,
            individual_limit,
            include_individuals,
            ..Default::default()
        }
    }

    fn add_record(&mut self, record: &RgaRecord, context: &ConvertContext) {
        for variant_id in &record.variants {
            if !self.variant_ids.is_empty() && !self.variant_ids.contains(variant_id) {
                continue;
            }
            if !self.groups.contains_key(variant_id) {
                self.order.push(variant_id.clone());
                let variant = knockout_variants(record, context, Some(variant_id))
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| KnockoutVariant::with_id(variant_id));
                self.groups.insert(
                    variant_id.clone(),
                    VariantGroup {
                        variant: KnockoutByVariant::with_variant(&variant),
                        paging: ProcessedIndividuals::new(
                            self.individual_skip,
                            self.individual_limit,
                            self.include_individuals.clone(),
                        ),
                        individuals: IndividualConverter::new(),
                    },
                );
            }
            let Some(group) = self.groups.get_mut(variant_id) else {
                continue;
            };
            if group.paging.process(&record.individual_id) {
                group
                    .individuals
                    .add_record(record, context, Some(variant_id));
            }
        }
    }
}

impl RgaConverter for VariantConverter {
    type Output = KnockoutByVariant;

    fn projection(&self) -> projection::ProjectionTable {
        projection::VARIANT
    }

    fn convert(
        &mut self,
        records: &mut dyn Iterator<Item = RgaRecord>,
        context: &ConvertContext,
    ) -> Vec<KnockoutByVariant> {
        for record in records {
            self.add_record(&record, context);
        }

        let order = if self.variant_ids.is_empty() {
            std::mem::take(&mut self.order)
        } else {
            self.order.clear();
            self.variant_ids.clone()
        };
        let mut groups = std::mem::take(&mut self.groups);
        order
            .into_iter()
            .filter_map(|id| groups.remove(&id))
            .map(|mut group| {
                let mut individuals = group.individuals.finish();
                individuals.retain_mut(|individual| {
                    // Without projected transcripts there is nothing to prune by.
                    let had_transcripts = individual
                        .genes
                        .iter()
                        .any(|gene| !gene.transcripts.is_empty());
                    for gene in individual.genes.iter_mut() {
                        gene.transcripts.retain(|t| !t.variants.is_empty());
                    }
                    individual.genes.retain(|g| !g.transcripts.is_empty());
                    if had_transcripts && individual.genes.is_empty() {
                        tracing::trace!(
                            "dropping individual {} without variant {}",
                            &individual.id,
                            &group.variant.id
                        );
                        return false;
                    }
                    true
                });
                group.variant.individuals = individuals;
                group.variant.num_individuals = group.paging.total_processed();
                group.variant.has_next_individual = group.paging.has_next();
                group.variant
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rga::codec::Codec;
    use crate::rga::convert::test::record;
    use crate::rga::variants::VariantMap;

    fn convert(converter: &mut VariantConverter, records: Vec<RgaRecord>) -> Vec<KnockoutByVariant> {
        let codec = Codec::new();
        let variants = VariantMap::new();
        let context = ConvertContext {
            codec: &codec,
            variants: &variants,
        };
        converter.convert(&mut records.into_iter(), &context)
    }

    fn records() -> Vec<RgaRecord> {
        vec![
            record("I1", "G1", "T1", &[("1:100:A:G", "COMP_HET"), ("1:200:C:T", "COMP_HET")]),
            record("I2", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]),
            record("I1", "G2", "T2", &[("1:200:C:T", "HOM_ALT")]),
        ]
    }

    #[test]
    fn fan_out_in_first_seen_order() {
        let result = convert(&mut VariantConverter::new(vec![], 0, 10, HashSet::new()), records());
        assert_eq!(
            result.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
            vec!["1:100:A:G", "1:200:C:T"]
        );

        let first = &result[0];
        assert_eq!(first.db_snp, "rs1");
        assert_eq!(first.chromosome, "1");
        assert_eq!(first.num_individuals, 2);
        assert_eq!(first.individuals.len(), 2);
        let transcript = &first.individuals[0].genes[0].transcripts[0];
        assert_eq!(
            transcript.variants.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
            vec!["1:100:A:G"]
        );

        let second = &result[1];
        assert_eq!(second.num_individuals, 1);
        assert_eq!(second.individuals.len(), 1);
        assert_eq!(second.individuals[0].genes.len(), 2);
    }

    #[test]
    fn requested_variants_in_requested_order() {
        let result = convert(
            &mut VariantConverter::new(
                vec!["1:200:C:T".into(), "9:9:A:C".into(), "1:100:A:G".into()],
                0,
                10,
                HashSet::new(),
            ),
            records(),
        );
        assert_eq!(
            result.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
            vec!["1:200:C:T", "1:100:A:G"]
        );
    }

    #[test]
    fn individuals_are_paged_per_variant() {
        let result = convert(
            &mut VariantConverter::new(vec!["1:100:A:G".into()], 1, 1, HashSet::new()),
            records(),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].individuals.len(), 1);
        assert_eq!(result[0].individuals[0].id, "I2");
        assert_eq!(result[0].num_individuals, 2);
        assert!(!result[0].has_next_individual);
    }

    #[test]
    fn genes_without_the_variant_are_pruned() {
        let mut without_summary = record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]);
        without_summary.variant_summary.clear();
        let result = convert(
            &mut VariantConverter::new(vec![], 0, 10, HashSet::new()),
            vec![without_summary],
        );
        assert_eq!(result[0].id, "1:100:A:G");
        assert!(result[0].individuals.is_empty());
    }

    #[test]
    fn individuals_without_projected_transcripts_are_kept() {
        let mut individual_only = record("I1", "G1", "T1", &[("1:100:A:G", "HOM_ALT")]);
        individual_only.transcript_id.clear();
        let result = convert(
            &mut VariantConverter::new(vec![], 0, 10, HashSet::new()),
            vec![individual_only],
        );
        assert_eq!(result[0].individuals.len(), 1);
        assert_eq!(result[0].individuals[0].id, "I1");
    }
}
