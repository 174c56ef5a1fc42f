//! Gene-centric folding of flat records.

use std::collections::{HashMap, HashSet};

use super::{knockout_variants, merge_transcript, ontology_terms, transcript};
use super::{projection, ConvertContext, ProcessedIndividuals, RgaConverter};
use crate::rga::model::record::RgaRecord;
use crate::rga::model::{KnockoutByGene, KnockoutIndividual};

/// Folds records into genes with a page of individuals each.
#[derive(Debug, Default)]
pub struct GeneConverter {
    individual_skip: usize,
    individual_limit: usize,
    include_individuals: HashSet<String>,
    order: Vec<String>,
    genes: HashMap<String, (KnockoutByGene, ProcessedIndividuals)>,
}

impl GeneConverter {
    pub fn new(
        individual_skip: usize,
        individual_limit: usize,
        include_individuals: HashSet<String>,
    ) -> Self {
        Self {
            individual_skip,
            individual_limit,
            include_individuals,
            ..Default::default()
        }
    }

    fn add_record(&mut self, record: &RgaRecord, context: &ConvertContext) {
        if !self.genes.contains_key(&record.gene_id) {
            self.order.push(record.gene_id.clone());
            let paging = ProcessedIndividuals::new(
                self.individual_skip,
                self.individual_limit,
                self.include_individuals.clone(),
            );
            self.genes
                .insert(record.gene_id.clone(), (gene(record), paging));
        }
        let Some((gene, paging)) = self.genes.get_mut(&record.gene_id) else {
            return;
        };
        if !paging.process(&record.individual_id) {
            tracing::trace!(
                "individual {} of gene {} not in page",
                &record.individual_id,
                &record.gene_id
            );
            return;
        }

        let position = match gene
            .individuals
            .iter()
            .position(|individual| individual.id == record.individual_id)
        {
            Some(position) => position,
            None => {
                gene.individuals.push(individual(record));
                gene.individuals.len() - 1
            }
        };
        if !record.transcript_id.is_empty() {
            let variants = knockout_variants(record, context, None);
            merge_transcript(
                &mut gene.individuals[position].transcripts,
                transcript(record, variants),
            );
        }
    }
}

impl RgaConverter for GeneConverter {
    type Output = KnockoutByGene;

    fn projection(&self) -> projection::ProjectionTable {
        projection::GENE
    }

    fn convert(
        &mut self,
        records: &mut dyn Iterator<Item = RgaRecord>,
        context: &ConvertContext,
    ) -> Vec<KnockoutByGene> {
        for record in records {
            self.add_record(&record, context);
        }

        let mut genes = std::mem::take(&mut self.genes);
        std::mem::take(&mut self.order)
            .into_iter()
            .filter_map(|id| genes.remove(&id))
            .map(|(mut gene, paging)| {
                gene.num_individuals = paging.total_processed();
                gene.has_next_individual = paging.has_next();
                gene
            })
            .collect()
    }
}

fn gene(record: &RgaRecord) -> KnockoutByGene {
    KnockoutByGene {
        id: record.gene_id.clone(),
        name: record.gene_name.clone(),
        biotype: record.gene_biotype.clone(),
        chromosome: record.chromosome.clone(),
        start: record.start,
        end: record.end,
        strand: record.strand.clone(),
        ..Default::default()
    }
}

fn individual(record: &RgaRecord) -> KnockoutIndividual {
    KnockoutIndividual {
        id: record.individual_id.clone(),
        sample_id: record.sample_id.clone(),
        sex: record.sex.clone(),
        father_id: record.father_id.clone(),
        mother_id: record.mother_id.clone(),
        father_sample_id: record.father_sample_id.clone(),
        mother_sample_id: record.mother_sample_id.clone(),
        phenotypes: ontology_terms(&record.phenotype_json, &record.id),
        disorders: ontology_terms(&record.disorder_json, &record.id),
        transcripts: Vec::new(),
    }
}
