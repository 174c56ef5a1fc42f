//! Per-individual, per-gene and per-variant knockout summaries.
//!
//! Summaries are computed from the coded summaries on the flat records
//! through facets, without folding the records themselves.

use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;

use super::{hide_parent, is_no_results, RgaManager};
use crate::err::RgaError;
use crate::rga::codec::coded::{CodedIndividual, CodedVariant};
use crate::rga::codec::count::KnockoutTypeCount;
use crate::rga::codec::{so_accession, KnockoutType};
use crate::rga::convert::individual::individual;
use crate::rga::convert::ConverterKind;
use crate::rga::engine::{EngineQuery, FacetRequest};
use crate::rga::model::record::fields;
use crate::rga::model::result::RgaResult;
use crate::rga::model::summary::{
    IndividualKnockoutStats, KnockoutByGeneSummary, KnockoutByIndividualSummary,
    KnockoutByVariantSummary, VariantKnockoutStats,
};
use crate::rga::model::{KnockoutVariant, SequenceOntologyTerm};
use crate::rga::query::{QueryOptions, QueryParam, RgaQuery};

impl RgaManager {
    /// Knockout statistics of each individual on the requested page.
    pub fn individual_summary(
        &self,
        study: &str,
        query: &RgaQuery,
        options: &QueryOptions,
        user: &str,
    ) -> Result<RgaResult<KnockoutByIndividualSummary>, anyhow::Error> {
        let before = Instant::now();
        let collection = self.collection(study)?;

        let mut attributes = IndexMap::new();
        if options.count {
            let filters = self.parser.parse(query)?;
            let request = FacetRequest::Unique(fields::INDIVIDUAL_ID.to_string());
            let total = self
                .engine
                .facet(&collection, &filters, &request)?
                .aggregation
                .unwrap_or_default();
            attributes.insert("totalIndividuals".to_string(), serde_json::json!(total));
        }

        let preprocess =
            match self.preprocess_individuals(study, &collection, query, options, user) {
                Ok(preprocess) => preprocess,
                Err(e) if is_no_results(&e) => return Ok(RgaResult::empty().with_time(before)),
                Err(e) => return Err(e),
            };
        let sample_ids = preprocess.query.values(QueryParam::SampleId);
        let mut base_query = preprocess.query.clone();
        base_query.remove(QueryParam::SampleId);

        let summaries = self.pool.install(|| {
            sample_ids
                .par_iter()
                .map(|sample_id| self.sample_summary(&collection, &base_query, sample_id))
                .collect::<Vec<_>>()
        });
        let mut results = Vec::with_capacity(summaries.len());
        for summary in summaries {
            match summary {
                Ok(summary) => results.push(summary),
                Err(e) if is_no_results(&e) => continue,
                Err(e) => return Err(e),
            }
        }

        if !preprocess.owner_or_admin {
            let visible = self.visible_parents(
                study,
                user,
                results
                    .iter()
                    .flat_map(|s| [&s.father_sample_id, &s.mother_sample_id]),
            )?;
            for summary in results.iter_mut() {
                hide_parent(&mut summary.father_id, &mut summary.father_sample_id, &visible);
                hide_parent(&mut summary.mother_id, &mut summary.mother_sample_id, &visible);
            }
        }

        let num_matches = if options.count {
            preprocess.num_total_results
        } else {
            -1
        };
        tracing::info!(
            "individual summary of {} samples in {:?}",
            results.len(),
            before.elapsed()
        );
        let mut result = RgaResult::new(results, num_matches)
            .with_events(preprocess.event.into_iter().collect())
            .with_time(before);
        result.attributes = attributes;
        Ok(result)
    }

    /// Variant and individual statistics of each gene on the requested page.
    pub fn gene_summary(
        &self,
        study: &str,
        query: &RgaQuery,
        options: &QueryOptions,
    ) -> Result<RgaResult<KnockoutByGeneSummary>, anyhow::Error> {
        let before = Instant::now();
        let collection = self.collection(study)?;

        let filters = self.parser.parse(query)?;
        let (gene_ids, num_matches) = self.gene_page(&collection, &filters, options)?;
        if gene_ids.is_empty() {
            return Ok(RgaResult::empty().with_time(before));
        }
        let mut base_query = query.clone();
        base_query.remove(QueryParam::GeneId);

        let summaries = self.pool.install(|| {
            gene_ids
                .par_iter()
                .map(|gene_id| self.single_gene_summary(&collection, &base_query, gene_id))
                .collect::<Result<Vec<_>, _>>()
        });
        let results = match summaries {
            Ok(results) => results,
            Err(e) if is_no_results(&e) => return Ok(RgaResult::empty().with_time(before)),
            Err(e) => return Err(e),
        };

        tracing::info!(
            "gene summary of {} genes in {:?}",
            results.len(),
            before.elapsed()
        );
        Ok(RgaResult::new(results, num_matches).with_time(before))
    }

    /// Statistics, allele pairs and CH pairs of each variant on the
    /// requested page.
    pub fn variant_summary(
        &self,
        study: &str,
        query: &RgaQuery,
        options: &QueryOptions,
    ) -> Result<RgaResult<KnockoutByVariantSummary>, anyhow::Error> {
        let before = Instant::now();
        let collection = self.collection(study)?;

        let page = match self.variant_page(&collection, query, options) {
            Ok(page) => page,
            Err(e) if is_no_results(&e) => return Ok(RgaResult::empty().with_time(before)),
            Err(e) => return Err(e),
        };
        if page.ids.is_empty() {
            return Ok(RgaResult::empty().with_time(before));
        }
        let mut base_query = query.clone();
        base_query.set_list(QueryParam::Variants, &page.ids);

        let (summaries, details) = self.pool.install(|| {
            rayon::join(
                || {
                    page.ids
                        .par_iter()
                        .map(|id| self.single_variant_summary(&collection, &base_query, id))
                        .collect::<Result<Vec<_>, _>>()
                },
                || self.fetch_variants(study, &page.ids),
            )
        });
        let mut results = summaries?;
        let (details, mut events) = details?;

        for summary in results.iter_mut() {
            if let Some(detail) = details.get(&summary.id) {
                let variant = &detail.variant;
                summary.db_snp = variant.db_snp.clone();
                summary.chromosome = variant.chromosome.clone();
                summary.start = variant.start;
                summary.end = variant.end;
                summary.length = variant.length;
                summary.reference = variant.reference.clone();
                summary.alternate = variant.alternate.clone();
                summary.type_ = variant.type_.clone();
                summary.population_frequencies = variant.population_frequencies.clone();
            }
        }

        events.extend(page.events);
        tracing::info!(
            "variant summary of {} variants in {:?}",
            results.len(),
            before.elapsed()
        );
        Ok(RgaResult::new(results, page.num_matches)
            .with_events(events)
            .with_time(before))
    }

    fn sample_summary(
        &self,
        collection: &str,
        query: &RgaQuery,
        sample_id: &str,
    ) -> Result<KnockoutByIndividualSummary, anyhow::Error> {
        let mut query = query.clone();
        query.set(QueryParam::SampleId, sample_id);
        let filters = self.parser.parse(&query)?;

        let fields = ConverterKind::Individual.fields(&QueryOptions {
            exclude: vec!["genes".to_string()],
            ..Default::default()
        });
        let record = self
            .engine
            .query(collection, &EngineQuery::new(filters.clone(), fields, Some(1)))?
            .next()
            .ok_or(RgaError::NoResults)?;
        let knockout = individual(&record);

        let count = self.variant_count(collection, &filters, &query)?;
        if count.num_ids() > 0 && count.num_ids() < self.config.max_summary_variant_ids {
            query.set_list(
                QueryParam::Variants,
                &count.ids().iter().cloned().collect::<Vec<_>>(),
            );
        }
        let genes = self.facet_values(collection, &self.parser.parse(&query)?, fields::GENE_NAME)?;

        Ok(KnockoutByIndividualSummary {
            id: knockout.id,
            sample_id: knockout.sample_id,
            sex: knockout.sex,
            father_id: knockout.father_id,
            mother_id: knockout.mother_id,
            father_sample_id: knockout.father_sample_id,
            mother_sample_id: knockout.mother_sample_id,
            phenotypes: knockout.phenotypes,
            disorders: knockout.disorders,
            genes,
            variant_stats: VariantKnockoutStats::from(&count),
        })
    }

    fn single_gene_summary(
        &self,
        collection: &str,
        query: &RgaQuery,
        gene_id: &str,
    ) -> Result<KnockoutByGeneSummary, anyhow::Error> {
        let mut gene_query = RgaQuery::default();
        gene_query.set(QueryParam::GeneId, gene_id);
        let fields = ConverterKind::Gene.fields(&QueryOptions {
            exclude: vec!["individuals".to_string()],
            ..Default::default()
        });
        let record = self
            .engine
            .query(
                collection,
                &EngineQuery::new(self.parser.parse(&gene_query)?, fields, Some(1)),
            )?
            .next()
            .ok_or(RgaError::NoResults)?;

        let mut query = query.clone();
        query.set(QueryParam::GeneId, gene_id);
        let filters = self.parser.parse(&query)?;
        let count = self.variant_count(collection, &filters, &query)?;

        Ok(KnockoutByGeneSummary {
            id: record.gene_id,
            name: record.gene_name,
            chromosome: record.chromosome,
            start: record.start,
            end: record.end,
            strand: record.strand,
            biotype: record.gene_biotype,
            variant_stats: VariantKnockoutStats::from(&count),
            individual_stats: self.individual_stats(collection, &filters, &query)?,
        })
    }

    fn single_variant_summary(
        &self,
        collection: &str,
        query: &RgaQuery,
        variant_id: &str,
    ) -> Result<KnockoutByVariantSummary, anyhow::Error> {
        let mut variant_query = query.clone();
        variant_query.set(QueryParam::Variants, variant_id);
        let filters = self.parser.parse(&variant_query)?;

        let clinical_significances =
            self.facet_values(collection, &filters, fields::CLINICAL_SIGNIFICANCES)?;
        let individual_stats = self.individual_stats(collection, &filters, &variant_query)?;

        // other ids must not hide the CH partners of the variant
        let mut pair_query = query.clone();
        pair_query.remove(QueryParam::Variants);
        pair_query.remove(QueryParam::DbSnps);
        let mut count = KnockoutTypeCount::new(
            &pair_query,
            self.codec(),
            self.config.max_paired_comp_het_set,
        )?;

        let mut consequence_types = Vec::new();
        let mut current: IndexMap<String, KnockoutVariant> = IndexMap::new();
        let mut others: IndexMap<String, KnockoutVariant> = IndexMap::new();
        let mut is_comp_het = false;
        for bucket in self.facet_values(collection, &filters, fields::VARIANT_SUMMARY)? {
            let coded = match CodedVariant::parse(&bucket) {
                Ok(coded) => coded,
                Err(e) => {
                    tracing::warn!("skipping invalid variant summary {}: {}", &bucket, e);
                    continue;
                }
            };
            count.process_feature(&coded);
            let knockout_type = coded.knockout_type.parse::<KnockoutType>().ok();
            let variant = KnockoutVariant {
                knockout_type,
                ..KnockoutVariant::with_id(&coded.id)
            };
            if coded.id == variant_id {
                for token in &coded.consequence_types {
                    if !consequence_types.contains(token) {
                        consequence_types.push(token.clone());
                    }
                }
                is_comp_het |= coded.is_comp_het();
                current.entry(coded.id.clone()).or_insert(variant);
            } else if coded.is_comp_het() {
                others.entry(coded.id.clone()).or_insert(variant);
            }
        }

        let mut sequence_ontology_terms = Vec::new();
        for token in &consequence_types {
            let accession = token.parse::<u32>()?;
            sequence_ontology_terms.push(SequenceOntologyTerm::new(
                so_accession(accession),
                self.codec().consequence_type_name(accession)?.to_string(),
            ));
        }

        let (allele_pairs, transcript_ch_pairs) = if is_comp_het {
            (
                current.into_values().chain(others.into_values()).collect(),
                count.transcript_comp_het_ids(),
            )
        } else {
            (current.into_values().collect(), Default::default())
        };

        let coordinates = KnockoutVariant::with_id(variant_id);
        Ok(KnockoutByVariantSummary {
            id: variant_id.to_string(),
            chromosome: coordinates.chromosome,
            start: coordinates.start,
            end: coordinates.end,
            length: coordinates.length,
            reference: coordinates.reference,
            alternate: coordinates.alternate,
            clinical_significances,
            sequence_ontology_terms,
            genes: self.facet_values(collection, &filters, fields::GENE_NAME)?,
            individual_stats,
            allele_pairs,
            transcript_ch_pairs,
            ..Default::default()
        })
    }

    /// Tally of the coded variant summaries matching `filters`.
    fn variant_count(
        &self,
        collection: &str,
        filters: &[String],
        query: &RgaQuery,
    ) -> Result<KnockoutTypeCount, anyhow::Error> {
        let mut count =
            KnockoutTypeCount::new(query, self.codec(), self.config.max_paired_comp_het_set)?;
        for bucket in self.facet_values(collection, filters, fields::VARIANT_SUMMARY)? {
            match CodedVariant::parse(&bucket) {
                Ok(coded) => count.process_feature(&coded),
                Err(e) => tracing::warn!("skipping invalid variant summary {}: {}", &bucket, e),
            }
        }
        Ok(count)
    }

    /// Individual counts matching `filters`, split by number of parents.
    fn individual_stats(
        &self,
        collection: &str,
        filters: &[String],
        query: &RgaQuery,
    ) -> Result<IndividualKnockoutStats, anyhow::Error> {
        let new_count =
            || KnockoutTypeCount::new(query, self.codec(), self.config.max_paired_comp_het_set);
        let mut counts = [new_count()?, new_count()?, new_count()?];
        for bucket in self.facet_values(collection, filters, fields::INDIVIDUAL_SUMMARY)? {
            let coded = match CodedIndividual::parse(&bucket) {
                Ok(coded) => coded,
                Err(e) => {
                    tracing::warn!("skipping invalid individual summary {}: {}", &bucket, e);
                    continue;
                }
            };
            match counts.get_mut(coded.num_parents as usize) {
                Some(count) => count.process_feature(&coded),
                None => tracing::warn!(
                    "skipping individual summary {} with {} parents",
                    &bucket,
                    coded.num_parents
                ),
            }
        }
        let [missing, single, both] = counts;
        Ok(IndividualKnockoutStats::new(
            (&missing).into(),
            (&single).into(),
            (&both).into(),
        ))
    }
}
