//! Individual-, gene- and variant-centric queries.

use std::collections::HashSet;
use std::time::Instant;

use indexmap::IndexSet;

use super::{hide_parent, is_no_results, needs_variants, query_variant_ids, Details, RgaManager};
use crate::err::RgaError;
use crate::rga::codec::coded::CodedVariant;
use crate::rga::codec::count::KnockoutTypeCount;
use crate::rga::convert::{
    ConvertContext, ConverterKind, GeneConverter, IndividualConverter, RgaConverter,
    VariantConverter,
};
use crate::rga::engine::{EngineQuery, FacetRequest};
use crate::rga::model::record::fields;
use crate::rga::model::result::{Event, RgaResult, APPROXIMATE_COUNT_MESSAGE};
use crate::rga::model::{KnockoutByGene, KnockoutByIndividual, KnockoutByVariant};
use crate::rga::query::{QueryOptions, QueryParam, RgaQuery};

/// A page of variant ids.
#[derive(Debug, Clone, Default)]
pub(crate) struct VariantPage {
    pub ids: Vec<String>,
    /// Exact or approximate count, `-1` if not requested.
    pub num_matches: i64,
    pub events: Vec<Event>,
}

impl RgaManager {
    /// Individuals matching `query` with their knocked out genes.
    pub fn individual_query(
        &self,
        study: &str,
        query: &RgaQuery,
        options: &QueryOptions,
        user: &str,
    ) -> Result<RgaResult<KnockoutByIndividual>, anyhow::Error> {
        let before = Instant::now();
        let collection = self.collection(study)?;
        let preprocess =
            match self.preprocess_individuals(study, &collection, query, options, user) {
                Ok(preprocess) => preprocess,
                Err(e) if is_no_results(&e) => return Ok(RgaResult::empty().with_time(before)),
                Err(e) => return Err(e),
            };

        let filters = self.parser.parse(&preprocess.query)?;
        let fields = ConverterKind::Individual.fields(options);
        let details = if query.contains(QueryParam::Variants) && needs_variants(&fields) {
            Details::Ids(query_variant_ids(query))
        } else {
            Details::Skip
        };
        let (records, variants, mut events) = self.records_and_variants(
            study,
            &collection,
            &EngineQuery::new(filters, fields, None),
            details,
        )?;

        let post_filter = self.parser.comp_het_post_filter(query);
        let mut records = records.filter(|record| {
            post_filter
                .as_ref()
                .map(|filter| filter.matches(record))
                .unwrap_or(true)
        });
        let context = ConvertContext {
            codec: self.codec(),
            variants: &variants,
        };
        let mut individuals = IndividualConverter::new().convert(&mut records, &context);

        if !preprocess.owner_or_admin {
            let visible = self.visible_parents(
                study,
                user,
                individuals
                    .iter()
                    .flat_map(|i| [&i.father_sample_id, &i.mother_sample_id]),
            )?;
            for individual in individuals.iter_mut() {
                hide_parent(
                    &mut individual.father_id,
                    &mut individual.father_sample_id,
                    &visible,
                );
                hide_parent(
                    &mut individual.mother_id,
                    &mut individual.mother_sample_id,
                    &visible,
                );
            }
        }

        let num_matches = if options.count {
            preprocess.num_total_results
        } else {
            -1
        };
        events.extend(preprocess.event);
        tracing::info!(
            "individual query returned {} individuals in {:?}",
            individuals.len(),
            before.elapsed()
        );
        Ok(RgaResult::new(individuals, num_matches)
            .with_events(events)
            .with_time(before))
    }

    /// Genes matching `query` with a page of their individuals.
    pub fn gene_query(
        &self,
        study: &str,
        query: &RgaQuery,
        options: &QueryOptions,
        user: &str,
    ) -> Result<RgaResult<KnockoutByGene>, anyhow::Error> {
        let before = Instant::now();
        let collection = self.collection(study)?;

        let filters = self.parser.parse(query)?;
        let (gene_ids, num_matches) = self.gene_page(&collection, &filters, options)?;
        if gene_ids.is_empty() {
            return Ok(RgaResult::empty().with_time(before));
        }

        let mut gene_query = query.clone();
        gene_query.set_list(QueryParam::GeneId, &gene_ids);
        let filters = self.parser.parse(&gene_query)?;
        let visible = self.visible_samples(study, &collection, &filters, user)?;

        let fields = ConverterKind::Gene.fields(options);
        let details = if needs_variants(&fields) {
            Details::Matching
        } else {
            Details::Skip
        };
        let (mut records, variants, events) = self.records_and_variants(
            study,
            &collection,
            &EngineQuery::new(filters, fields, None),
            details,
        )?;

        let context = ConvertContext {
            codec: self.codec(),
            variants: &variants,
        };
        let mut genes = GeneConverter::new(
            options.individual_skip,
            self.individual_limit(options),
            options.include_individuals.iter().cloned().collect(),
        )
        .convert(&mut records, &context);

        if let Some(visible) = visible {
            for gene in genes.iter_mut() {
                gene.individuals
                    .retain(|individual| visible.contains(&individual.sample_id));
            }
        }

        tracing::info!(
            "gene query returned {} genes in {:?}",
            genes.len(),
            before.elapsed()
        );
        Ok(RgaResult::new(genes, num_matches)
            .with_events(events)
            .with_time(before))
    }

    /// Variants matching `query` with a page of their individuals.
    pub fn variant_query(
        &self,
        study: &str,
        query: &RgaQuery,
        options: &QueryOptions,
        user: &str,
    ) -> Result<RgaResult<KnockoutByVariant>, anyhow::Error> {
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

        let mut variant_query = query.clone();
        variant_query.set_list(QueryParam::Variants, &page.ids);
        let filters = self.parser.parse(&variant_query)?;
        let visible = self.visible_samples(study, &collection, &filters, user)?;

        let fields = ConverterKind::Variant.fields(options);
        let details = if needs_variants(&fields) {
            Details::Ids(page.ids.clone())
        } else {
            Details::Skip
        };
        let (mut records, variants, mut events) = self.records_and_variants(
            study,
            &collection,
            &EngineQuery::new(filters, fields, None),
            details,
        )?;

        let context = ConvertContext {
            codec: self.codec(),
            variants: &variants,
        };
        let mut knockouts = VariantConverter::new(
            page.ids.clone(),
            options.individual_skip,
            self.individual_limit(options),
            options.include_individuals.iter().cloned().collect(),
        )
        .convert(&mut records, &context);

        if let Some(visible) = visible {
            for knockout in knockouts.iter_mut() {
                knockout
                    .individuals
                    .retain(|individual| visible.contains(&individual.sample_id));
            }
        }

        events.extend(page.events);
        tracing::info!(
            "variant query returned {} variants in {:?}",
            knockouts.len(),
            before.elapsed()
        );
        Ok(RgaResult::new(knockouts, page.num_matches)
            .with_events(events)
            .with_time(before))
    }

    /// Page of gene ids and, if requested, the number of matching genes.
    pub(crate) fn gene_page(
        &self,
        collection: &str,
        filters: &[String],
        options: &QueryOptions,
    ) -> Result<(Vec<String>, i64), anyhow::Error> {
        let (num_matches, gene_ids) = self.pool.install(|| {
            rayon::join(
                || -> Result<i64, anyhow::Error> {
                    if !options.count {
                        return Ok(-1);
                    }
                    let request = FacetRequest::Unique(fields::GENE_ID.to_string());
                    Ok(self
                        .engine
                        .facet(collection, filters, &request)?
                        .aggregation
                        .map(|count| count as i64)
                        .unwrap_or(-1))
                },
                || {
                    let request = FacetRequest::Terms {
                        field: fields::GENE_ID.to_string(),
                        skip: options.skip,
                        limit: Some(self.limit(options)),
                    };
                    self.engine
                        .facet(collection, filters, &request)
                        .map(|result| result.values())
                },
            )
        });
        let num_matches = num_matches.unwrap_or_else(|e| {
            tracing::error!("could not obtain the count: {}", e);
            -1
        });
        Ok((gene_ids?, num_matches))
    }

    /// Page of variant ids, taken from the coded variant summaries of the
    /// matching records.
    ///
    /// Only summaries passing the query count.  When counting, up to
    /// `approximate_count_sample_size` distinct ids are collected; beyond
    /// that the count is extrapolated from the share of summaries seen.
    pub(crate) fn variant_page(
        &self,
        collection: &str,
        query: &RgaQuery,
        options: &QueryOptions,
    ) -> Result<VariantPage, anyhow::Error> {
        let filters = self.parser.parse(query)?;
        let buckets = self
            .engine
            .facet(
                collection,
                &filters,
                &FacetRequest::Terms {
                    field: fields::VARIANT_SUMMARY.to_string(),
                    skip: 0,
                    limit: None,
                },
            )?
            .values();
        if buckets.is_empty() {
            return Err(RgaError::NoResults.into());
        }

        let count = KnockoutTypeCount::new(
            query,
            self.codec(),
            self.config.max_paired_comp_het_set,
        )?;
        let limit = self.limit(options);
        let skip = options.skip;
        let sample_size = self.config.approximate_count_sample_size;

        let mut ids: IndexSet<String> = IndexSet::new();
        let mut skipped: HashSet<String> = HashSet::new();
        let mut num_matches = None;
        let mut events = Vec::new();
        for (i, bucket) in buckets.iter().enumerate() {
            let coded = match CodedVariant::parse(bucket) {
                Ok(coded) => coded,
                Err(e) => {
                    tracing::warn!("skipping invalid variant summary {}: {}", bucket, e);
                    continue;
                }
            };
            if !count.passes_filter(&coded) {
                continue;
            }
            if skip > skipped.len() {
                skipped.insert(coded.id);
            } else if limit > ids.len() {
                if !skipped.contains(&coded.id) {
                    ids.insert(coded.id);
                }
            } else if options.count {
                if ids.len() + skipped.len() < sample_size {
                    if !ids.contains(&coded.id) {
                        skipped.insert(coded.id);
                    }
                } else {
                    let seen = (ids.len() + skipped.len()) * buckets.len();
                    num_matches = Some((seen / i.max(1)) as i64);
                    events.push(Event::warning(APPROXIMATE_COUNT_MESSAGE));
                    break;
                }
            } else {
                break;
            }
        }
        let num_matches = match num_matches {
            Some(num_matches) => num_matches,
            None if options.count => (ids.len() + skipped.len()) as i64,
            None => -1,
        };

        Ok(VariantPage {
            ids: ids.into_iter().collect(),
            num_matches,
            events,
        })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::super::test::{catalog, manager, manager_with, strings, BRCA1, BRCA2, STUDY};
    use super::*;
    use crate::rga::catalog::MemoryCatalog;
    use crate::rga::codec::KnockoutType;
    use crate::rga::conf::RgaConfig;
    use crate::rga::convert::storage::test::variant;
    use crate::rga::engine::MemoryEngine;
    use crate::rga::model::result::EventType;
    use crate::rga::model::{KnockoutByIndividual, KnockoutGene, KnockoutTranscript};
    use crate::rga::variants::MemoryVariantSource;

    fn query(pairs: &[(QueryParam, &str)]) -> RgaQuery {
        pairs
            .iter()
            .map(|(param, value)| (*param, value.to_string()))
            .collect()
    }

    fn counted() -> QueryOptions {
        QueryOptions {
            count: true,
            ..Default::default()
        }
    }

    #[test]
    fn individual_query_all() -> Result<(), anyhow::Error> {
        let result =
            manager()?.individual_query(STUDY, &RgaQuery::default(), &counted(), "owner")?;
        assert_eq!(result.num_matches, 3);
        assert_eq!(
            result.results.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            vec!["I1", "I2", "I3"]
        );
        let i2 = &result.results[1];
        assert_eq!(
            i2.genes.iter().map(|g| g.name.as_str()).collect::<Vec<_>>(),
            vec!["BRCA1", "BRCA2"]
        );
        assert_eq!(i2.genes[1].transcripts[0].variants.len(), 2);
        assert_eq!(i2.father_sample_id, "F1-sample");
        Ok(())
    }

    #[test]
    fn individual_query_page() -> Result<(), anyhow::Error> {
        let options = QueryOptions {
            skip: 1,
            limit: Some(1),
            ..counted()
        };
        let result = manager()?.individual_query(STUDY, &RgaQuery::default(), &options, "owner")?;
        assert_eq!(result.num_matches, 3);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].id, "I2");
        Ok(())
    }

    #[test]
    fn individual_query_hides_parents() -> Result<(), anyhow::Error> {
        let result =
            manager()?.individual_query(STUDY, &RgaQuery::default(), &counted(), "guest")?;
        assert_eq!(result.num_matches, 2);
        assert_eq!(
            result.results.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            vec!["I1", "I2"]
        );
        assert_eq!(result.results[0].father_id, "");
        assert_eq!(result.results[0].father_sample_id, "");
        Ok(())
    }

    #[test]
    fn individual_query_compound_filter() -> Result<(), anyhow::Error> {
        // hom. alt. and het. alt. variants are both missense in T1
        let query = query(&[
            (QueryParam::Knockout, "HOM_ALT"),
            (QueryParam::ConsequenceType, "missense_variant"),
        ]);
        let result = manager()?.individual_query(STUDY, &query, &QueryOptions::default(), "owner")?;
        assert_eq!(result.results.len(), 1);
        let individual = &result.results[0];
        assert_eq!(individual.id, "I1");
        assert_eq!(individual.genes.len(), 1);
        assert_eq!(individual.genes[0].transcripts[0].id, "T1");
        assert_eq!(
            individual.genes[0].transcripts[0].variants[0].knockout_type,
            Some(KnockoutType::HomAlt)
        );
        Ok(())
    }

    /// Index holding a single individual with one missense `PASS` variant of
    /// `knockout_type` at gnomAD frequency 0.0003.
    fn single_variant_manager(knockout_type: KnockoutType) -> Result<RgaManager, anyhow::Error> {
        let individual = KnockoutByIndividual {
            id: "I1".into(),
            sample_id: "I1-sample".into(),
            genes: vec![KnockoutGene {
                id: BRCA1.0.into(),
                name: BRCA1.1.into(),
                chromosome: "17".into(),
                transcripts: vec![KnockoutTranscript {
                    variants: vec![variant("17:100:A:G", knockout_type, "PASS")],
                    ..KnockoutTranscript::with_id("T1")
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let manager = RgaManager::new(
            RgaConfig::default(),
            Arc::new(MemoryEngine::new()),
            Arc::new(MemoryCatalog::new(catalog())),
            Arc::new(MemoryVariantSource::new()),
        )?;
        manager.load(STUDY, &[individual])?;
        Ok(manager)
    }

    /// Whether `pairs` match the individual of `manager`.
    fn matches(manager: &RgaManager, pairs: &[(QueryParam, &str)]) -> Result<bool, anyhow::Error> {
        let result =
            manager.individual_query(STUDY, &query(pairs), &QueryOptions::default(), "owner")?;
        Ok(!result.results.is_empty())
    }

    const ALL_KNOCKOUT_TYPES: &str = "HOM_ALT,HET_ALT,COMP_HET,DELETION_OVERLAP";

    #[rstest::rstest]
    #[case(QueryParam::ConsequenceType, "missense_variant", true)]
    #[case(QueryParam::ConsequenceType, "stop_gained", false)]
    #[case(QueryParam::Filter, "PASS", true)]
    #[case(QueryParam::Filter, "NOT_PASS", false)]
    #[case(QueryParam::PopulationFrequency, "GNOMAD_GENOMES<0.01", true)]
    #[case(QueryParam::PopulationFrequency, "GNOMAD_GENOMES<0.0001", false)]
    #[case(QueryParam::PopulationFrequency, "GNOMAD_GENOMES>0.0001", true)]
    #[case(QueryParam::PopulationFrequency, "GNOMAD_GENOMES>0.01", false)]
    fn simple_and_compound_fields_agree(
        #[case] param: QueryParam,
        #[case] value: &str,
        #[case] expected: bool,
        #[values(KnockoutType::HomAlt, KnockoutType::HetAlt)] knockout_type: KnockoutType,
    ) -> Result<(), anyhow::Error> {
        let manager = single_variant_manager(knockout_type)?;

        let simple = matches(&manager, &[(param, value)])?;
        let compound = matches(
            &manager,
            &[(param, value), (QueryParam::Knockout, ALL_KNOCKOUT_TYPES)],
        )?;
        assert_eq!(simple, expected);
        assert_eq!(compound, simple);
        Ok(())
    }

    #[test]
    fn deletion_overlap_skips_excluded_consequence_types() -> Result<(), anyhow::Error> {
        let manager = single_variant_manager(KnockoutType::DeletionOverlap)?;
        let ct = (QueryParam::ConsequenceType, "missense_variant");

        assert!(matches(&manager, &[ct])?);
        assert!(!matches(&manager, &[ct, (QueryParam::Knockout, ALL_KNOCKOUT_TYPES)])?);
        Ok(())
    }

    #[test]
    fn individual_query_comp_het_pair() -> Result<(), anyhow::Error> {
        let query = query(&[
            (QueryParam::Variants, "13:300:G:A;13:400:T:C"),
            (QueryParam::Knockout, "COMP_HET"),
        ]);
        let result = manager()?.individual_query(STUDY, &query, &QueryOptions::default(), "owner")?;
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].id, "I2");
        assert_eq!(result.results[0].genes[0].id, BRCA2.0);
        Ok(())
    }

    #[test]
    fn individual_query_no_results() -> Result<(), anyhow::Error> {
        let query = query(&[(QueryParam::GeneName, "TP53")]);
        let result = manager()?.individual_query(STUDY, &query, &counted(), "owner")?;
        assert!(result.results.is_empty());
        assert_eq!(result.num_matches, 0);
        Ok(())
    }

    #[test]
    fn gene_query_all() -> Result<(), anyhow::Error> {
        let options = QueryOptions {
            individual_limit: Some(1),
            ..counted()
        };
        let result = manager()?.gene_query(STUDY, &RgaQuery::default(), &options, "owner")?;
        assert_eq!(result.num_matches, 2);
        assert_eq!(
            result.results.iter().map(|g| g.id.as_str()).collect::<Vec<_>>(),
            vec![BRCA1.0, BRCA2.0]
        );
        let brca1 = &result.results[0];
        assert_eq!(brca1.individuals.len(), 1);
        assert_eq!(brca1.individuals[0].id, "I1");
        assert_eq!(brca1.num_individuals, 2);
        assert!(brca1.has_next_individual);
        Ok(())
    }

    #[test]
    fn gene_query_drops_unauthorised_individuals() -> Result<(), anyhow::Error> {
        let query = query(&[(QueryParam::GeneName, "BRCA2")]);
        let result = manager()?.gene_query(STUDY, &query, &QueryOptions::default(), "guest")?;
        assert_eq!(result.num_matches, -1);
        assert_eq!(result.results.len(), 1);
        assert_eq!(
            result.results[0]
                .individuals
                .iter()
                .map(|i| i.id.as_str())
                .collect::<Vec<_>>(),
            vec!["I2"]
        );
        Ok(())
    }

    #[test]
    fn variant_page_counts() -> Result<(), anyhow::Error> {
        let manager = manager()?;
        let collection = manager.collection(STUDY)?;
        let options = QueryOptions {
            limit: Some(2),
            ..counted()
        };
        let page = manager.variant_page(&collection, &RgaQuery::default(), &options)?;
        assert_eq!(page.ids, strings(&["17:100:A:G", "17:200:C:T"]));
        assert_eq!(page.num_matches, 5);
        assert!(page.events.is_empty());

        let options = QueryOptions {
            skip: 1,
            limit: Some(2),
            ..Default::default()
        };
        let query = query(&[(QueryParam::Knockout, "COMP_HET")]);
        let page = manager.variant_page(&collection, &query, &options)?;
        assert_eq!(page.ids, strings(&["13:400:T:C", "13:500:A:C"]));
        assert_eq!(page.num_matches, -1);
        Ok(())
    }

    #[test]
    fn variant_page_approximate_count() -> Result<(), anyhow::Error> {
        let manager = manager_with(RgaConfig {
            approximate_count_sample_size: 2,
            ..Default::default()
        })?;
        let collection = manager.collection(STUDY)?;
        let options = QueryOptions {
            limit: Some(1),
            ..counted()
        };
        let page = manager.variant_page(&collection, &RgaQuery::default(), &options)?;
        assert_eq!(page.ids, strings(&["17:100:A:G"]));
        assert_eq!(page.num_matches, 5);
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].type_, EventType::Warning);
        assert_eq!(page.events[0].message, APPROXIMATE_COUNT_MESSAGE);
        Ok(())
    }

    #[test]
    fn variant_query_by_id() -> Result<(), anyhow::Error> {
        let query = query(&[(QueryParam::Variants, "13:300:G:A")]);
        let result = manager()?.variant_query(STUDY, &query, &counted(), "owner")?;
        assert_eq!(result.num_matches, 1);
        assert_eq!(result.results.len(), 1);
        let variant = &result.results[0];
        assert_eq!(variant.id, "13:300:G:A");
        assert_eq!(variant.db_snp, "rs10");
        assert_eq!(
            variant.individuals.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            vec!["I2", "I3"]
        );
        assert_eq!(variant.num_individuals, 2);
        let transcript = &variant.individuals[0].genes[0].transcripts[0];
        assert_eq!(
            transcript.variants.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
            vec!["13:300:G:A"]
        );
        Ok(())
    }

    #[test]
    fn variant_query_drops_unauthorised_individuals() -> Result<(), anyhow::Error> {
        let query = query(&[(QueryParam::Variants, "13:300:G:A")]);
        let result = manager()?.variant_query(STUDY, &query, &QueryOptions::default(), "guest")?;
        assert_eq!(
            result.results[0]
                .individuals
                .iter()
                .map(|i| i.id.as_str())
                .collect::<Vec<_>>(),
            vec!["I2"]
        );
        Ok(())
    }
}
