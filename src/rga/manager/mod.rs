//! Queries and summaries over the knockout index of a study.
//!
//! The manager glues together the query compiler, the search engine, the
//! catalog and the variant source.  Sub-fetches that do not depend on each
//! other run concurrently on a dedicated worker pool.

use std::collections::HashSet;
use std::sync::Arc;

use crate::err::RgaError;
use crate::rga::catalog::Catalog;
use crate::rga::codec::Codec;
use crate::rga::conf::RgaConfig;
use crate::rga::engine::{EngineQuery, FacetRequest, RecordIter, SearchEngine};
use crate::rga::model::record::fields;
use crate::rga::model::result::Event;
use crate::rga::query::{QueryOptions, QueryParam, RgaQuery, RgaQueryParser};
use crate::rga::variants::{VariantMap, VariantSource};

pub mod query;
pub mod summary;

/// Which variant details to fetch along with the records.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Details {
    Skip,
    /// The variants of all matching records.
    Matching,
    Ids(Vec<String>),
}

/// Page of sample ids resolved for an individual query or summary.
#[derive(Debug, Clone)]
struct Preprocess {
    /// The query restricted to the page of samples.
    query: RgaQuery,
    owner_or_admin: bool,
    /// Exact or approximate number of samples matching the query.
    num_total_results: i64,
    event: Option<Event>,
}

/// Entry point for querying and summarising the knockouts of a study.
pub struct RgaManager {
    pub(crate) config: RgaConfig,
    parser: RgaQueryParser,
    pub(crate) engine: Arc<dyn SearchEngine>,
    pub(crate) catalog: Arc<dyn Catalog>,
    variants: Arc<dyn VariantSource>,
    pub(crate) pool: rayon::ThreadPool,
}

impl RgaManager {
    pub fn new(
        config: RgaConfig,
        engine: Arc<dyn SearchEngine>,
        catalog: Arc<dyn Catalog>,
        variants: Arc<dyn VariantSource>,
    ) -> Result<Self, anyhow::Error> {
        let parser = RgaQueryParser::new(
            Arc::new(Codec::new()),
            config.comp_het_query_mode,
            &config.deletion_overlap_excluded_consequence_types,
        )?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()
            .map_err(|e| anyhow::anyhow!("building Rayon thread pool failed: {}", e))?;
        Ok(Self {
            config,
            parser,
            engine,
            catalog,
            variants,
            pool,
        })
    }

    pub fn config(&self) -> &RgaConfig {
        &self.config
    }

    pub(crate) fn codec(&self) -> &Codec {
        self.parser.codec()
    }

    /// Name of the collection of `study`, failing if it is not available.
    fn collection(&self, study: &str) -> Result<String, anyhow::Error> {
        let collection = self.config.collection_name(study);
        if !self.engine.is_alive(&collection) || !self.engine.exists(&collection)? {
            return Err(RgaError::MissingIndex(study.to_string()).into());
        }
        Ok(collection)
    }

    fn limit(&self, options: &QueryOptions) -> usize {
        options.limit.unwrap_or(self.config.default_limit)
    }

    fn individual_limit(&self, options: &QueryOptions) -> usize {
        options
            .individual_limit
            .unwrap_or(self.config.default_individual_limit)
    }

    /// Distinct values of `field` over the records matching `filters`.
    fn facet_values(
        &self,
        collection: &str,
        filters: &[String],
        field: &str,
    ) -> Result<Vec<String>, anyhow::Error> {
        let request = FacetRequest::Terms {
            field: field.to_string(),
            skip: 0,
            limit: None,
        };
        Ok(self.engine.facet(collection, filters, &request)?.values())
    }

    /// The subset of `sample_ids` that `user` may see, authorised in batches.
    fn authorised_samples(
        &self,
        study: &str,
        sample_ids: &[String],
        user: &str,
    ) -> Result<Vec<String>, anyhow::Error> {
        let mut result = Vec::new();
        for batch in sample_ids.chunks(self.config.authorisation_batch_size.max(1)) {
            result.extend(self.catalog.authorised_samples(study, batch, user)?);
        }
        Ok(result)
    }

    /// Samples `user` may see among those matching `filters`; `None` if
    /// there is no restriction.
    fn visible_samples(
        &self,
        study: &str,
        collection: &str,
        filters: &[String],
        user: &str,
    ) -> Result<Option<HashSet<String>>, anyhow::Error> {
        if self.catalog.is_owner_or_admin(study, user)? {
            return Ok(None);
        }
        let sample_ids = self.facet_values(collection, filters, fields::SAMPLE_ID)?;
        Ok(Some(
            self.authorised_samples(study, &sample_ids, user)?
                .into_iter()
                .collect(),
        ))
    }

    /// The parent samples among `parents` that `user` may see.
    fn visible_parents<'a, I>(
        &self,
        study: &str,
        user: &str,
        parents: I,
    ) -> Result<HashSet<String>, anyhow::Error>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let parents = parents
            .into_iter()
            .filter(|id| !id.is_empty())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        Ok(self
            .authorised_samples(study, &parents, user)?
            .into_iter()
            .collect())
    }

    /// Fetch details of at most `default_individual_limit` variants.
    ///
    /// Beyond that, no details are fetched and the converters fall back to
    /// the coded variant summaries.
    fn fetch_variants(
        &self,
        study: &str,
        ids: &[String],
    ) -> Result<(VariantMap, Vec<Event>), anyhow::Error> {
        let max_variants = self.config.default_individual_limit;
        if ids.len() > max_variants {
            let error = RgaError::TooManyVariants(ids.len(), max_variants);
            tracing::warn!("{}, using variant summaries only", &error);
            return Ok((VariantMap::new(), vec![Event::warning(&error.to_string())]));
        }

        let mut result = VariantMap::new();
        for batch in ids.chunks(self.config.variant_batch_size.max(1)) {
            for detail in self.variants.fetch(study, batch)? {
                result.insert(detail.variant.id.clone(), detail);
            }
        }
        tracing::debug!("fetched {} of {} variant details", result.len(), ids.len());
        Ok((result, Vec::new()))
    }

    /// Run the record query and the variant detail fetch concurrently.
    fn records_and_variants(
        &self,
        study: &str,
        collection: &str,
        query: &EngineQuery,
        details: Details,
    ) -> Result<(RecordIter, VariantMap, Vec<Event>), anyhow::Error> {
        let (records, variants) = self.pool.install(|| {
            rayon::join(
                || self.engine.query(collection, query),
                || match details {
                    Details::Skip => Ok((VariantMap::new(), Vec::new())),
                    Details::Matching => {
                        let ids = self.facet_values(collection, &query.filters, fields::VARIANTS)?;
                        self.fetch_variants(study, &ids)
                    }
                    Details::Ids(ids) => self.fetch_variants(study, &ids),
                },
            )
        });
        let (variants, events) = variants?;
        Ok((records?, variants, events))
    }

    /// Resolve the page of samples of an individual query.
    ///
    /// An empty query pages through the indexed samples of the catalog.
    /// Otherwise the samples matching the query are authorised batch-wise
    /// until the page is complete.
    fn preprocess_individuals(
        &self,
        study: &str,
        collection: &str,
        query: &RgaQuery,
        options: &QueryOptions,
        user: &str,
    ) -> Result<Preprocess, anyhow::Error> {
        let owner_or_admin = self.catalog.is_owner_or_admin(study, user)?;
        let limit = self.limit(options);
        let skip = options.skip;
        let mut query = query.clone();
        let mut event = None;

        let sample_ids;
        let num_total_results;
        if query.is_empty() {
            let before = std::time::Instant::now();
            let mut indexed = self.catalog.indexed_samples(study)?;
            if !owner_or_admin {
                indexed = self.authorised_samples(study, &indexed, user)?;
            }
            tracing::info!(
                "fetched first {} individuals from catalog with skip {}: {:?}",
                limit,
                skip,
                before.elapsed()
            );
            num_total_results = indexed.len() as i64;
            sample_ids = indexed.into_iter().skip(skip).take(limit).collect::<Vec<_>>();
        } else {
            if !query.contains(QueryParam::SampleId) {
                let filters = self.parser.parse(&query)?;
                let samples = self.facet_values(collection, &filters, fields::SAMPLE_ID)?;
                if samples.is_empty() {
                    return Err(RgaError::NoResults.into());
                }
                query.set_list(QueryParam::SampleId, &samples);
            }
            let values = query.values(QueryParam::SampleId);

            let authorised = if owner_or_admin {
                num_total_results = values.len() as i64;
                values
            } else {
                let max_skip = self.config.max_skip;
                if skip > max_skip {
                    return Err(RgaError::PaginationLimit(max_skip).into());
                }
                if options.count && values.len() > max_skip {
                    event = Some(Event::warning(&format!(
                        "numMatches value is approximated considering the individuals that are \
                        accessible for the user from the first batch of {} individuals matching \
                        the query.",
                        max_skip
                    )));
                }

                let batch_size = self.config.authorisation_batch_size.max(1);
                let mut authorised = Vec::new();
                let mut current = 0;
                loop {
                    let end = values.len().min(current + batch_size);
                    authorised.extend(self.catalog.authorised_samples(
                        study,
                        &values[current..end],
                        user,
                    )?);
                    if end == values.len() {
                        break;
                    } else if options.count && current < max_skip {
                        current += batch_size;
                    } else if authorised.len() > skip + limit {
                        break;
                    } else {
                        current += batch_size;
                    }
                }
                let processed = values.len().min(current + batch_size);
                num_total_results = if processed == values.len() {
                    authorised.len() as i64
                } else {
                    ((authorised.len() * values.len()) as f64 / processed as f64).round() as i64
                };
                authorised
            };

            if skip > authorised.len() {
                return Err(RgaError::NoResults.into());
            }
            sample_ids = authorised.into_iter().skip(skip).take(limit).collect();
        }

        if sample_ids.is_empty() {
            return Err(RgaError::NoResults.into());
        }
        query.set_list(QueryParam::SampleId, &sample_ids);

        Ok(Preprocess {
            query,
            owner_or_admin,
            num_total_results,
            event,
        })
    }
}

/// Whether `err` signals that nothing matched.
fn is_no_results(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<RgaError>(), Some(RgaError::NoResults))
}

/// Blank a parent that is not among the `visible` samples.
fn hide_parent(id: &mut String, sample_id: &mut String, visible: &HashSet<String>) {
    if !sample_id.is_empty() && !visible.contains(sample_id.as_str()) {
        id.clear();
        sample_id.clear();
    }
}

/// Whether the record fields to fetch include variant information.
fn needs_variants(fields: &[String]) -> bool {
    fields.is_empty() || fields.iter().any(|field| field.contains("variant"))
}

/// Variant ids of `query`, whatever list separator was used.
fn query_variant_ids(query: &RgaQuery) -> Vec<String> {
    query
        .values(QueryParam::Variants)
        .iter()
        .flat_map(|value| value.split(';'))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}
