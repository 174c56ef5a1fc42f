//! Compilation of structured queries into native engine filters.

use std::collections::HashSet;
use std::sync::Arc;

use crate::rga::codec::{so_accession, Codec, KnockoutType, NOT_PASS, PASS};
use crate::rga::model::record::{fields, RgaRecord};

use super::compound::{group, CompoundFilterBuilder};
use super::{CompHetQueryMode, Error, QueryParam, RgaQuery};

/// Query parameters that map directly onto one record field.
const SIMPLE_FIELDS: &[(QueryParam, &str)] = &[
    (QueryParam::SampleId, fields::SAMPLE_ID),
    (QueryParam::IndividualId, fields::INDIVIDUAL_ID),
    (QueryParam::Sex, fields::SEX),
    (QueryParam::Phenotypes, fields::PHENOTYPES),
    (QueryParam::Disorders, fields::DISORDERS),
    (QueryParam::Chromosome, fields::CHROMOSOME),
    (QueryParam::Start, fields::START),
    (QueryParam::End, fields::END),
    (QueryParam::NumParents, fields::NUM_PARENTS),
    (QueryParam::GeneId, fields::GENE_ID),
    (QueryParam::GeneName, fields::GENE_NAME),
    (QueryParam::GeneBiotype, fields::GENE_BIOTYPE),
    (QueryParam::TranscriptId, fields::TRANSCRIPT_ID),
    (QueryParam::TranscriptBiotype, fields::TRANSCRIPT_BIOTYPE),
    (QueryParam::Type, fields::TYPES),
    (QueryParam::ClinicalSignificance, fields::CLINICAL_SIGNIFICANCES),
    (QueryParam::Variants, fields::VARIANTS),
    (QueryParam::DbSnps, fields::DB_SNPS),
];

/// Translates [`RgaQuery`] values into native filter strings.
#[derive(Debug, Clone)]
pub struct RgaQueryParser {
    codec: Arc<Codec>,
    mode: CompHetQueryMode,
    /// Consequence type tokens excluded for deletion overlaps.
    deletion_overlap_excluded: HashSet<String>,
}

impl RgaQueryParser {
    /// Construct with the consequence types (in any accepted form) that are
    /// never matched for deletion overlaps.
    pub fn new(
        codec: Arc<Codec>,
        mode: CompHetQueryMode,
        deletion_overlap_excluded: &[String],
    ) -> Result<Self, Error> {
        let deletion_overlap_excluded = deletion_overlap_excluded
            .iter()
            .map(|ct| codec.consequence_type_token(ct))
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self {
            codec,
            mode,
            deletion_overlap_excluded,
        })
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Compile `query` into a list of filters that must all hold.
    pub fn parse(&self, query: &RgaQuery) -> Result<Vec<String>, Error> {
        let query = self.fix_query(query)?;

        let mut filters = Vec::new();
        for (param, field) in SIMPLE_FIELDS {
            parse_string_value(&query, *param, field, &mut filters);
        }
        self.parse_compound_filters(&query, &mut filters)?;

        tracing::debug!("query     : {:?}", &query);
        tracing::debug!("filters   : {:?}", &filters);
        Ok(filters)
    }

    /// Normalize consequence types to `SO:` accessions and knockout types to
    /// upper case.
    fn fix_query(&self, query: &RgaQuery) -> Result<RgaQuery, Error> {
        let mut query = query.clone();
        if query.contains(QueryParam::ConsequenceType) {
            let or_list = query.values_split(QueryParam::ConsequenceType, ',');
            let and_list = query.values_split(QueryParam::ConsequenceType, ';');
            let (values, separator) = if or_list.len() >= and_list.len() {
                (or_list, ",")
            } else {
                (and_list, ";")
            };
            let accessions = values
                .iter()
                .map(|ct| {
                    self.codec
                        .consequence_type_accession(ct)
                        .map(so_accession)
                })
                .collect::<Result<Vec<_>, _>>()?;
            query.set(QueryParam::ConsequenceType, &accessions.join(separator));
        }
        if let Some(knockout) = query.get(QueryParam::Knockout) {
            let knockout = knockout.to_uppercase();
            query.set(QueryParam::Knockout, &knockout);
        }
        Ok(query)
    }

    fn parse_compound_filters(
        &self,
        query: &RgaQuery,
        filters: &mut Vec<String>,
    ) -> Result<(), Error> {
        let knockout_values = query.values(QueryParam::Knockout);
        let filter_values = query.values(QueryParam::Filter);
        // compound tokens hold one consequence type each, AND-lists are OR-ed
        let ct_values = query
            .values_split(QueryParam::ConsequenceType, ',')
            .iter()
            .flat_map(|value| value.split(';'))
            .map(|value| value.to_string())
            .collect::<Vec<_>>();
        let pop_freq_values = query.values(QueryParam::PopulationFrequency);

        let count = [
            !knockout_values.is_empty(),
            !filter_values.is_empty(),
            !ct_values.is_empty(),
            !pop_freq_values.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count();
        let comp_het = KnockoutType::CompHet.to_string();
        let deletion_overlap = KnockoutType::DeletionOverlap.to_string();
        let simple_filter = count == 1
            && !knockout_values.contains(&comp_het)
            && !knockout_values.contains(&deletion_overlap);

        if simple_filter {
            // validate the categorical literals before emitting them
            self.codec.knockout_tokens(&knockout_values)?;
            self.codec.filter_tokens(&filter_values)?;
            parse_string_value(query, QueryParam::Knockout, fields::KNOCKOUT_TYPES, filters);
            parse_string_value(query, QueryParam::Filter, fields::FILTERS, filters);
            parse_string_value(query, QueryParam::ConsequenceType, fields::CONSEQUENCE_TYPES, filters);
            if !pop_freq_values.is_empty() {
                for (study, tokens) in self.codec.parse_population_frequency_query(&pop_freq_values)? {
                    if let Some(expression) = group(&tokens, "||") {
                        filters.push(format!(
                            "{}{}:{}",
                            fields::POPULATION_FREQUENCIES,
                            study,
                            expression
                        ));
                    }
                }
            }
        } else if count > 0 || knockout_values.contains(&comp_het) {
            let knockout_values = if knockout_values.is_empty() {
                [
                    KnockoutType::CompHet,
                    KnockoutType::DeletionOverlap,
                    KnockoutType::HetAlt,
                    KnockoutType::HomAlt,
                ]
                .iter()
                .map(|ko| ko.to_string())
                .collect()
            } else {
                knockout_values
            };
            let filter_values = if filter_values.is_empty() {
                vec![PASS.to_string(), NOT_PASS.to_string()]
            } else {
                filter_values
            };
            let knockouts = self.codec.knockout_tokens(&knockout_values)?;
            let filter_tokens = self.codec.filter_tokens(&filter_values)?;
            let cts = ct_values
                .iter()
                .map(|ct| self.codec.consequence_type_token(ct))
                .collect::<Result<Vec<_>, _>>()?;
            let pop_freqs = self.codec.parse_population_frequency_query(&pop_freq_values)?;
            let all_cts = self.codec.consequence_type_tokens();

            filters.push(
                CompoundFilterBuilder::new(
                    self.mode,
                    &knockouts,
                    &filter_tokens,
                    &cts,
                    &pop_freqs,
                    &self.deletion_overlap_excluded,
                    &all_cts,
                )
                .build()?,
            );
        }
        Ok(())
    }

    /// The post-filter for compound heterozygous variant pairs, if `query`
    /// asks for them.
    ///
    /// This is the case if more than one variant is given separated by `;`
    /// and the knockout type is exactly `COMP_HET`.
    pub fn comp_het_post_filter(&self, query: &RgaQuery) -> Option<CompHetPostFilter> {
        let variants = query.values_split(QueryParam::Variants, ';');
        let knockout_types = query.values(QueryParam::Knockout);
        if variants.len() > 1
            && knockout_types.len() == 1
            && knockout_types[0].eq_ignore_ascii_case(&KnockoutType::CompHet.to_string())
        {
            Some(CompHetPostFilter { variants })
        } else {
            None
        }
    }
}

/// Emit the filter for one simple parameter.
///
/// A single value with `;` becomes an AND-list, otherwise values are OR-ed.
fn parse_string_value(
    query: &RgaQuery,
    param: QueryParam,
    field: &str,
    filters: &mut Vec<String>,
) {
    let mut values = query.values_split(param, ',');
    let mut op = "||";
    if values.len() == 1 {
        let and_values = query.values_split(param, ';');
        if and_values.len() > 1 {
            values = and_values;
            op = "&&";
        }
    }
    let escaped = values
        .iter()
        .map(|value| value.replace(':', "\\:"))
        .collect::<Vec<_>>();
    if let Some(expression) = group(&escaped, op) {
        filters.push(format!("{}:{}", field, expression));
    }
}

/// Checks that every requested variant is a compound heterozygous variant of
/// the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompHetPostFilter {
    variants: Vec<String>,
}

impl CompHetPostFilter {
    pub fn matches(&self, record: &RgaRecord) -> bool {
        let comp_het = KnockoutType::CompHet.to_string();
        self.variants.iter().all(|variant| {
            record
                .variants
                .iter()
                .position(|v| v == variant)
                .and_then(|i| record.knockout_types.get(i))
                .map(|knockout_type| knockout_type == &comp_het)
                .unwrap_or(false)
        })
    }
}
