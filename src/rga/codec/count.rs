//! Tally of knockout types over coded summaries, restricted by a query.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::str::FromStr;

use crate::rga::query::{QueryParam, RgaQuery};

use super::coded::CodedFeature;
use super::{Codec, Error, KnockoutType};

/// Value reported for the number of paired compound heterozygous ids when
/// computing it would be too expensive.
pub const PAIRED_COMP_HET_NOT_COMPUTED: i64 = -1000;

/// Counts the coded features matching a query by knockout type.
#[derive(Debug, Clone, Default)]
pub struct KnockoutTypeCount {
    variant_id_query: HashSet<String>,
    db_snp_query: HashSet<String>,
    type_query: HashSet<String>,
    knockout_type_query: HashSet<String>,
    clinical_significance_query: HashSet<String>,
    consequence_type_query: HashSet<String>,
    pop_freq_query: Vec<HashSet<String>>,
    max_paired_comp_het_set: usize,

    ids: BTreeSet<String>,
    transcript_comp_het_ids: BTreeMap<String, BTreeSet<String>>,
    hom_ids: BTreeSet<String>,
    het_ids: BTreeSet<String>,
    del_overlap_ids: BTreeSet<String>,
}

impl KnockoutTypeCount {
    /// Seed the filters from `query`.
    pub fn new(
        query: &RgaQuery,
        codec: &Codec,
        max_paired_comp_het_set: usize,
    ) -> Result<Self, Error> {
        let consequence_type_query = query
            .values(QueryParam::ConsequenceType)
            .iter()
            .map(|ct| codec.consequence_type_token(ct))
            .collect::<Result<HashSet<_>, _>>()?;
        let pop_freqs = query.values(QueryParam::PopulationFrequency);
        let pop_freq_query = if pop_freqs.is_empty() {
            Vec::new()
        } else {
            codec
                .parse_population_frequency_query(&pop_freqs)?
                .into_values()
                .map(|tokens| tokens.into_iter().collect())
                .collect()
        };

        Ok(Self {
            variant_id_query: query
                .values(QueryParam::Variants)
                .iter()
                .flat_map(|value| value.split(';'))
                .map(|id| id.to_string())
                .collect(),
            db_snp_query: query.values(QueryParam::DbSnps).into_iter().collect(),
            type_query: query.values(QueryParam::Type).into_iter().collect(),
            knockout_type_query: query
                .values(QueryParam::Knockout)
                .iter()
                .map(|knockout_type| knockout_type.to_uppercase())
                .collect(),
            clinical_significance_query: query
                .values(QueryParam::ClinicalSignificance)
                .into_iter()
                .collect(),
            consequence_type_query,
            pop_freq_query,
            max_paired_comp_het_set,
            ..Default::default()
        })
    }

    /// Whether `feature` matches all constraints of the query.
    pub fn passes_filter(&self, feature: &dyn CodedFeature) -> bool {
        if let Some(variant) = feature.as_variant() {
            if !self.variant_id_query.is_empty() && !self.variant_id_query.contains(&variant.id) {
                return false;
            }
            if !self.db_snp_query.is_empty() && !self.db_snp_query.contains(&variant.db_snp) {
                return false;
            }
            if !self.clinical_significance_query.is_empty()
                && !variant
                    .clinical_significances
                    .iter()
                    .any(|cs| self.clinical_significance_query.contains(cs))
            {
                return false;
            }
        }

        if !self.knockout_type_query.is_empty()
            && !self.knockout_type_query.contains(feature.knockout_type())
        {
            return false;
        }
        for pop_freq in &self.pop_freq_query {
            if !feature
                .population_frequencies()
                .iter()
                .any(|token| pop_freq.contains(token))
            {
                return false;
            }
        }
        if !self.type_query.is_empty() && !self.type_query.contains(feature.type_()) {
            return false;
        }
        if !self.consequence_type_query.is_empty()
            && !feature
                .consequence_types()
                .iter()
                .any(|ct| self.consequence_type_query.contains(ct))
        {
            return false;
        }
        true
    }

    /// Count `feature` if it passes the query.
    pub fn process_feature(&mut self, feature: &dyn CodedFeature) {
        if !self.passes_filter(feature) {
            return;
        }

        let knockout_type = match KnockoutType::from_str(feature.knockout_type()) {
            Ok(knockout_type) => knockout_type,
            Err(_) => {
                tracing::warn!(
                    "skipping feature {} with unexpected knockout type {}",
                    feature.id(),
                    feature.knockout_type()
                );
                return;
            }
        };

        let id = feature.id().to_string();
        self.ids.insert(id.clone());
        match knockout_type {
            KnockoutType::HomAlt => {
                self.hom_ids.insert(id);
            }
            KnockoutType::CompHet => {
                self.transcript_comp_het_ids
                    .entry(feature.transcript_id().to_string())
                    .or_default()
                    .insert(id);
            }
            KnockoutType::HetAlt => {
                self.het_ids.insert(id);
            }
            KnockoutType::DeletionOverlap => {
                self.del_overlap_ids.insert(id);
            }
        }
    }

    /// Distinct ids of all counted features.
    pub fn ids(&self) -> &BTreeSet<String> {
        &self.ids
    }

    pub fn num_ids(&self) -> usize {
        self.ids.len()
    }

    pub fn num_comp_het_ids(&self) -> usize {
        self.transcript_comp_het_ids
            .values()
            .flatten()
            .collect::<HashSet<_>>()
            .len()
    }

    /// Number of distinct unordered compound heterozygous pairs within
    /// transcripts, or [`PAIRED_COMP_HET_NOT_COMPUTED`] if any transcript has
    /// too many candidates.
    pub fn num_paired_comp_het_ids(&self) -> i64 {
        let mut pairs = HashSet::new();
        for ids in self.transcript_comp_het_ids.values() {
            if ids.len() > self.max_paired_comp_het_set {
                return PAIRED_COMP_HET_NOT_COMPUTED;
            }
            let ids = ids.iter().collect::<Vec<_>>();
            for (i, variant1) in ids.iter().enumerate() {
                for variant2 in ids.iter().skip(i + 1) {
                    // `ids` is sorted so each pair is already canonical.
                    pairs.insert(format!("{}-{}", variant1, variant2));
                }
            }
        }
        pairs.len() as i64
    }

    pub fn num_hom_ids(&self) -> usize {
        self.hom_ids.len()
    }

    pub fn num_het_ids(&self) -> usize {
        self.het_ids.len()
    }

    pub fn num_del_overlap_ids(&self) -> usize {
        self.del_overlap_ids.len()
    }

    /// Compound heterozygous ids by transcript, for transcripts with more than
    /// one candidate.
    pub fn transcript_comp_het_ids(&self) -> BTreeMap<String, Vec<String>> {
        self.transcript_comp_het_ids
            .iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(transcript_id, ids)| (transcript_id.clone(), ids.iter().cloned().collect()))
            .collect()
    }
}
