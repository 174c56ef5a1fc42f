//! Expansion of multi-attribute predicates into compound filter tokens.
//!
//! When two or more of knockout type, filter, consequence type and population
//! frequency are constrained at once, the predicate must hold for one and the
//! same variant.  This can only be expressed against the `compoundFilters`
//! field that holds the pre-joined tokens of each variant.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::rga::codec::{sorted_pair_combinations, sorted_pairs, KnockoutType, SEPARATOR};
use crate::rga::model::record::fields;

use super::{CompHetQueryMode, Error};

/// Join `values` with `op`, wrapping in parentheses if there is more than one.
pub fn group(values: &[String], op: &str) -> Option<String> {
    match values.len() {
        0 => None,
        1 => Some(values[0].clone()),
        _ => Some(format!("( {} )", values.join(&format!(" {} ", op)))),
    }
}

fn token<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|part| part.as_ref())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Builds the `compoundFilters` filter from encoded tokens.
#[derive(Debug, Clone)]
pub struct CompoundFilterBuilder<'a> {
    mode: CompHetQueryMode,
    knockouts: &'a [String],
    filters: &'a [String],
    cts: &'a [String],
    pop_freqs: &'a IndexMap<String, Vec<String>>,
    /// Filter tokens for the compound heterozygous branch.
    ch_filters: Vec<String>,
    /// Consequence type tokens for the compound heterozygous branch.
    ch_cts: Vec<String>,
    /// Consequence types never matched for deletion overlaps.
    do_excluded: &'a HashSet<String>,
    /// Consequence types matched for deletion overlaps if none are requested.
    do_included: Vec<String>,
}

impl<'a> CompoundFilterBuilder<'a> {
    /// Construct from encoded knockout, filter, consequence type and
    /// population frequency tokens.
    ///
    /// `all_cts` are the tokens of the full consequence type vocabulary.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mode: CompHetQueryMode,
        knockouts: &'a [String],
        filters: &'a [String],
        cts: &'a [String],
        pop_freqs: &'a IndexMap<String, Vec<String>>,
        do_excluded: &'a HashSet<String>,
        all_cts: &[String],
    ) -> Self {
        let (ch_filters, ch_cts) = match mode {
            CompHetQueryMode::Single => (filters.to_vec(), cts.to_vec()),
            CompHetQueryMode::Pair => (
                sorted_pair_combinations(filters),
                sorted_pair_combinations(cts),
            ),
        };
        let do_included = all_cts
            .iter()
            .filter(|ct| !do_excluded.contains(*ct))
            .cloned()
            .collect();
        Self {
            mode,
            knockouts,
            filters,
            cts,
            pop_freqs,
            ch_filters,
            ch_cts,
            do_excluded,
            do_included,
        }
    }

    fn is_ch(&self, ko: &str) -> bool {
        ko == KnockoutType::CompHet.token()
    }

    fn is_ch_pair(&self, ko: &str) -> bool {
        self.mode == CompHetQueryMode::Pair && self.is_ch(ko)
    }

    fn is_do(&self, ko: &str) -> bool {
        ko == KnockoutType::DeletionOverlap.token()
    }

    fn filters_for(&self, ko: &str) -> &[String] {
        if self.is_ch(ko) {
            &self.ch_filters
        } else {
            self.filters
        }
    }

    fn cts_for(&self, ko: &str) -> &[String] {
        if self.is_ch(ko) {
            &self.ch_cts
        } else {
            self.cts
        }
    }

    fn skip_ct(&self, ko: &str, ct: &str) -> bool {
        self.is_do(ko) && self.do_excluded.contains(ct)
    }

    /// Build the complete `compoundFilters:...` filter.
    pub fn build(&self) -> Result<String, Error> {
        let expression = match (self.cts.is_empty(), self.pop_freqs.is_empty()) {
            (true, true) => self.knockout_filter(),
            (false, true) => self.knockout_filter_ct(),
            (true, false) => self.knockout_filter_pop_freq(),
            (false, false) => self.knockout_filter_ct_pop_freq(),
        };
        expression
            .map(|expression| format!("{}:{}", fields::COMPOUND_FILTERS, expression))
            .ok_or(Error::EmptyCompoundFilter)
    }

    fn knockout_filter(&self) -> Option<String> {
        let mut or_list = Vec::new();
        for ko in self.knockouts {
            for filter in self.filters_for(ko) {
                if self.is_do(ko) {
                    for ct in &self.do_included {
                        or_list.push(token(&[ko, filter, ct]));
                    }
                } else {
                    or_list.push(token(&[ko, filter]));
                }
            }
        }
        group(&or_list, "||")
    }

    fn knockout_filter_ct(&self) -> Option<String> {
        let mut or_list = Vec::new();
        for ko in self.knockouts {
            for filter in self.filters_for(ko) {
                for ct in self.cts_for(ko) {
                    if self.skip_ct(ko, ct) {
                        continue;
                    }
                    or_list.push(token(&[ko, filter, ct]));
                }
            }
        }
        group(&or_list, "||")
    }

    fn knockout_filter_pop_freq(&self) -> Option<String> {
        let studies: Vec<&Vec<String>> = self.pop_freqs.values().collect();
        let mut and_list = Vec::new();
        if let [study1, study2] = studies.as_slice() {
            let mut or_list = Vec::new();
            for (pf1, pf2) in sorted_pairs(study1, study2) {
                for ko in self.knockouts {
                    for filter in self.filters_for(ko) {
                        if self.is_do(ko) {
                            for ct in &self.do_included {
                                or_list.extend(group(
                                    &[token(&[ko, filter, ct, &pf1]), token(&[ko, filter, ct, &pf2])],
                                    "&&",
                                ));
                            }
                        } else {
                            or_list.extend(group(
                                &[token(&[ko, filter, &pf1]), token(&[ko, filter, &pf2])],
                                "&&",
                            ));
                            if self.is_ch_pair(ko) {
                                or_list.push(token(&[ko, filter, &pf1, &pf2]));
                            }
                        }
                    }
                }
            }
            and_list.extend(group(&or_list, "||"));
        } else {
            for pop_freqs in studies {
                let mut or_list = Vec::new();
                for pf in pop_freqs {
                    for ko in self.knockouts {
                        for filter in self.filters_for(ko) {
                            if self.is_do(ko) {
                                for ct in &self.do_included {
                                    or_list.push(token(&[ko, filter, ct, pf]));
                                }
                            } else {
                                or_list.push(token(&[ko, filter, pf]));
                            }
                        }
                    }
                }
                and_list.extend(group(&or_list, "||"));
            }
        }
        group(&and_list, "&&")
    }

    fn knockout_filter_ct_pop_freq(&self) -> Option<String> {
        let studies: Vec<&Vec<String>> = self.pop_freqs.values().collect();
        if let [study1, study2] = studies.as_slice() {
            let mut ko_list = Vec::new();
            for ko in self.knockouts {
                if self.is_ch_pair(ko) {
                    let mut cross_list = Vec::new();
                    for (pf1, pf2) in sorted_pairs(study1, study2) {
                        for filter in &self.ch_filters {
                            for ct in &self.ch_cts {
                                cross_list.push(token(&[ko, filter, ct, &pf1, &pf2]));
                            }
                        }
                    }
                    let mut simplified_list = Vec::new();
                    for filter in &self.ch_filters {
                        let per_study = studies
                            .iter()
                            .filter_map(|pop_freqs| {
                                let tokens = pop_freqs
                                    .iter()
                                    .map(|pf| token(&[ko, filter, pf]))
                                    .collect::<Vec<_>>();
                                group(&tokens, "||")
                            })
                            .collect::<Vec<_>>();
                        simplified_list.extend(group(&per_study, "&&"));
                    }
                    let both = [group(&cross_list, "||"), group(&simplified_list, "||")]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>();
                    ko_list.extend(group(&both, "&&"));
                } else {
                    let mut or_list = Vec::new();
                    for ct in self.cts {
                        if self.skip_ct(ko, ct) {
                            continue;
                        }
                        for filter in self.filters {
                            let per_study = studies
                                .iter()
                                .filter_map(|pop_freqs| {
                                    let tokens = pop_freqs
                                        .iter()
                                        .map(|pf| token(&[ko, filter, ct, pf]))
                                        .collect::<Vec<_>>();
                                    group(&tokens, "||")
                                })
                                .collect::<Vec<_>>();
                            or_list.extend(group(&per_study, "&&"));
                        }
                    }
                    ko_list.extend(group(&or_list, "||"));
                }
            }
            group(&ko_list, "||")
        } else {
            let mut and_list = Vec::new();
            for pop_freqs in studies {
                let pop_freq_pairs = sorted_pair_combinations(pop_freqs);
                let mut or_list = Vec::new();
                for ko in self.knockouts {
                    for filter in self.filters_for(ko) {
                        for ct in self.cts_for(ko) {
                            if self.is_ch_pair(ko) {
                                for pf_pair in &pop_freq_pairs {
                                    or_list.push(token(&[ko, filter, ct, pf_pair]));
                                }
                            } else if !self.skip_ct(ko, ct) {
                                for pf in pop_freqs {
                                    or_list.push(token(&[ko, filter, ct, pf]));
                                }
                            }
                        }
                    }
                }
                and_list.extend(group(&or_list, "||"));
            }
            group(&and_list, "&&")
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    struct Input {
        knockouts: Vec<String>,
        filters: Vec<String>,
        cts: Vec<String>,
        pop_freqs: IndexMap<String, Vec<String>>,
        do_excluded: HashSet<String>,
        all_cts: Vec<String>,
    }

    impl Input {
        fn new(knockouts: &[&str], filters: &[&str], cts: &[&str]) -> Self {
            Self {
                knockouts: strings(knockouts),
                filters: strings(filters),
                cts: strings(cts),
                pop_freqs: IndexMap::new(),
                do_excluded: ["1583".to_string()].into_iter().collect(),
                all_cts: strings(&["1583", "1587"]),
            }
        }

        fn with_pop_freq(mut self, study: &str, tokens: &[&str]) -> Self {
            self.pop_freqs.insert(study.to_string(), strings(tokens));
            self
        }

        fn build(&self, mode: CompHetQueryMode) -> Result<String, Error> {
            CompoundFilterBuilder::new(
                mode,
                &self.knockouts,
                &self.filters,
                &self.cts,
                &self.pop_freqs,
                &self.do_excluded,
                &self.all_cts,
            )
            .build()
        }
    }

    #[test]
    fn group_values() {
        assert_eq!(group(&[], "||"), None);
        assert_eq!(group(&strings(&["a"]), "||"), Some("a".to_string()));
        assert_eq!(
            group(&strings(&["a", "b"]), "&&"),
            Some("( a && b )".to_string())
        );
    }

    #[test]
    fn knockout_and_filter() -> Result<(), anyhow::Error> {
        let input = Input::new(&["HOA", "DO"], &["P"], &[]);
        assert_eq!(
            input.build(CompHetQueryMode::Single)?,
            "compoundFilters:( HOA__P || DO__P__1587 )"
        );
        Ok(())
    }

    #[test]
    fn knockout_and_filter_pair_mode() -> Result<(), anyhow::Error> {
        let input = Input::new(&["CH"], &["P", "NP"], &[]);
        assert_eq!(
            input.build(CompHetQueryMode::Pair)?,
            "compoundFilters:( CH__NP__NP || CH__NP__P || CH__P__P )"
        );
        assert_eq!(
            input.build(CompHetQueryMode::Single)?,
            "compoundFilters:( CH__P || CH__NP )"
        );
        Ok(())
    }

    #[test]
    fn knockout_and_ct() -> Result<(), anyhow::Error> {
        let input = Input::new(&["HOA", "DO"], &["P"], &["1583", "1587"]);
        assert_eq!(
            input.build(CompHetQueryMode::Single)?,
            "compoundFilters:( HOA__P__1583 || HOA__P__1587 || DO__P__1587 )"
        );
        Ok(())
    }

    #[test]
    fn deletion_overlap_only_excluded_ct_is_empty() {
        let input = Input::new(&["DO"], &["P"], &["1583"]);
        assert_eq!(
            input.build(CompHetQueryMode::Single),
            Err(Error::EmptyCompoundFilter)
        );
    }

    #[test]
    fn one_study_pop_freq() -> Result<(), anyhow::Error> {
        let input = Input::new(&["HOA"], &["P", "NP"], &[]).with_pop_freq("1kG_phase3", &["P1-1", "P1-2"]);
        assert_eq!(
            input.build(CompHetQueryMode::Single)?,
            "compoundFilters:( HOA__P__P1-1 || HOA__NP__P1-1 || HOA__P__P1-2 || HOA__NP__P1-2 )"
        );
        Ok(())
    }

    #[test]
    fn two_studies_pop_freq() -> Result<(), anyhow::Error> {
        let input = Input::new(&["HOA"], &["P"], &[])
            .with_pop_freq("1kG_phase3", &["P1-1"])
            .with_pop_freq("GNOMAD_GENOMES", &["P2-1", "P2-2"]);
        assert_eq!(
            input.build(CompHetQueryMode::Single)?,
            "compoundFilters:( ( HOA__P__P1-1 && HOA__P__P2-1 ) || ( HOA__P__P1-1 && HOA__P__P2-2 ) )"
        );
        Ok(())
    }

    #[test]
    fn two_studies_pop_freq_pair_mode() -> Result<(), anyhow::Error> {
        let input = Input::new(&["CH"], &["P"], &[])
            .with_pop_freq("1kG_phase3", &["P1-1"])
            .with_pop_freq("GNOMAD_GENOMES", &["P2-1"]);
        assert_eq!(
            input.build(CompHetQueryMode::Pair)?,
            "compoundFilters:( ( CH__P__P__P1-1 && CH__P__P__P2-1 ) || CH__P__P__P1-1__P2-1 )"
        );
        Ok(())
    }

    #[test]
    fn ct_and_one_study() -> Result<(), anyhow::Error> {
        let input = Input::new(&["HOA", "DO"], &["P"], &["1583", "1587"])
            .with_pop_freq("GNOMAD_GENOMES", &["P2-1"]);
        assert_eq!(
            input.build(CompHetQueryMode::Single)?,
            "compoundFilters:( HOA__P__1583__P2-1 || HOA__P__1587__P2-1 || DO__P__1587__P2-1 )"
        );
        Ok(())
    }

    #[test]
    fn ct_and_one_study_pair_mode() -> Result<(), anyhow::Error> {
        let input = Input::new(&["CH"], &["P"], &["1583"])
            .with_pop_freq("GNOMAD_GENOMES", &["P2-1", "P2-2"]);
        assert_eq!(
            input.build(CompHetQueryMode::Pair)?,
            "compoundFilters:( CH__P__P__1583__1583__P2-1__P2-1 \
             || CH__P__P__1583__1583__P2-1__P2-2 || CH__P__P__1583__1583__P2-2__P2-2 )"
        );
        Ok(())
    }

    #[test]
    fn ct_and_two_studies() -> Result<(), anyhow::Error> {
        let input = Input::new(&["HOA"], &["P"], &["1587"])
            .with_pop_freq("1kG_phase3", &["P1-1", "P1-2"])
            .with_pop_freq("GNOMAD_GENOMES", &["P2-1"]);
        assert_eq!(
            input.build(CompHetQueryMode::Single)?,
            "compoundFilters:( ( HOA__P__1587__P1-1 || HOA__P__1587__P1-2 ) && HOA__P__1587__P2-1 )"
        );
        Ok(())
    }

    #[test]
    fn ct_and_two_studies_pair_mode() -> Result<(), anyhow::Error> {
        let input = Input::new(&["CH"], &["P"], &["1587"])
            .with_pop_freq("1kG_phase3", &["P1-1"])
            .with_pop_freq("GNOMAD_GENOMES", &["P2-1"]);
        assert_eq!(
            input.build(CompHetQueryMode::Pair)?,
            "compoundFilters:( CH__P__P__1587__1587__P1-1__P2-1 \
             && ( CH__P__P__P1-1 && CH__P__P__P2-1 ) )"
        );
        Ok(())
    }
}
