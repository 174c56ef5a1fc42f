//! Encoding of categorical knockout facts into the short tokens stored in the
//! compound filter field.
//!
//! A compound filter token joins the encoded knockout type, filter status,
//! consequence type and population frequency bucket of one variant with
//! [`SEPARATOR`], e.g., `HOA__P__1583__P1-2`.  The same tokens are produced
//! when loading records and when compiling queries so that multi-attribute
//! predicates can be answered by token equality alone.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use indexmap::IndexMap;
use itertools::Itertools;

pub mod coded;
pub mod count;

/// Separator between the parts of a compound token.
pub const SEPARATOR: &str = "__";
/// Separator between the values of one part of a coded summary.
pub const INNER_SEPARATOR: &str = "--";

/// Name of the 1000 genomes population study.
pub const THOUSAND_GENOMES_STUDY: &str = "1kG_phase3";
/// Name of the gnomAD genomes population study.
pub const GNOMAD_GENOMES_STUDY: &str = "GNOMAD_GENOMES";
/// The population studies that are bucketed, in token order (`P1`, `P2`).
pub const POP_FREQ_STUDIES: &[&str] = &[THOUSAND_GENOMES_STUDY, GNOMAD_GENOMES_STUDY];
/// Ascending threshold ladder for population frequency bucketing.
pub const POP_FREQS: &[f32] = &[0.0, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 1.0];

/// Filter literal for passing variants.
pub const PASS: &str = "PASS";
/// Filter literal for all other variants.
pub const NOT_PASS: &str = "NOT_PASS";

/// Closed consequence type vocabulary with Sequence Ontology accession numbers.
///
/// The accession number (without the `SO:` prefix and leading zeroes) is the
/// token of the term.
pub const CONSEQUENCE_TYPES: &[(&str, u32)] = &[
    ("transcript_ablation", 1893),
    ("splice_acceptor_variant", 1574),
    ("splice_donor_variant", 1575),
    ("stop_gained", 1587),
    ("frameshift_variant", 1589),
    ("stop_lost", 1578),
    ("start_lost", 2012),
    ("initiator_codon_variant", 1582),
    ("transcript_amplification", 1889),
    ("inframe_insertion", 1821),
    ("inframe_deletion", 1822),
    ("inframe_variant", 1650),
    ("missense_variant", 1583),
    ("protein_altering_variant", 1818),
    ("splice_region_variant", 1630),
    ("incomplete_terminal_codon_variant", 1626),
    ("start_retained_variant", 2019),
    ("stop_retained_variant", 1567),
    ("terminator_codon_variant", 1590),
    ("synonymous_variant", 1819),
    ("coding_sequence_variant", 1580),
    ("mature_miRNA_variant", 1620),
    ("5_prime_UTR_variant", 1623),
    ("3_prime_UTR_variant", 1624),
    ("exon_variant", 1791),
    ("non_coding_transcript_exon_variant", 1792),
    ("intron_variant", 1627),
    ("NMD_transcript_variant", 1621),
    ("non_coding_transcript_variant", 1619),
    ("upstream_gene_variant", 1631),
    ("2KB_upstream_variant", 1636),
    ("downstream_gene_variant", 1632),
    ("2KB_downstream_variant", 2083),
    ("TFBS_ablation", 1895),
    ("TFBS_amplification", 1892),
    ("TF_binding_site_variant", 1782),
    ("regulatory_region_ablation", 1894),
    ("regulatory_region_amplification", 1891),
    ("regulatory_region_variant", 1566),
    ("feature_elongation", 1907),
    ("feature_truncation", 1906),
    ("feature_variant", 1878),
    ("intergenic_variant", 1628),
    ("structural_variant", 1537),
    ("copy_number_change", 1563),
    ("polypeptide_variation_site", 336),
    ("SNV", 1483),
    ("SNP", 694),
    ("miRNA", 276),
    ("lincRNA", 1463),
    ("CpG_island", 307),
    ("miRNA_target_site", 934),
    ("DNAseI_hypersensitive_site", 685),
    ("RNA_polymerase_promoter", 1203),
];

/// Synonyms accepted on input and mapped onto the closed vocabulary.
pub const CONSEQUENCE_TYPE_ALIASES: &[(&str, &str)] = &[
    ("upstream_variant", "upstream_gene_variant"),
    ("downstream_variant", "downstream_gene_variant"),
    ("2KB_upstream_gene_variant", "2KB_upstream_variant"),
    ("2KB_downstream_gene_variant", "2KB_downstream_variant"),
];

/// Knockout type of a variant in a transcript.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum KnockoutType {
    /// Two different variants, one on each allele.
    CompHet,
    /// Homozygous alternative.
    HomAlt,
    /// Heterozygous alternative overlapping another knockout.
    HetAlt,
    /// Variant overlapping a deletion.
    DeletionOverlap,
}

impl KnockoutType {
    /// The short token used in compound filters.
    pub fn token(&self) -> &'static str {
        match self {
            KnockoutType::CompHet => "CH",
            KnockoutType::HomAlt => "HOA",
            KnockoutType::HetAlt => "HEA",
            KnockoutType::DeletionOverlap => "DO",
        }
    }
}

/// Error type for the codec.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown filter value '{0}'")]
    UnknownLiteral(String),
    #[error("Unknown token '{0}'")]
    UnknownToken(String),
    #[error("Population frequency must be a value between 0 and 1. Passed '{0}'.")]
    FrequencyOutOfRange(f32),
    #[error("Unexpected operation '{0}'")]
    MissingKey(String),
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("Could not parse number '{0}'")]
    InvalidNumber(String),
    #[error("Population frequency filter '{0}' does not match any bucket")]
    EmptyFrequencyRange(String),
    #[error("Unexpected {kind} string received '{value}'. Expected {expected}")]
    MalformedCoded {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("Both lists should be the same size and contain the same population frequency values")]
    PopulationFrequencyMismatch,
    #[error("Consequence type accession {0} is used by more than one term")]
    DuplicateAccession(u32),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Render a Sequence Ontology accession number as `SO:0001583`.
pub fn so_accession(accession: u32) -> String {
    format!("SO:{:07}", accession)
}

/// Return the smallest ladder threshold that is `>= freq`.
pub fn population_frequency_bucket(freq: f32) -> Result<f32, Error> {
    POP_FREQS
        .iter()
        .copied()
        .find(|threshold| freq <= *threshold)
        .ok_or(Error::FrequencyOutOfRange(freq))
}

/// Explicitly constructed encode/decode tables.
#[derive(Debug, Clone)]
pub struct Codec {
    /// Literal to token, including consequence type aliases.
    encode_map: HashMap<String, String>,
    /// Token to canonical literal.
    decode_map: HashMap<String, String>,
    /// Canonical literals in vocabulary order.
    literals: Vec<String>,
    /// Consequence type name (canonical or alias) to accession.
    ct_accessions: HashMap<String, u32>,
    /// Accession to canonical consequence type name.
    ct_names: HashMap<u32, String>,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec {
    /// Construct with the built-in consequence type vocabulary.
    pub fn new() -> Self {
        Self::build(CONSEQUENCE_TYPES, CONSEQUENCE_TYPE_ALIASES)
    }

    /// Construct with an alternative consequence type vocabulary.
    ///
    /// Each accession may only be used once so that decoding is unambiguous.
    pub fn with_consequence_types(
        terms: &[(&str, u32)],
        aliases: &[(&str, &str)],
    ) -> Result<Self, Error> {
        if let Some((_, accession)) = terms.iter().duplicates_by(|(_, accession)| *accession).next() {
            return Err(Error::DuplicateAccession(*accession));
        }
        Ok(Self::build(terms, aliases))
    }

    fn build(terms: &[(&str, u32)], aliases: &[(&str, &str)]) -> Self {
        let mut literals: Vec<(String, String)> = Vec::new();
        for knockout_type in <KnockoutType as strum::IntoEnumIterator>::iter() {
            literals.push((knockout_type.to_string(), knockout_type.token().to_string()));
        }
        literals.push((PASS.to_string(), "P".to_string()));
        literals.push((NOT_PASS.to_string(), "NP".to_string()));

        let mut ct_accessions = HashMap::new();
        let mut ct_names = HashMap::new();
        for (name, accession) in terms {
            ct_names.insert(*accession, name.to_string());
            ct_accessions.insert(name.to_string(), *accession);
            literals.push((name.to_string(), accession.to_string()));
        }

        for (i, study) in POP_FREQ_STUDIES.iter().enumerate() {
            for (j, freq) in POP_FREQS.iter().enumerate() {
                literals.push((
                    population_frequency_literal(study, *freq),
                    format!("P{}-{}", i + 1, j + 1),
                ));
            }
        }

        let mut encode_map = HashMap::new();
        let mut decode_map = HashMap::new();
        for (literal, token) in &literals {
            encode_map.insert(literal.clone(), token.clone());
            decode_map.insert(token.clone(), literal.clone());
        }
        for (alias, canonical) in aliases {
            if let Some(accession) = ct_accessions.get(*canonical).copied() {
                ct_accessions.insert(alias.to_string(), accession);
                encode_map.insert(alias.to_string(), accession.to_string());
            }
        }

        Self {
            encode_map,
            decode_map,
            literals: literals.into_iter().map(|(literal, _)| literal).collect(),
            ct_accessions,
            ct_names,
        }
    }

    /// The canonical literals of all vocabularies, in table order.
    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    /// Encode a literal into its token.
    ///
    /// Population frequency literals are accepted with any capitalisation of
    /// the study name and any spelling of the ladder value, e.g.,
    /// `1KG_PHASE3__1.0E-4` and `1kG_phase3__0.0001` are the same literal.
    pub fn encode(&self, value: &str) -> Result<String, Error> {
        if let Some(token) = self.encode_map.get(value) {
            return Ok(token.clone());
        }
        if let Some((study, freq)) = value.split_once(SEPARATOR) {
            if let (Some(study), Ok(freq)) = (canonical_study(study), freq.parse::<f32>()) {
                if let Some(token) = self
                    .encode_map
                    .get(&population_frequency_literal(study, freq))
                {
                    return Ok(token.clone());
                }
            }
        }
        Err(Error::UnknownLiteral(value.to_string()))
    }

    /// Decode a token back into its canonical literal.
    pub fn decode(&self, token: &str) -> Result<String, Error> {
        self.decode_map
            .get(token)
            .cloned()
            .ok_or_else(|| Error::UnknownToken(token.to_string()))
    }

    /// Resolve a consequence type given by name, alias, `SO:` accession or
    /// bare accession number.
    pub fn consequence_type_accession(&self, value: &str) -> Result<u32, Error> {
        let value = value.trim();
        if let Some(accession) = self.ct_accessions.get(value) {
            return Ok(*accession);
        }
        let digits = value.strip_prefix("SO:").unwrap_or(value);
        match digits.parse::<u32>() {
            Ok(accession) if self.ct_names.contains_key(&accession) => Ok(accession),
            _ => Err(Error::UnknownLiteral(value.to_string())),
        }
    }

    /// Token of a consequence type given in any accepted form.
    pub fn consequence_type_token(&self, value: &str) -> Result<String, Error> {
        self.consequence_type_accession(value)
            .map(|accession| accession.to_string())
    }

    /// Canonical name of the consequence type with the given accession.
    pub fn consequence_type_name(&self, accession: u32) -> Result<&str, Error> {
        self.ct_names
            .get(&accession)
            .map(|name| name.as_str())
            .ok_or_else(|| Error::UnknownToken(accession.to_string()))
    }

    /// Tokens of all consequence types in the vocabulary.
    pub fn consequence_type_tokens(&self) -> Vec<String> {
        self.ct_names
            .keys()
            .sorted()
            .map(|accession| accession.to_string())
            .collect()
    }

    /// Bucket `freq` and return the token for `study`.
    pub fn population_frequency_token(&self, study: &str, freq: f32) -> Result<String, Error> {
        let bucket = population_frequency_bucket(freq)?;
        self.encode(&format!("{}{}{}", study.to_uppercase(), SEPARATOR, bucket))
    }

    /// Encode knockout type literals, ignoring case.
    pub fn knockout_tokens(&self, values: &[String]) -> Result<Vec<String>, Error> {
        values
            .iter()
            .map(|value| self.encode(&value.to_uppercase()))
            .collect()
    }

    /// Encode filter literals.
    pub fn filter_tokens(&self, values: &[String]) -> Result<Vec<String>, Error> {
        values.iter().map(|value| self.encode(value)).collect()
    }

    /// Expand `{study}{op}{value}` expressions into the population frequency
    /// tokens matching the range, keyed by canonical study name.
    ///
    /// Only `<`, `<=`, `>` and `>=` are supported.  `<` and `<=` walk the
    /// ladder up from the lowest threshold, `>` and `>=` walk down from the
    /// highest one.
    pub fn parse_population_frequency_query(
        &self,
        filters: &[String],
    ) -> Result<IndexMap<String, Vec<String>>, Error> {
        let mut result = IndexMap::new();
        for filter in filters {
            let (key, op, value) =
                parse_key_op_value(filter)?.ok_or_else(|| Error::MissingKey(filter.clone()))?;
            if key.is_empty() {
                return Err(Error::MissingKey(filter.clone()));
            }
            let study = canonical_study(&key)
                .ok_or_else(|| Error::UnknownLiteral(format!("{}{}{}", key, SEPARATOR, value)))?;
            let value = value
                .parse::<f32>()
                .map_err(|_| Error::InvalidNumber(value.clone()))?;
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::FrequencyOutOfRange(value));
            }

            let thresholds: Vec<f32> = match op.as_str() {
                "<" => POP_FREQS.iter().copied().take_while(|f| *f < value).collect(),
                "<=" => POP_FREQS.iter().copied().take_while(|f| *f <= value).collect(),
                ">" => POP_FREQS.iter().rev().copied().take_while(|f| *f > value).collect(),
                ">=" => POP_FREQS.iter().rev().copied().take_while(|f| *f >= value).collect(),
                _ => return Err(Error::UnknownOperator(op.clone())),
            };
            if thresholds.is_empty() {
                return Err(Error::EmptyFrequencyRange(filter.clone()));
            }
            let tokens = thresholds
                .into_iter()
                .map(|freq| self.encode(&population_frequency_literal(study, freq)))
                .collect::<Result<Vec<_>, _>>()?;
            result.insert(study.to_string(), tokens);
        }
        Ok(result)
    }
}

/// Canonical literal of a population frequency bucket, e.g., `1kG_phase3__0.0`.
pub fn population_frequency_literal(study: &str, freq: f32) -> String {
    format!("{}{}{:?}", study, SEPARATOR, freq)
}

/// Map a study name onto its canonical spelling, ignoring case.
pub fn canonical_study(study: &str) -> Option<&'static str> {
    POP_FREQ_STUDIES
        .iter()
        .copied()
        .find(|known| known.eq_ignore_ascii_case(study.trim()))
}

fn operation_regex() -> Result<&'static regex::Regex, Error> {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    if let Some(re) = RE.get() {
        return Ok(re);
    }
    let re = regex::Regex::new(r"^([^=<>~!]*)(<?<=?|>>?=?|!=?|!?=?~|==?)([^=<>~!]+.*)$")
        .map_err(|e| Error::InvalidPattern(e.to_string()))?;
    Ok(RE.get_or_init(|| re))
}

/// Split `ALL<=0.2` into `("ALL", "<=", "0.2")`.
///
/// Returns `None` if the value does not look like a key-operator-value
/// expression.
pub fn parse_key_op_value(value: &str) -> Result<Option<(String, String, String)>, Error> {
    Ok(operation_regex()?.captures(value).map(|captures| {
        (
            captures[1].trim().to_string(),
            captures[2].trim().to_string(),
            captures[3].trim().to_string(),
        )
    }))
}

/// Every unordered pair of `tokens` (including self-pairs), smaller first,
/// joined with [`SEPARATOR`].
pub fn sorted_pair_combinations(tokens: &[String]) -> Vec<String> {
    let mut result = BTreeSet::new();
    for a in tokens {
        for b in tokens {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            result.insert(format!("{}{}{}", lo, SEPARATOR, hi));
        }
    }
    result.into_iter().collect()
}

/// Pairs of the cross product of `list1` and `list2`, smaller element first.
pub fn sorted_pairs(list1: &[String], list2: &[String]) -> Vec<(String, String)> {
    list1
        .iter()
        .cartesian_product(list2.iter())
        .map(|(a, b)| {
            if a <= b {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            }
        })
        .collect()
}

/// Positions of the token groups of one variant, `[[KO], [F], [CTs], [PFs]]`.
pub mod token_group {
    pub const KNOCKOUT_TYPE: usize = 0;
    pub const FILTER: usize = 1;
    pub const CONSEQUENCE_TYPE: usize = 2;
    pub const POPULATION_FREQUENCY: usize = 3;
    /// Number of groups of a fully described variant.
    pub const COUNT: usize = 4;
}

/// Compound tokens of one variant given `[[KO], [F], [CTs], [PFs]]`.
///
/// Yields `KO__F`, `KO__F__CT`, `KO__F__CT__PF` and `KO__F__PF`.  The bare
/// knockout token is not emitted as it has its own field.
pub fn cartesian_combinations(groups: &[Vec<String>]) -> Vec<String> {
    if groups.is_empty() {
        return Vec::new();
    }
    let mut result: Vec<Vec<&str>> = Vec::new();
    let mut previous: Vec<Vec<&str>> = groups[0].iter().map(|v| vec![v.as_str()]).collect();
    for group in groups.iter().skip(1) {
        let current: Vec<Vec<&str>> = previous
            .iter()
            .cartesian_product(group.iter())
            .map(|(prefix, value)| {
                let mut terms = prefix.clone();
                terms.push(value.as_str());
                terms
            })
            .collect();
        result.extend(current.iter().cloned());
        previous = current;
    }
    if let Some(pop_freqs) = groups.get(token_group::POPULATION_FREQUENCY) {
        for ((ko, filter), pop_freq) in groups[token_group::KNOCKOUT_TYPE]
            .iter()
            .cartesian_product(groups[token_group::FILTER].iter())
            .cartesian_product(pop_freqs.iter())
        {
            result.push(vec![ko.as_str(), filter.as_str(), pop_freq.as_str()]);
        }
    }
    result
        .into_iter()
        .map(|terms| terms.join(SEPARATOR))
        .unique()
        .collect()
}

/// Compound tokens for a pair of compound heterozygous variants.
///
/// Each variant is given as `[[KO], [F], [CTs], [PFs]]`.  Yields
/// `CH__F1__F2`, `CH__F1__F2__CT1__CT2`, `CH__F1__F2__CT1__CT2__PF1__PF2`,
/// `CH__F1__F2__PF1__PF2` and `CH__F1__F2__PF'` where `PF'` is the least
/// restrictive bucket of both variants per population.
pub fn comp_het_pair_combinations(
    variant1: &[Vec<String>],
    variant2: &[Vec<String>],
) -> Result<BTreeSet<String>, Error> {
    if variant1.len() != token_group::COUNT || variant2.len() != token_group::COUNT {
        return Err(Error::MalformedCoded {
            kind: "compound heterozygous",
            value: format!("{:?} / {:?}", variant1, variant2),
            expected: "[[KO], [F], [CTs], [PFs]]",
        });
    }
    use token_group::{CONSEQUENCE_TYPE, FILTER, POPULATION_FREQUENCY};

    let knockout = KnockoutType::CompHet.token();
    let filters = sorted_pairs(&variant1[FILTER], &variant2[FILTER]);
    let cts = sorted_pairs(&variant1[CONSEQUENCE_TYPE], &variant2[CONSEQUENCE_TYPE]);
    let pop_freqs = sorted_pairs(&variant1[POPULATION_FREQUENCY], &variant2[POPULATION_FREQUENCY]);
    let simplified = simplified_population_frequencies(
        &variant1[POPULATION_FREQUENCY],
        &variant2[POPULATION_FREQUENCY],
    )?;

    let mut result = BTreeSet::new();
    for (f1, f2) in &filters {
        let prefix = [knockout, f1.as_str(), f2.as_str()].join(SEPARATOR);
        for (pf1, pf2) in &pop_freqs {
            result.insert([prefix.as_str(), pf1.as_str(), pf2.as_str()].join(SEPARATOR));
        }
        for pf in &simplified {
            result.insert([prefix.as_str(), pf.as_str()].join(SEPARATOR));
        }
        for (ct1, ct2) in &cts {
            let with_cts = [prefix.as_str(), ct1.as_str(), ct2.as_str()].join(SEPARATOR);
            for (pf1, pf2) in &pop_freqs {
                result.insert([with_cts.as_str(), pf1.as_str(), pf2.as_str()].join(SEPARATOR));
            }
            result.insert(with_cts);
        }
        result.insert(prefix);
    }
    Ok(result)
}

/// Compound tokens over all pairs of compound heterozygous variants of one
/// transcript.  Fewer than two variants yield nothing.
pub fn comp_het_combinations(variants: &[Vec<Vec<String>>]) -> Result<BTreeSet<String>, Error> {
    let mut result = BTreeSet::new();
    for (i, variant1) in variants.iter().enumerate() {
        for variant2 in variants.iter().skip(i + 1) {
            result.extend(comp_het_pair_combinations(variant1, variant2)?);
        }
    }
    Ok(result)
}

/// Per population, the higher (least restrictive) bucket of both variants.
///
/// `[P1-3, P2-6]` and `[P1-5, P2-2]` yield `[P1-5, P2-6]`.
fn simplified_population_frequencies(
    list1: &[String],
    list2: &[String],
) -> Result<Vec<String>, Error> {
    if list1.len() != list2.len() {
        return Err(Error::PopulationFrequencyMismatch);
    }
    let parse = |list: &[String]| -> Result<IndexMap<String, u32>, Error> {
        list.iter()
            .map(|token| {
                let (population, bucket) = token
                    .split_once('-')
                    .ok_or_else(|| Error::UnknownToken(token.clone()))?;
                let bucket = bucket
                    .parse::<u32>()
                    .map_err(|_| Error::UnknownToken(token.clone()))?;
                Ok((population.to_string(), bucket))
            })
            .collect()
    };
    let map1 = parse(list1)?;
    let map2 = parse(list2)?;
    map1.iter()
        .map(|(population, bucket1)| {
            let bucket2 = map2
                .get(population)
                .ok_or(Error::PopulationFrequencyMismatch)?;
            Ok(format!("{}-{}", population, bucket1.max(bucket2)))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[rstest::rstest]
    #[case("HOM_ALT", "HOA")]
    #[case("COMP_HET", "CH")]
    #[case("HET_ALT", "HEA")]
    #[case("DELETION_OVERLAP", "DO")]
    #[case("PASS", "P")]
    #[case("NOT_PASS", "NP")]
    #[case("missense_variant", "1583")]
    #[case("stop_gained", "1587")]
    #[case("upstream_variant", "1631")]
    #[case("1kG_phase3__0.0", "P1-1")]
    #[case("1KG_PHASE3__0.0", "P1-1")]
    #[case("GNOMAD_GENOMES__1.0E-4", "P2-2")]
    #[case("GNOMAD_GENOMES__1.0", "P2-8")]
    fn encode(#[case] literal: &str, #[case] token: &str) -> Result<(), anyhow::Error> {
        assert_eq!(Codec::new().encode(literal)?, token);
        Ok(())
    }

    #[rstest::rstest]
    #[case("HOMALT")]
    #[case("missense")]
    #[case("1kG_phase3__0.3")]
    #[case("EXAC__0.0")]
    #[case("")]
    fn encode_unknown(#[case] literal: &str) {
        assert_eq!(
            Codec::new().encode(literal),
            Err(Error::UnknownLiteral(literal.to_string()))
        );
    }

    #[test]
    fn decode_encode_round_trip() -> Result<(), anyhow::Error> {
        let codec = Codec::new();
        assert_eq!(codec.literals().len(), 4 + 2 + CONSEQUENCE_TYPES.len() + 16);
        for literal in codec.literals() {
            assert_eq!(&codec.decode(&codec.encode(literal)?)?, literal);
        }
        assert_eq!(codec.decode("P9-9"), Err(Error::UnknownToken("P9-9".into())));
        Ok(())
    }

    #[test]
    fn duplicate_accession_is_rejected() {
        let res = Codec::with_consequence_types(&[("a", 1), ("b", 1)], &[]);
        assert_eq!(res.err(), Some(Error::DuplicateAccession(1)));
    }

    #[rstest::rstest]
    #[case("missense_variant", 1583)]
    #[case("SO:0001583", 1583)]
    #[case("1583", 1583)]
    #[case("2KB_downstream_gene_variant", 2083)]
    fn consequence_type_accession(#[case] value: &str, #[case] expected: u32) {
        assert_eq!(
            Codec::new().consequence_type_accession(value),
            Ok(expected)
        );
    }

    #[test]
    fn consequence_type_accession_unknown() {
        assert!(Codec::new().consequence_type_accession("SO:9999999").is_err());
        assert_eq!(so_accession(1583), "SO:0001583");
        assert_eq!(so_accession(336), "SO:0000336");
    }

    #[rstest::rstest]
    #[case(0.0, 0.0)]
    #[case(0.00001, 0.0001)]
    #[case(0.0001, 0.0001)]
    #[case(0.0002, 0.0005)]
    #[case(0.02, 0.05)]
    #[case(0.5, 1.0)]
    #[case(1.0, 1.0)]
    fn population_frequency_bucket(#[case] freq: f32, #[case] expected: f32) {
        assert_eq!(super::population_frequency_bucket(freq), Ok(expected));
    }

    #[test]
    fn population_frequency_bucket_monotonic() {
        let mut previous = 0.0f32;
        for i in 0..=1000 {
            let bucket = super::population_frequency_bucket(i as f32 / 1000.0)
                .expect("in range");
            assert!(bucket >= previous);
            previous = bucket;
        }
        assert_eq!(
            super::population_frequency_bucket(1.5),
            Err(Error::FrequencyOutOfRange(1.5))
        );
    }

    #[rstest::rstest]
    #[case("1kG_phase3<0.001", &["P1-1", "P1-2", "P1-3"])]
    #[case("1kG_phase3<=0.001", &["P1-1", "P1-2", "P1-3", "P1-4"])]
    #[case("GNOMAD_GENOMES>0.01", &["P2-8", "P2-7"])]
    #[case("gnomad_genomes>=0.01", &["P2-8", "P2-7", "P2-6"])]
    #[case("1kG_phase3<=1", &["P1-1", "P1-2", "P1-3", "P1-4", "P1-5", "P1-6", "P1-7", "P1-8"])]
    fn parse_population_frequency_query(#[case] filter: &str, #[case] expected: &[&str]) {
        let result = Codec::new()
            .parse_population_frequency_query(&[filter.to_string()])
            .expect("valid query");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0], strings(expected));
    }

    #[test]
    fn parse_population_frequency_query_two_studies() -> Result<(), anyhow::Error> {
        let result = Codec::new().parse_population_frequency_query(&strings(&[
            "1kG_phase3<0.0005",
            "GNOMAD_GENOMES<0.0005",
        ]))?;
        assert_eq!(
            result.keys().collect::<Vec<_>>(),
            vec![THOUSAND_GENOMES_STUDY, GNOMAD_GENOMES_STUDY]
        );
        assert_eq!(result[GNOMAD_GENOMES_STUDY], strings(&["P2-1", "P2-2"]));
        Ok(())
    }

    #[rstest::rstest]
    #[case("1kG_phase3=0.01", Error::UnknownOperator("=".into()))]
    #[case("1kG_phase3!=0.01", Error::UnknownOperator("!=".into()))]
    #[case("0.01", Error::MissingKey("0.01".into()))]
    #[case("<0.01", Error::MissingKey("<0.01".into()))]
    #[case("1kG_phase3<2", Error::FrequencyOutOfRange(2.0))]
    #[case("1kG_phase3<0", Error::EmptyFrequencyRange("1kG_phase3<0".into()))]
    #[case("1kG_phase3<abc", Error::InvalidNumber("abc".into()))]
    fn parse_population_frequency_query_errors(#[case] filter: &str, #[case] expected: Error) {
        assert_eq!(
            Codec::new().parse_population_frequency_query(&[filter.to_string()]),
            Err(expected)
        );
    }

    #[test]
    fn sorted_pair_combinations_canonical() {
        let forward = sorted_pair_combinations(&strings(&["b", "a", "c"]));
        let backward = sorted_pair_combinations(&strings(&["c", "b", "a"]));
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3 * 4 / 2);
        assert_eq!(
            forward,
            strings(&["a__a", "a__b", "a__c", "b__b", "b__c", "c__c"])
        );
    }

    #[test]
    fn sorted_pairs_order_elements() {
        assert_eq!(
            sorted_pairs(&strings(&["A", "D"]), &strings(&["B"])),
            vec![("A".into(), "B".into()), ("B".into(), "D".into())]
        );
    }

    #[test]
    fn cartesian_combinations_snapshot() {
        let groups = vec![
            strings(&["HOA"]),
            strings(&["P"]),
            strings(&["1583", "1587"]),
            strings(&["P1-1", "P2-3"]),
        ];
        insta::assert_yaml_snapshot!(cartesian_combinations(&groups));
    }

    #[test]
    fn cartesian_combinations_without_consequence_types() {
        let groups = vec![strings(&["HOA"]), strings(&["P"]), vec![], strings(&["P1-1"])];
        assert_eq!(
            cartesian_combinations(&groups),
            strings(&["HOA__P", "HOA__P__P1-1"])
        );
    }

    #[test]
    fn cartesian_combinations_without_population_frequencies() {
        let groups = vec![strings(&["HOA"]), strings(&["P"]), strings(&["1583"])];
        assert_eq!(
            cartesian_combinations(&groups),
            strings(&["HOA__P", "HOA__P__1583"])
        );
    }

    #[test]
    fn comp_het_pair_combinations_snapshot() -> Result<(), anyhow::Error> {
        let variant1 = vec![
            strings(&["CH"]),
            strings(&["P"]),
            strings(&["1583"]),
            strings(&["P1-3", "P2-6"]),
        ];
        let variant2 = vec![
            strings(&["CH"]),
            strings(&["NP"]),
            strings(&["1587"]),
            strings(&["P1-5", "P2-2"]),
        ];
        let result = comp_het_pair_combinations(&variant1, &variant2)?;
        assert!(result.contains("CH__NP__P__P1-5"));
        assert!(result.contains("CH__NP__P__P2-6"));
        assert!(result.contains("CH__NP__P__1583__1587__P1-3__P1-5"));
        insta::assert_yaml_snapshot!(result);
        Ok(())
    }

    #[test]
    fn comp_het_combinations_need_two_variants() -> Result<(), anyhow::Error> {
        let variant = vec![
            strings(&["CH"]),
            strings(&["P"]),
            strings(&["1583"]),
            strings(&["P1-1", "P2-1"]),
        ];
        assert!(comp_het_combinations(&[variant.clone()])?.is_empty());
        assert!(!comp_het_combinations(&[variant.clone(), variant])?.is_empty());
        Ok(())
    }
}
