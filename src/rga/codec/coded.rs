//! Coded summaries stored on flat records.
//!
//! The summaries allow computing statistics from facets without fetching the
//! records themselves.

use std::collections::BTreeSet;

use super::{Error, KnockoutType, INNER_SEPARATOR, SEPARATOR};

/// Separator between the two variants of a compound heterozygous pair.
pub const VARIANT_PAIR_SEPARATOR: &str = "--_--";

/// Common accessors of coded individuals and variants.
pub trait CodedFeature {
    /// Transcript the feature refers to; empty for individuals.
    fn transcript_id(&self) -> &str;
    /// Individual or variant id.
    fn id(&self) -> &str;
    /// Variant type, e.g., `SNV`.
    fn type_(&self) -> &str;
    /// Knockout type literal, e.g., `COMP_HET`.
    fn knockout_type(&self) -> &str;
    /// Consequence type tokens.
    fn consequence_types(&self) -> &BTreeSet<String>;
    /// Population frequency tokens, one per population study.
    fn population_frequencies(&self) -> &[String];
    /// Downcast to a variant for the variant-only checks.
    fn as_variant(&self) -> Option<&CodedVariant> {
        None
    }
}

fn split_inner(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(INNER_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Coded summary of one variant in one transcript.
///
/// `{transcriptId}__{id}__{dbSnp}__{type}__{knockoutType}--{parentalOrigin}__{clinicalSignificances}__{conseqTypes}__{popFreqs}`
#[derive(Debug, Clone, PartialEq, Eq, Default, derive_new::new)]
pub struct CodedVariant {
    pub transcript_id: String,
    pub id: String,
    pub db_snp: String,
    pub type_: String,
    pub knockout_type: String,
    pub parental_origin: String,
    pub clinical_significances: Vec<String>,
    pub consequence_types: BTreeSet<String>,
    pub population_frequencies: Vec<String>,
}

impl CodedVariant {
    /// Render into the coded summary string.
    pub fn encoded_id(&self) -> String {
        [
            self.transcript_id.clone(),
            self.id.clone(),
            self.db_snp.clone(),
            self.type_.clone(),
            format!(
                "{}{}{}",
                self.knockout_type, INNER_SEPARATOR, self.parental_origin
            ),
            self.clinical_significances.join(INNER_SEPARATOR),
            self.consequence_types.iter().cloned().collect::<Vec<_>>().join(INNER_SEPARATOR),
            self.population_frequencies.join(INNER_SEPARATOR),
        ]
        .join(SEPARATOR)
    }

    /// Parse from the coded summary string.
    pub fn parse(encoded: &str) -> Result<Self, Error> {
        let split: Vec<&str> = encoded.split(SEPARATOR).collect();
        if split.len() != 8 {
            return Err(Error::MalformedCoded {
                kind: "variant",
                value: encoded.to_string(),
                expected: "{transcriptId}__{id}__{dbSnp}__{type}__{knockoutType}--{parentalOrigin}\
                           __{clinicalSignificances}__{conseqType}__{popFreqs}",
            });
        }
        let (knockout_type, parental_origin) = split[4]
            .split_once(INNER_SEPARATOR)
            .unwrap_or((split[4], ""));
        Ok(Self {
            transcript_id: split[0].to_string(),
            id: split[1].to_string(),
            db_snp: split[2].to_string(),
            type_: split[3].to_string(),
            knockout_type: knockout_type.to_string(),
            parental_origin: parental_origin.to_string(),
            clinical_significances: split_inner(split[5]).collect(),
            consequence_types: split_inner(split[6]).collect(),
            population_frequencies: split[7].split(INNER_SEPARATOR).map(|s| s.to_string()).collect(),
        })
    }

    /// Whether this is a compound heterozygous variant.
    pub fn is_comp_het(&self) -> bool {
        self.knockout_type == KnockoutType::CompHet.to_string()
    }
}

impl CodedFeature for CodedVariant {
    fn transcript_id(&self) -> &str {
        &self.transcript_id
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn type_(&self) -> &str {
        &self.type_
    }

    fn knockout_type(&self) -> &str {
        &self.knockout_type
    }

    fn consequence_types(&self) -> &BTreeSet<String> {
        &self.consequence_types
    }

    fn population_frequencies(&self) -> &[String] {
        &self.population_frequencies
    }

    fn as_variant(&self) -> Option<&CodedVariant> {
        Some(self)
    }
}

/// Coded summary of one individual carrying a knockout.
///
/// `{id}__{type}__{knockoutType}__{conseqTypes}__{popFreqs}__{numParents}`
#[derive(Debug, Clone, PartialEq, Eq, Default, derive_new::new)]
pub struct CodedIndividual {
    pub id: String,
    pub type_: String,
    pub knockout_type: String,
    pub consequence_types: BTreeSet<String>,
    pub population_frequencies: Vec<String>,
    pub num_parents: u8,
}

impl CodedIndividual {
    /// Render into the coded summary string.
    pub fn encoded_id(&self) -> String {
        [
            self.id.clone(),
            self.type_.clone(),
            self.knockout_type.clone(),
            self.consequence_types.iter().cloned().collect::<Vec<_>>().join(INNER_SEPARATOR),
            self.population_frequencies.join(INNER_SEPARATOR),
            self.num_parents.to_string(),
        ]
        .join(SEPARATOR)
    }

    /// Parse from the coded summary string.
    pub fn parse(encoded: &str) -> Result<Self, Error> {
        let malformed = || Error::MalformedCoded {
            kind: "individual",
            value: encoded.to_string(),
            expected: "{id}__{type}__{knockoutType}__{conseqType}__{popFreqs}__{numParents}",
        };
        let split: Vec<&str> = encoded.split(SEPARATOR).collect();
        if split.len() != 6 {
            return Err(malformed());
        }
        let num_parents = split[5].parse::<u8>().map_err(|_| malformed())?;
        Ok(Self {
            id: split[0].to_string(),
            type_: split[1].to_string(),
            knockout_type: split[2].to_string(),
            consequence_types: split_inner(split[3]).collect(),
            population_frequencies: split[4].split(INNER_SEPARATOR).map(|s| s.to_string()).collect(),
            num_parents,
        })
    }
}

impl CodedFeature for CodedIndividual {
    fn transcript_id(&self) -> &str {
        ""
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn type_(&self) -> &str {
        &self.type_
    }

    fn knockout_type(&self) -> &str {
        &self.knockout_type
    }

    fn consequence_types(&self) -> &BTreeSet<String> {
        &self.consequence_types
    }

    fn population_frequencies(&self) -> &[String] {
        &self.population_frequencies
    }
}

/// Pair of compound heterozygous variants of one transcript.
///
/// Each variant is reduced to `{id}__{parentalOrigin}__{conseqTypes}__{popFreqs}`
/// and both are joined with [`VARIANT_PAIR_SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new)]
pub struct CodedChPairVariants {
    pub maternal: CodedVariant,
    pub paternal: CodedVariant,
}

impl CodedChPairVariants {
    /// Render into the coded pair string.
    pub fn encoded_id(&self) -> String {
        format!(
            "{}{}{}",
            Self::encode_variant(&self.maternal),
            VARIANT_PAIR_SEPARATOR,
            Self::encode_variant(&self.paternal)
        )
    }

    /// Parse from the coded pair string.
    pub fn parse(encoded: &str) -> Result<Self, Error> {
        let split: Vec<&str> = encoded.split(VARIANT_PAIR_SEPARATOR).collect();
        if split.len() != 2 {
            return Err(Error::MalformedCoded {
                kind: "CH variant",
                value: encoded.to_string(),
                expected: "{variant1}--_--{variant2}",
            });
        }
        Ok(Self {
            maternal: Self::decode_variant(split[0])?,
            paternal: Self::decode_variant(split[1])?,
        })
    }

    fn encode_variant(variant: &CodedVariant) -> String {
        [
            variant.id.clone(),
            variant.parental_origin.clone(),
            variant.consequence_types.iter().cloned().collect::<Vec<_>>().join(INNER_SEPARATOR),
            variant.population_frequencies.join(INNER_SEPARATOR),
        ]
        .join(SEPARATOR)
    }

    fn decode_variant(encoded: &str) -> Result<CodedVariant, Error> {
        let split: Vec<&str> = encoded.split(SEPARATOR).collect();
        if split.len() != 4 {
            return Err(Error::MalformedCoded {
                kind: "encoded variant",
                value: encoded.to_string(),
                expected: "{id}__{parentalOrigin}__{conseqType}__{popFreqs}",
            });
        }
        Ok(CodedVariant {
            id: split[0].to_string(),
            knockout_type: KnockoutType::CompHet.to_string(),
            parental_origin: split[1].to_string(),
            consequence_types: split_inner(split[2]).collect(),
            population_frequencies: split[3].split(INNER_SEPARATOR).map(|s| s.to_string()).collect(),
            ..Default::default()
        })
    }
}
