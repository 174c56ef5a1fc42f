//! Structured queries and their compilation into native engine filters.

use indexmap::IndexMap;

pub mod compound;
pub mod parser;

pub use parser::{CompHetPostFilter, RgaQueryParser};

/// Error type for query compilation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Codec(#[from] crate::rga::codec::Error),
    #[error("compound filter expansion is empty")]
    EmptyCompoundFilter,
}

/// Parameters of a structured query.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum QueryParam {
    SampleId,
    IndividualId,
    Sex,
    Phenotypes,
    Disorders,
    NumParents,
    GeneId,
    GeneName,
    GeneBiotype,
    Chromosome,
    Start,
    End,
    TranscriptId,
    TranscriptBiotype,
    Variants,
    DbSnps,
    Knockout,
    Filter,
    Type,
    ConsequenceType,
    ClinicalSignificance,
    PopulationFrequency,
}

/// Mode for building the compound heterozygous branch of compound filters.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CompHetQueryMode {
    /// Match single compound heterozygous variants.
    #[default]
    Single,
    /// Match pairs of compound heterozygous variants.
    Pair,
}

/// A structured query, mapping parameters to their raw values.
///
/// Values are lists separated by `,` (OR) or, for a single value, by `;`
/// (AND).  Population frequency expressions are separated by `;`.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RgaQuery(IndexMap<QueryParam, String>);

impl RgaQuery {
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|value| value.trim().is_empty())
    }

    pub fn contains(&self, param: QueryParam) -> bool {
        self.get(param).is_some()
    }

    /// The raw value of `param`, if non-empty.
    pub fn get(&self, param: QueryParam) -> Option<&str> {
        self.0
            .get(&param)
            .map(|value| value.as_str())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn set(&mut self, param: QueryParam, value: &str) {
        self.0.insert(param, value.to_string());
    }

    /// Set `param` to the `,`-joined `values`.
    pub fn set_list<S: AsRef<str>>(&mut self, param: QueryParam, values: &[S]) {
        let value = values.iter().map(|v| v.as_ref()).collect::<Vec<_>>().join(",");
        self.0.insert(param, value);
    }

    pub fn remove(&mut self, param: QueryParam) {
        self.0.shift_remove(&param);
    }

    /// The values of `param` split on its list separator.
    pub fn values(&self, param: QueryParam) -> Vec<String> {
        let separator = if param == QueryParam::PopulationFrequency {
            ';'
        } else {
            ','
        };
        self.values_split(param, separator)
    }

    /// The values of `param` split on `separator`.
    pub fn values_split(&self, param: QueryParam, separator: char) -> Vec<String> {
        self.get(param)
            .map(|value| {
                value
                    .split(separator)
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(|v| v.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QueryParam, &String)> {
        self.0.iter()
    }
}

impl FromIterator<(QueryParam, String)> for RgaQuery {
    fn from_iter<T: IntoIterator<Item = (QueryParam, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Paging and projection options of a query.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    /// Output fields to include.
    pub include: Vec<String>,
    /// Output fields to exclude.
    pub exclude: Vec<String>,
    /// Maximal number of results; the configured default if unset.
    pub limit: Option<usize>,
    pub skip: usize,
    /// Whether to compute the number of matches.
    pub count: bool,
    /// Number of individuals to skip per gene or variant.
    pub individual_skip: usize,
    /// Maximal number of individuals per gene or variant.
    pub individual_limit: Option<usize>,
    /// Individuals that are always returned per gene or variant.
    pub include_individuals: Vec<String>,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn query_from_json() -> Result<(), anyhow::Error> {
        let query: RgaQuery = serde_json::from_str(
            r#"{"geneName": "BRCA1,BRCA2", "populationFrequency": "1kG_phase3<0.01;GNOMAD_GENOMES<0.01", "sex": ""}"#,
        )?;
        assert_eq!(
            query.values(QueryParam::GeneName),
            vec!["BRCA1".to_string(), "BRCA2".to_string()]
        );
        assert_eq!(query.values(QueryParam::PopulationFrequency).len(), 2);
        assert!(!query.contains(QueryParam::Sex));
        assert!(query.values(QueryParam::Sex).is_empty());
        assert!(!query.is_empty());
        Ok(())
    }

    #[test]
    fn query_set_and_remove() {
        let mut query = RgaQuery::default();
        assert!(query.is_empty());
        query.set_list(QueryParam::SampleId, &["S1", "S2"]);
        assert_eq!(query.get(QueryParam::SampleId), Some("S1,S2"));
        query.remove(QueryParam::SampleId);
        assert!(query.is_empty());
    }

    #[test]
    fn options_defaults() -> Result<(), anyhow::Error> {
        let options: QueryOptions = serde_json::from_str(r#"{"limit": 5, "count": true}"#)?;
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.skip, 0);
        assert!(options.count);
        assert!(options.include.is_empty());
        Ok(())
    }
}
