//! The flat record indexed in the search engine.
//!
//! One record describes one individual-gene-transcript triple.  The variants
//! knocking out the transcript are stored as parallel lists, i.e., index `i`
//! of `variants`, `types`, `knockoutTypes`, `filters` and `dbSnps` describes
//! the same variant.

use indexmap::IndexMap;

/// Names of the fields of [`RgaRecord`].
pub mod fields {
    pub const ID: &str = "id";
    pub const INDIVIDUAL_ID: &str = "individualId";
    pub const SAMPLE_ID: &str = "sampleId";
    pub const SEX: &str = "sex";
    pub const PHENOTYPES: &str = "phenotypes";
    pub const DISORDERS: &str = "disorders";
    pub const FATHER_ID: &str = "fatherId";
    pub const MOTHER_ID: &str = "motherId";
    pub const FATHER_SAMPLE_ID: &str = "fatherSampleId";
    pub const MOTHER_SAMPLE_ID: &str = "motherSampleId";
    pub const NUM_PARENTS: &str = "numParents";
    pub const GENE_ID: &str = "geneId";
    pub const GENE_NAME: &str = "geneName";
    pub const GENE_BIOTYPE: &str = "geneBiotype";
    pub const CHROMOSOME: &str = "chromosome";
    pub const STRAND: &str = "strand";
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const TRANSCRIPT_ID: &str = "transcriptId";
    pub const TRANSCRIPT_BIOTYPE: &str = "transcriptBiotype";
    pub const VARIANTS: &str = "variants";
    pub const TYPES: &str = "types";
    pub const KNOCKOUT_TYPES: &str = "knockoutTypes";
    pub const FILTERS: &str = "filters";
    pub const CONSEQUENCE_TYPES: &str = "consequenceTypes";
    pub const CLINICAL_SIGNIFICANCES: &str = "clinicalSignificances";
    pub const DB_SNPS: &str = "dbSnps";
    /// Prefix of the per-study population frequency fields.
    pub const POPULATION_FREQUENCIES: &str = "popFreqs__";
    pub const COMPOUND_FILTERS: &str = "compoundFilters";
    pub const CH_PAIRS: &str = "chPairs";
    pub const PHENOTYPE_JSON: &str = "phenotypeJson";
    pub const DISORDER_JSON: &str = "disorderJson";
    pub const VARIANT_SUMMARY: &str = "variantSummary";
    pub const INDIVIDUAL_SUMMARY: &str = "individualSummary";

    /// All fields, with the population frequencies given by their prefix.
    pub const ALL: &[&str] = &[
        ID,
        INDIVIDUAL_ID,
        SAMPLE_ID,
        SEX,
        PHENOTYPES,
        DISORDERS,
        FATHER_ID,
        MOTHER_ID,
        FATHER_SAMPLE_ID,
        MOTHER_SAMPLE_ID,
        NUM_PARENTS,
        GENE_ID,
        GENE_NAME,
        GENE_BIOTYPE,
        CHROMOSOME,
        STRAND,
        START,
        END,
        TRANSCRIPT_ID,
        TRANSCRIPT_BIOTYPE,
        VARIANTS,
        TYPES,
        KNOCKOUT_TYPES,
        FILTERS,
        CONSEQUENCE_TYPES,
        CLINICAL_SIGNIFICANCES,
        DB_SNPS,
        POPULATION_FREQUENCIES,
        COMPOUND_FILTERS,
        CH_PAIRS,
        PHENOTYPE_JSON,
        DISORDER_JSON,
        VARIANT_SUMMARY,
        INDIVIDUAL_SUMMARY,
    ];
}

/// Flat, denormalized record for one individual, gene and transcript.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RgaRecord {
    /// `{sampleId}_{geneId}_{transcriptId}`
    pub id: String,
    pub individual_id: String,
    pub sample_id: String,
    pub sex: String,
    /// Phenotype ids and names.
    pub phenotypes: Vec<String>,
    /// Disorder ids and names.
    pub disorders: Vec<String>,
    pub father_id: String,
    pub mother_id: String,
    pub father_sample_id: String,
    pub mother_sample_id: String,
    pub num_parents: i32,
    pub gene_id: String,
    pub gene_name: String,
    pub gene_biotype: String,
    pub chromosome: String,
    pub strand: String,
    pub start: i32,
    pub end: i32,
    pub transcript_id: String,
    pub transcript_biotype: String,
    pub variants: Vec<String>,
    pub types: Vec<String>,
    pub knockout_types: Vec<String>,
    pub filters: Vec<String>,
    /// Union of the consequence types of all variants as `SO:0000000`.
    pub consequence_types: Vec<String>,
    pub clinical_significances: Vec<String>,
    pub db_snps: Vec<String>,
    /// Population frequency tokens keyed by `popFreqs__{study}`.
    #[serde(flatten)]
    pub population_frequencies: IndexMap<String, Vec<String>>,
    pub compound_filters: Vec<String>,
    pub ch_pairs: Vec<String>,
    pub phenotype_json: Vec<String>,
    pub disorder_json: Vec<String>,
    pub variant_summary: Vec<String>,
    pub individual_summary: Vec<String>,
}

impl RgaRecord {
    /// Values of the field `name` as strings.
    ///
    /// Unknown fields have no values.
    pub fn field_values(&self, name: &str) -> Vec<String> {
        let one = |value: &String| vec![value.clone()];
        match name {
            fields::ID => one(&self.id),
            fields::INDIVIDUAL_ID => one(&self.individual_id),
            fields::SAMPLE_ID => one(&self.sample_id),
            fields::SEX => one(&self.sex),
            fields::PHENOTYPES => self.phenotypes.clone(),
            fields::DISORDERS => self.disorders.clone(),
            fields::FATHER_ID => one(&self.father_id),
            fields::MOTHER_ID => one(&self.mother_id),
            fields::FATHER_SAMPLE_ID => one(&self.father_sample_id),
            fields::MOTHER_SAMPLE_ID => one(&self.mother_sample_id),
            fields::NUM_PARENTS => vec![self.num_parents.to_string()],
            fields::GENE_ID => one(&self.gene_id),
            fields::GENE_NAME => one(&self.gene_name),
            fields::GENE_BIOTYPE => one(&self.gene_biotype),
            fields::CHROMOSOME => one(&self.chromosome),
            fields::STRAND => one(&self.strand),
            fields::START => vec![self.start.to_string()],
            fields::END => vec![self.end.to_string()],
            fields::TRANSCRIPT_ID => one(&self.transcript_id),
            fields::TRANSCRIPT_BIOTYPE => one(&self.transcript_biotype),
            fields::VARIANTS => self.variants.clone(),
            fields::TYPES => self.types.clone(),
            fields::KNOCKOUT_TYPES => self.knockout_types.clone(),
            fields::FILTERS => self.filters.clone(),
            fields::CONSEQUENCE_TYPES => self.consequence_types.clone(),
            fields::CLINICAL_SIGNIFICANCES => self.clinical_significances.clone(),
            fields::DB_SNPS => self.db_snps.clone(),
            fields::COMPOUND_FILTERS => self.compound_filters.clone(),
            fields::CH_PAIRS => self.ch_pairs.clone(),
            fields::PHENOTYPE_JSON => self.phenotype_json.clone(),
            fields::DISORDER_JSON => self.disorder_json.clone(),
            fields::VARIANT_SUMMARY => self.variant_summary.clone(),
            fields::INDIVIDUAL_SUMMARY => self.individual_summary.clone(),
            _ => self
                .population_frequencies
                .get(name)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Copy of the record with only the fields in `names`.
    ///
    /// An empty `names` keeps all fields.  The population frequency prefix
    /// keeps all population frequency fields.
    pub fn project(&self, names: &[String]) -> Result<Self, anyhow::Error> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        let value = serde_json::to_value(self)?;
        let projected = match value {
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.into_iter()
                    .filter(|(key, _)| {
                        names.iter().any(|name| {
                            name == key
                                || (name == fields::POPULATION_FREQUENCIES
                                    && key.starts_with(fields::POPULATION_FREQUENCIES))
                        })
                    })
                    .collect(),
            ),
            other => other,
        };
        Ok(serde_json::from_value(projected)?)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record() -> RgaRecord {
        RgaRecord {
            id: "S1_G1_T1".into(),
            individual_id: "I1".into(),
            sample_id: "S1".into(),
            num_parents: 2,
            gene_id: "G1".into(),
            transcript_id: "T1".into(),
            variants: vec!["1:100:A:G".into(), "1:200:C:T".into()],
            knockout_types: vec!["COMP_HET".into(), "COMP_HET".into()],
            population_frequencies: [("popFreqs__GNOMAD_GENOMES".to_string(), vec!["P2-1".to_string()])]
                .into_iter()
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn field_values() {
        let record = record();
        assert_eq!(record.field_values(fields::SAMPLE_ID), vec!["S1".to_string()]);
        assert_eq!(record.field_values(fields::NUM_PARENTS), vec!["2".to_string()]);
        assert_eq!(record.field_values(fields::VARIANTS).len(), 2);
        assert_eq!(
            record.field_values("popFreqs__GNOMAD_GENOMES"),
            vec!["P2-1".to_string()]
        );
        assert!(record.field_values("unknown").is_empty());
    }

    #[test]
    fn project() -> Result<(), anyhow::Error> {
        let record = record();
        let projected = record.project(&[
            fields::SAMPLE_ID.to_string(),
            fields::POPULATION_FREQUENCIES.to_string(),
        ])?;
        assert_eq!(projected.sample_id, "S1");
        assert_eq!(projected.individual_id, "");
        assert!(projected.variants.is_empty());
        assert_eq!(projected.population_frequencies.len(), 1);
        assert_eq!(record.project(&[])?, record);
        Ok(())
    }

    #[test]
    fn json_round_trip_keeps_population_frequencies() -> Result<(), anyhow::Error> {
        let json = serde_json::to_string(&record())?;
        assert!(json.contains(r#""popFreqs__GNOMAD_GENOMES":["P2-1"]"#));
        let parsed: RgaRecord = serde_json::from_str(&json)?;
        assert_eq!(parsed, record());
        Ok(())
    }
}
