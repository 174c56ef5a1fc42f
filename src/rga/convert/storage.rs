//! Conversion of individual-centric domain objects into flat records.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};

use crate::rga::codec::coded::{CodedChPairVariants, CodedIndividual, CodedVariant};
use crate::rga::codec::{
    cartesian_combinations, comp_het_combinations, so_accession, token_group, Codec, KnockoutType,
    NOT_PASS, PASS, POP_FREQ_STUDIES,
};
use crate::rga::model::record::{fields, RgaRecord};
use crate::rga::model::{
    KnockoutByIndividual, KnockoutGene, KnockoutTranscript, KnockoutVariant, OntologyTerm,
};

/// Tokens of one variant as used for the compound filters.
#[derive(Debug, Clone)]
struct VariantTokens {
    knockout_type: KnockoutType,
    filter: String,
    consequence_types: BTreeSet<String>,
    /// One token per population study, in study order.
    population_frequencies: Vec<String>,
}

impl VariantTokens {
    /// `[[KO], [F], [CTs], [PFs]]`, positioned as in [`token_group`].
    fn groups(&self) -> Vec<Vec<String>> {
        let mut groups = vec![Vec::new(); token_group::COUNT];
        groups[token_group::KNOCKOUT_TYPE] = vec![self.knockout_type.token().to_string()];
        groups[token_group::FILTER] = vec![self.filter.clone()];
        groups[token_group::CONSEQUENCE_TYPE] = self.consequence_types.iter().cloned().collect();
        groups[token_group::POPULATION_FREQUENCY] = self.population_frequencies.clone();
        groups
    }
}

/// Converts individuals into one flat record per gene and transcript.
#[derive(Debug, Clone, derive_new::new)]
pub struct StorageConverter<'a> {
    codec: &'a Codec,
}

impl<'a> StorageConverter<'a> {
    /// Convert `individuals`, skipping the ones that fail to convert.
    pub fn convert(&self, individuals: &[KnockoutByIndividual]) -> Vec<RgaRecord> {
        let mut result = Vec::new();
        for individual in individuals {
            match self.convert_individual(individual) {
                Ok(records) => result.extend(records),
                Err(e) => tracing::warn!("skipping individual {}: {}", &individual.id, e),
            }
        }
        result
    }

    /// Records of one individual.
    pub fn convert_individual(
        &self,
        individual: &KnockoutByIndividual,
    ) -> Result<Vec<RgaRecord>, anyhow::Error> {
        if individual.id.is_empty() || individual.sample_id.is_empty() {
            anyhow::bail!("missing individual or sample id");
        }

        let template = RgaRecord {
            individual_id: individual.id.clone(),
            sample_id: individual.sample_id.clone(),
            sex: if individual.sex.is_empty() {
                "UNKNOWN".to_string()
            } else {
                individual.sex.clone()
            },
            phenotypes: term_ids_and_names(&individual.phenotypes),
            disorders: term_ids_and_names(&individual.disorders),
            father_id: individual.father_id.clone(),
            mother_id: individual.mother_id.clone(),
            father_sample_id: individual.father_sample_id.clone(),
            mother_sample_id: individual.mother_sample_id.clone(),
            num_parents: individual.num_parents(),
            phenotype_json: terms_json(&individual.phenotypes)?,
            disorder_json: terms_json(&individual.disorders)?,
            ..Default::default()
        };

        let mut result = Vec::new();
        for gene in &individual.genes {
            for transcript in &gene.transcripts {
                if let Some(record) = self.convert_transcript(&template, gene, transcript)? {
                    result.push(record);
                }
            }
        }
        Ok(result)
    }

    fn convert_transcript(
        &self,
        template: &RgaRecord,
        gene: &KnockoutGene,
        transcript: &KnockoutTranscript,
    ) -> Result<Option<RgaRecord>, anyhow::Error> {
        let variants = retained_variants(template, transcript);
        if variants.is_empty() {
            tracing::warn!(
                "skipping transcript {} of {} without variants",
                &transcript.id,
                &template.sample_id
            );
            return Ok(None);
        }

        let mut record = RgaRecord {
            id: format!("{}_{}_{}", &template.sample_id, &gene.id, &transcript.id),
            gene_id: gene.id.clone(),
            gene_name: gene.name.clone(),
            gene_biotype: gene.biotype.clone(),
            chromosome: gene.chromosome.clone(),
            strand: gene.strand.clone(),
            start: gene.start,
            end: gene.end,
            transcript_id: transcript.id.clone(),
            transcript_biotype: transcript.biotype.clone(),
            ..template.clone()
        };

        let mut consequence_types = BTreeSet::new();
        let mut clinical_significances = BTreeSet::new();
        let mut population_frequencies: IndexMap<String, IndexSet<String>> = POP_FREQ_STUDIES
            .iter()
            .map(|study| (format!("{}{}", fields::POPULATION_FREQUENCIES, study), IndexSet::new()))
            .collect();
        let mut compound_filters = BTreeSet::new();
        let mut comp_het = Vec::new();
        let mut individual_summary = BTreeSet::new();

        for variant in &variants {
            let tokens = self.variant_tokens(variant)?;

            record.variants.push(variant.id.clone());
            record.types.push(variant.type_.clone());
            record.knockout_types.push(tokens.knockout_type.to_string());
            record.filters.push(self.codec.decode(&tokens.filter)?);
            record.db_snps.push(variant.db_snp.clone());
            for token in &tokens.consequence_types {
                consequence_types.insert(so_accession(token.parse::<u32>()?));
            }
            clinical_significances.extend(variant.clinical_significance.iter().cloned());
            for (values, token) in population_frequencies
                .values_mut()
                .zip(tokens.population_frequencies.iter())
            {
                values.insert(token.clone());
            }

            let coded = CodedVariant::new(
                transcript.id.clone(),
                variant.id.clone(),
                variant.db_snp.clone(),
                variant.type_.clone(),
                tokens.knockout_type.to_string(),
                variant.parental_origin.clone(),
                variant.clinical_significance.clone(),
                tokens.consequence_types.clone(),
                tokens.population_frequencies.clone(),
            );
            record.variant_summary.push(coded.encoded_id());
            individual_summary.insert(
                CodedIndividual::new(
                    template.individual_id.clone(),
                    variant.type_.clone(),
                    tokens.knockout_type.to_string(),
                    tokens.consequence_types.clone(),
                    tokens.population_frequencies.clone(),
                    template.num_parents as u8,
                )
                .encoded_id(),
            );

            compound_filters.extend(cartesian_combinations(&tokens.groups()));
            if tokens.knockout_type == KnockoutType::CompHet {
                comp_het.push((coded, tokens));
            }
        }

        let groups = comp_het.iter().map(|(_, tokens)| tokens.groups()).collect::<Vec<_>>();
        compound_filters.extend(comp_het_combinations(&groups)?);
        for (i, (first, _)) in comp_het.iter().enumerate() {
            for (second, _) in comp_het.iter().skip(i + 1) {
                record
                    .ch_pairs
                    .push(CodedChPairVariants::new(first.clone(), second.clone()).encoded_id());
            }
        }

        record.consequence_types = consequence_types.into_iter().collect();
        record.clinical_significances = clinical_significances.into_iter().collect();
        record.population_frequencies = population_frequencies
            .into_iter()
            .map(|(key, values)| (key, values.into_iter().collect()))
            .collect();
        record.compound_filters = compound_filters.into_iter().collect();
        record.individual_summary = individual_summary.into_iter().collect();
        Ok(Some(record))
    }

    fn variant_tokens(&self, variant: &KnockoutVariant) -> Result<VariantTokens, anyhow::Error> {
        let knockout_type = variant
            .knockout_type
            .ok_or_else(|| anyhow::anyhow!("variant {} has no knockout type", &variant.id))?;
        let filter = if variant.filter.eq_ignore_ascii_case(PASS) {
            self.codec.encode(PASS)?
        } else {
            self.codec.encode(NOT_PASS)?
        };

        let mut consequence_types = BTreeSet::new();
        for term in &variant.sequence_ontology_terms {
            let token = self
                .codec
                .consequence_type_token(&term.name)
                .or_else(|_| self.codec.consequence_type_token(&term.accession))?;
            consequence_types.insert(token);
        }

        let mut population_frequencies = Vec::new();
        for study in POP_FREQ_STUDIES {
            let freq = variant
                .population_frequencies
                .iter()
                .filter(|pf| pf.population == "ALL" && pf.study.eq_ignore_ascii_case(study))
                .last()
                .map(|pf| pf.alt_allele_freq)
                .unwrap_or_default();
            population_frequencies.push(self.codec.population_frequency_token(study, freq)?);
        }

        Ok(VariantTokens {
            knockout_type,
            filter,
            consequence_types,
            population_frequencies,
        })
    }
}

/// Variants of `transcript` to persist; a lone CH variant is dropped.
fn retained_variants(template: &RgaRecord, transcript: &KnockoutTranscript) -> Vec<KnockoutVariant> {
    let is_comp_het = |v: &KnockoutVariant| v.knockout_type == Some(KnockoutType::CompHet);
    let num_comp_het = transcript.variants.iter().filter(|v| is_comp_het(v)).count();
    if num_comp_het == 1 {
        tracing::warn!(
            "dropping isolated CH variant of transcript {} in {}",
            &transcript.id,
            &template.sample_id
        );
        transcript
            .variants
            .iter()
            .filter(|v| !is_comp_het(v))
            .cloned()
            .collect()
    } else {
        transcript.variants.clone()
    }
}

fn term_ids_and_names(terms: &[OntologyTerm]) -> Vec<String> {
    let mut result = IndexSet::new();
    for term in terms {
        for value in [&term.id, &term.name] {
            if !value.is_empty() {
                result.insert(value.clone());
            }
        }
    }
    result.into_iter().collect()
}

fn terms_json(terms: &[OntologyTerm]) -> Result<Vec<String>, anyhow::Error> {
    terms
        .iter()
        .map(|term| serde_json::to_string(term).map_err(anyhow::Error::from))
        .collect()
}
