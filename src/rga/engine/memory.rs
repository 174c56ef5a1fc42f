//! In-memory search engine persisting each collection as a JSONL file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::filter::{matches_all, parse_all};
use super::{EngineQuery, FacetBucket, FacetRequest, FacetResult, RecordIter, SearchEngine};
use crate::common::io::{append_json_lines, read_json_lines, write_json_lines};
use crate::rga::model::record::RgaRecord;

/// One collection; records are kept in insertion order.
#[derive(Debug, Default)]
struct Collection {
    records: RwLock<Vec<RgaRecord>>,
}

impl Collection {
    fn snapshot(&self) -> Result<Vec<RgaRecord>, anyhow::Error> {
        Ok(self
            .records
            .read()
            .map_err(|e| anyhow::anyhow!("collection lock poisoned: {}", e))?
            .clone())
    }
}

/// Search engine answering queries by scanning all records of a collection.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    /// Directory with one `{collection}.jsonl` per collection; nothing is
    /// persisted without one.
    path: Option<PathBuf>,
    /// Collection handles by name, populated on first use.
    handles: RwLock<HashMap<String, Arc<Collection>>>,
}

impl MemoryEngine {
    /// Engine without persistence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine persisting its collections below `path`.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    fn collection_path(&self, collection: &str) -> Option<PathBuf> {
        self.path
            .as_ref()
            .map(|path| path.join(format!("{}.jsonl", collection)))
    }

    /// The cached handle of `collection`, loading it from disk on first use.
    fn handle(&self, collection: &str) -> Result<Option<Arc<Collection>>, anyhow::Error> {
        if let Some(handle) = self
            .handles
            .read()
            .map_err(|e| anyhow::anyhow!("handle cache lock poisoned: {}", e))?
            .get(collection)
        {
            return Ok(Some(handle.clone()));
        }

        let Some(path) = self.collection_path(collection).filter(|path| path.exists()) else {
            return Ok(None);
        };
        let records: Vec<RgaRecord> = read_json_lines(&path)?;
        tracing::debug!("loaded {} records of {} from {:?}", records.len(), collection, &path);
        let loaded = Arc::new(Collection {
            records: RwLock::new(records),
        });
        // A concurrent first use may have loaded the collection as well.
        let mut handles = self
            .handles
            .write()
            .map_err(|e| anyhow::anyhow!("handle cache lock poisoned: {}", e))?;
        Ok(Some(
            handles
                .entry(collection.to_string())
                .or_insert(loaded)
                .clone(),
        ))
    }

    fn existing(&self, collection: &str) -> Result<Arc<Collection>, anyhow::Error> {
        self.handle(collection)?
            .ok_or_else(|| anyhow::anyhow!("collection {} does not exist", collection))
    }

    fn persist(&self, collection: &str, records: &[RgaRecord]) -> Result<(), anyhow::Error> {
        if let Some(path) = self.collection_path(collection) {
            write_json_lines(&path, records)?;
        }
        Ok(())
    }

    fn matching(&self, collection: &str, filters: &[String]) -> Result<Vec<RgaRecord>, anyhow::Error> {
        let filters = parse_all(filters)?;
        Ok(self
            .existing(collection)?
            .snapshot()?
            .into_iter()
            .filter(|record| matches_all(&filters, record))
            .collect())
    }
}

impl SearchEngine for MemoryEngine {
    fn is_alive(&self, _collection: &str) -> bool {
        self.path.as_ref().map(|path| path.is_dir()).unwrap_or(true)
    }

    fn exists(&self, collection: &str) -> Result<bool, anyhow::Error> {
        Ok(self.handle(collection)?.is_some())
    }

    fn create(&self, collection: &str) -> Result<(), anyhow::Error> {
        if self.exists(collection)? {
            return Ok(());
        }
        tracing::info!("creating collection {}", collection);
        self.persist(collection, &[])?;
        self.handles
            .write()
            .map_err(|e| anyhow::anyhow!("handle cache lock poisoned: {}", e))?
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    fn insert(&self, collection: &str, records: Vec<RgaRecord>) -> Result<(), anyhow::Error> {
        let handle = self.existing(collection)?;
        let mut current = handle
            .records
            .write()
            .map_err(|e| anyhow::anyhow!("collection lock poisoned: {}", e))?;
        let positions: HashMap<String, usize> = current
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id.clone(), i))
            .collect();
        let num_existing = current.len();
        let mut replaced = false;
        for record in records {
            match positions.get(&record.id) {
                Some(i) => {
                    current[*i] = record;
                    replaced = true;
                }
                None => current.push(record),
            }
        }

        // Only an update of existing records needs the whole file rewritten.
        match self.collection_path(collection) {
            Some(path) if !replaced => append_json_lines(&path, &current[num_existing..]),
            Some(path) => write_json_lines(&path, current.iter()),
            None => Ok(()),
        }
    }

    fn query(&self, collection: &str, query: &EngineQuery) -> Result<RecordIter, anyhow::Error> {
        let records = self
            .matching(collection, &query.filters)?
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|record| record.project(&query.fields))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Box::new(records.into_iter()))
    }

    fn facet(
        &self,
        collection: &str,
        filters: &[String],
        request: &FacetRequest,
    ) -> Result<FacetResult, anyhow::Error> {
        let records = self.matching(collection, filters)?;
        match request {
            FacetRequest::Terms { field, skip, limit } => {
                let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                for record in &records {
                    let values: HashSet<String> = record.field_values(field).into_iter().collect();
                    for value in values {
                        *counts.entry(value).or_default() += 1;
                    }
                }
                Ok(FacetResult {
                    buckets: counts
                        .into_iter()
                        .skip(*skip)
                        .take(limit.unwrap_or(usize::MAX))
                        .map(|(value, count)| FacetBucket::new(value, count))
                        .collect(),
                    aggregation: None,
                })
            }
            FacetRequest::Unique(field) => {
                let values: HashSet<String> = records
                    .iter()
                    .flat_map(|record| record.field_values(field))
                    .collect();
                Ok(FacetResult {
                    buckets: Vec::new(),
                    aggregation: Some(values.len()),
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rga::model::record::fields;

    fn record(id: &str, sample_id: &str, gene_id: &str) -> RgaRecord {
        RgaRecord {
            id: id.into(),
            sample_id: sample_id.into(),
            gene_id: gene_id.into(),
            gene_name: format!("{}-name", gene_id),
            ..Default::default()
        }
    }

    fn ids(records: RecordIter) -> Vec<String> {
        records.map(|record| record.id).collect()
    }

    #[test]
    fn missing_collection() -> Result<(), anyhow::Error> {
        let engine = MemoryEngine::new();
        assert!(engine.is_alive("c"));
        assert!(!engine.exists("c")?);
        assert!(engine.query("c", &EngineQuery::default()).is_err());
        Ok(())
    }

    #[test]
    fn insert_query_and_upsert() -> Result<(), anyhow::Error> {
        let engine = MemoryEngine::new();
        engine.create("c")?;
        engine.insert("c", vec![record("r1", "S1", "G1"), record("r2", "S2", "G1")])?;
        engine.insert("c", vec![record("r3", "S1", "G2"), record("r1", "S1", "G3")])?;

        assert_eq!(ids(engine.query("c", &EngineQuery::default())?), vec!["r1", "r2", "r3"]);
        let query = EngineQuery::new(vec!["sampleId:S1".into()], vec![fields::GENE_ID.into()], Some(1));
        let result = engine.query("c", &query)?.collect::<Vec<_>>();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].gene_id, "G3");
        assert_eq!(result[0].gene_name, "");
        Ok(())
    }

    #[test]
    fn facets() -> Result<(), anyhow::Error> {
        let engine = MemoryEngine::new();
        engine.create("c")?;
        engine.insert(
            "c",
            vec![record("r1", "S2", "G1"), record("r2", "S1", "G1"), record("r3", "S1", "G2")],
        )?;

        let terms = engine.facet(
            "c",
            &[],
            &FacetRequest::Terms {
                field: fields::SAMPLE_ID.into(),
                skip: 0,
                limit: None,
            },
        )?;
        assert_eq!(
            terms.buckets,
            vec![FacetBucket::new("S1".into(), 2), FacetBucket::new("S2".into(), 1)]
        );
        let paged = engine.facet(
            "c",
            &["geneId:G1".into()],
            &FacetRequest::Terms {
                field: fields::SAMPLE_ID.into(),
                skip: 1,
                limit: Some(1),
            },
        )?;
        assert_eq!(paged.values(), vec!["S2".to_string()]);
        let unique = engine.facet("c", &[], &FacetRequest::Unique(fields::GENE_ID.into()))?;
        assert_eq!(unique.aggregation, Some(2));
        Ok(())
    }

    #[test]
    fn persisted_collections_are_reloaded() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        {
            let engine = MemoryEngine::with_path(&*tmp_dir);
            engine.create("rga-rga-study")?;
            engine.insert("rga-rga-study", vec![record("r1", "S1", "G1")])?;
        }
        let engine = MemoryEngine::with_path(&*tmp_dir);
        assert!(engine.is_alive("rga-rga-study"));
        assert!(engine.exists("rga-rga-study")?);
        assert!(!engine.exists("other")?);
        assert_eq!(
            ids(engine.query("rga-rga-study", &EngineQuery::default())?),
            vec!["r1"]
        );
        Ok(())
    }

    #[test]
    fn insert_appends_new_records_and_rewrites_on_update() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("c.jsonl");
        let engine = MemoryEngine::with_path(&*tmp_dir);
        engine.create("c")?;

        engine.insert("c", vec![record("r1", "S1", "G1")])?;
        engine.insert("c", vec![record("r2", "S2", "G1")])?;
        let stored: Vec<RgaRecord> = read_json_lines(&path)?;
        assert_eq!(
            stored.iter().map(|record| record.id.as_str()).collect::<Vec<_>>(),
            vec!["r1", "r2"]
        );

        engine.insert("c", vec![record("r1", "S1", "G3"), record("r3", "S3", "G2")])?;
        let stored: Vec<RgaRecord> = read_json_lines(&path)?;
        assert_eq!(
            stored
                .iter()
                .map(|record| (record.id.as_str(), record.gene_id.as_str()))
                .collect::<Vec<_>>(),
            vec![("r1", "G3"), ("r2", "G1"), ("r3", "G2")]
        );
        Ok(())
    }
}
