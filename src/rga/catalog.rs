//! Permissions and indexing status of the samples of a study.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Operations consumed from the catalog.
pub trait Catalog: Send + Sync {
    /// Whether `user` may see all samples of `study`.
    fn is_owner_or_admin(&self, study: &str, user: &str) -> Result<bool, anyhow::Error>;

    /// The subset of `sample_ids` that `user` may see, in input order.
    fn authorised_samples(
        &self,
        study: &str,
        sample_ids: &[String],
        user: &str,
    ) -> Result<Vec<String>, anyhow::Error>;

    /// The indexed samples of `study`, sorted.
    fn indexed_samples(&self, study: &str) -> Result<Vec<String>, anyhow::Error>;

    /// Flag `sample_ids` of `study` as indexed.
    fn mark_indexed(&self, study: &str, sample_ids: &[String]) -> Result<(), anyhow::Error>;
}

/// Catalog entries of one study.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StudyEntry {
    /// Users seeing all samples; everybody if empty.
    pub admins: BTreeSet<String>,
    /// Samples visible to the other users.
    pub sample_acl: BTreeMap<String, BTreeSet<String>>,
    pub indexed_samples: BTreeSet<String>,
}

/// Persisted content of the catalog.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CatalogData {
    pub studies: BTreeMap<String, StudyEntry>,
}

/// Catalog kept in memory and optionally persisted as `catalog.json`.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    path: Option<PathBuf>,
    data: RwLock<CatalogData>,
}

impl MemoryCatalog {
    pub fn new(data: CatalogData) -> Self {
        Self {
            path: None,
            data: RwLock::new(data),
        }
    }

    /// Open `catalog.json` in `dir`, starting empty if it does not exist.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, anyhow::Error> {
        let path = dir.as_ref().join("catalog.json");
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)
                .map_err(|e| anyhow::anyhow!("invalid catalog {:?}: {}", &path, e))?
        } else {
            CatalogData::default()
        };
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogData) -> T) -> Result<T, anyhow::Error> {
        let data = self
            .data
            .read()
            .map_err(|e| anyhow::anyhow!("catalog lock poisoned: {}", e))?;
        Ok(f(&data))
    }
}

impl Catalog for MemoryCatalog {
    fn is_owner_or_admin(&self, study: &str, user: &str) -> Result<bool, anyhow::Error> {
        self.read(|data| {
            data.studies
                .get(study)
                .map(|entry| entry.admins.is_empty() || entry.admins.contains(user))
                .unwrap_or(true)
        })
    }

    fn authorised_samples(
        &self,
        study: &str,
        sample_ids: &[String],
        user: &str,
    ) -> Result<Vec<String>, anyhow::Error> {
        if self.is_owner_or_admin(study, user)? {
            return Ok(sample_ids.to_vec());
        }
        self.read(|data| {
            let visible = data
                .studies
                .get(study)
                .and_then(|entry| entry.sample_acl.get(user));
            sample_ids
                .iter()
                .filter(|id| visible.map(|v| v.contains(*id)).unwrap_or(false))
                .cloned()
                .collect()
        })
    }

    fn indexed_samples(&self, study: &str) -> Result<Vec<String>, anyhow::Error> {
        self.read(|data| {
            data.studies
                .get(study)
                .map(|entry| entry.indexed_samples.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    fn mark_indexed(&self, study: &str, sample_ids: &[String]) -> Result<(), anyhow::Error> {
        let mut data = self
            .data
            .write()
            .map_err(|e| anyhow::anyhow!("catalog lock poisoned: {}", e))?;
        data.studies
            .entry(study.to_string())
            .or_default()
            .indexed_samples
            .extend(sample_ids.iter().cloned());
        if let Some(path) = &self.path {
            std::fs::write(path, serde_json::to_string_pretty(&*data)?)?;
        }
        Ok(())
    }
}
