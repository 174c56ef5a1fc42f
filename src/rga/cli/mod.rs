//! Command line interface of the knockout index.
//!
//! The subcommands work on an index directory holding one JSONL file per
//! collection, the variant details of each study and `catalog.json`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::rga::catalog::MemoryCatalog;
use crate::rga::conf::RgaConfig;
use crate::rga::engine::MemoryEngine;
use crate::rga::manager::RgaManager;
use crate::rga::variants::MemoryVariantSource;

pub mod load;
pub mod query;
pub mod summary;

/// A manager over the in-memory index persisted in one directory.
pub struct Index {
    pub manager: RgaManager,
    pub variants: Arc<MemoryVariantSource>,
    /// File holding the variant details of the study.
    pub path_variants: PathBuf,
}

impl Index {
    /// Open the index of `study` in `path_index`, creating the directory.
    pub fn open(
        path_index: &Path,
        study: &str,
        path_config: Option<&Path>,
    ) -> Result<Self, anyhow::Error> {
        let config = RgaConfig::load_or_default(path_config)?;
        std::fs::create_dir_all(path_index)
            .map_err(|e| anyhow::anyhow!("could not create {}: {}", path_index.display(), e))?;

        let path_variants =
            path_index.join(format!("{}-variants.jsonl", config.collection_name(study)));
        let variants = Arc::new(MemoryVariantSource::new());
        variants.load(study, &path_variants)?;

        let manager = RgaManager::new(
            config,
            Arc::new(MemoryEngine::with_path(path_index)),
            Arc::new(MemoryCatalog::open(path_index)?),
            variants.clone(),
        )?;
        Ok(Self {
            manager,
            variants,
            path_variants,
        })
    }
}

/// Write `value` as pretty-printed JSON to `path`, gzip-compressed if the
/// name ends in `.gz`.
pub fn write_output<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), anyhow::Error> {
    let mut writer = crate::common::io::open_write_maybe_gz(path)?;
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rga::manager::test::{individuals, STUDY};

    #[test]
    fn reopen_index() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path_index = tmp_dir.join("index");
        {
            let index = Index::open(&path_index, STUDY, None)?;
            index.variants.add_individuals(STUDY, &individuals())?;
            index.manager.load(STUDY, &individuals())?;
            index.variants.save(STUDY, &index.path_variants)?;
        }

        let index = Index::open(&path_index, STUDY, None)?;
        assert_eq!(index.variants.len(STUDY), 5);
        assert!(index
            .path_variants
            .ends_with("rga-rga-user_project_study-variants.jsonl"));
        Ok(())
    }
}
