//! On-disk memoization of aggregate results.
//!
//! A slot is identified by the input paths and the progression config. The
//! manifest next to each cached table records the size and modification
//! time of every input; a slot whose inputs changed is dropped on lookup.

use crate::config::ProgressionConfig;
use crate::{Result, loader};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputStamp {
    pub path: PathBuf,
    pub size: u64,
    pub modified_nanos: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub inputs: Vec<InputStamp>,
    pub config: ProgressionConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    slot: String,
    fingerprint: Fingerprint,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    fingerprint: Fingerprint,
    rows: usize,
    created_at: DateTime<Utc>,
}

impl CacheKey {
    /// Builds the key from the current state of `inputs` on disk.
    pub fn for_inputs(inputs: &[&Path], config: &ProgressionConfig) -> Result<Self> {
        let mut stamps = Vec::with_capacity(inputs.len());
        for input in inputs {
            let path = fs::canonicalize(input)?;
            let metadata = fs::metadata(&path)?;
            let modified_nanos = metadata
                .modified()?
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            stamps.push(InputStamp {
                path,
                size: metadata.len(),
                modified_nanos,
            });
        }

        let mut hasher = DefaultHasher::new();
        for stamp in &stamps {
            stamp.path.hash(&mut hasher);
        }
        for value in [
            config.goal_x,
            config.goal_y,
            config.min_progression_ratio,
            config.min_start_distance,
        ] {
            value.to_bits().hash(&mut hasher);
        }

        Ok(Self {
            slot: format!("{:016x}", hasher.finish()),
            fingerprint: Fingerprint {
                inputs: stamps,
                config: *config,
            },
        })
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }
}

pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn table_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.parquet", key.slot))
    }

    fn manifest_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.slot))
    }

    /// Cached table for `key`, if its inputs are unchanged since it was stored.
    pub fn get(&self, key: &CacheKey) -> Result<Option<DataFrame>> {
        let manifest_path = self.manifest_path(key);
        if !manifest_path.exists() {
            debug!(slot = key.slot(), "Cache miss");
            return Ok(None);
        }

        let contents = fs::read_to_string(&manifest_path)?;
        let manifest: Option<Manifest> = serde_json::from_str(&contents).ok();
        let Some(manifest) = manifest.filter(|m| m.fingerprint == key.fingerprint) else {
            info!(slot = key.slot(), "Inputs changed, invalidating cached result");
            self.invalidate(key)?;
            return Ok(None);
        };

        let table_path = self.table_path(key);
        if !table_path.exists() {
            self.invalidate(key)?;
            return Ok(None);
        }

        let table = loader::load_table(&table_path)?;
        info!(
            slot = key.slot(),
            rows = manifest.rows,
            created_at = %manifest.created_at.to_rfc3339(),
            "Using cached result"
        );
        Ok(Some(table))
    }

    pub fn put(&self, key: &CacheKey, table: &mut DataFrame) -> Result<()> {
        let mut file = File::create(self.table_path(key))?;
        ParquetWriter::new(&mut file).finish(table)?;

        let manifest = Manifest {
            fingerprint: key.fingerprint.clone(),
            rows: table.height(),
            created_at: Utc::now(),
        };
        fs::write(self.manifest_path(key), serde_json::to_vec_pretty(&manifest)?)?;
        debug!(slot = key.slot(), rows = table.height(), "Stored result");
        Ok(())
    }

    pub fn invalidate(&self, key: &CacheKey) -> Result<()> {
        for path in [self.table_path(key), self.manifest_path(key)] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
