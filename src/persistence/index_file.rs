//! `index.json`: tags and checkpoint offsets
//!
//! Rewritten in full on every change through a temporary file and a rename,
//! so a crash leaves either the old or the new index on disk.

use super::wal::LogResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const INDEX_FILE_NAME: &str = "index.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub version: u64,
    /// Byte offset of the version's record in the commit log
    pub offset: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFile {
    #[serde(default)]
    pub tags: BTreeMap<String, u64>,
    #[serde(default)]
    pub checkpoints: Vec<CheckpointEntry>,
}

impl IndexFile {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE_NAME)
    }

    /// Load the index, or an empty one if the file does not exist
    pub fn load(dir: &Path) -> LogResult<Self> {
        let path = Self::path(dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, dir: &Path) -> LogResult<()> {
        let path = Self::path(dir);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(self)?;
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
