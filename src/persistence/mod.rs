//! Persistence layer for Versa
//!
//! A data directory holds two files:
//! - `commits.log`: append-only commit log, replayed on open
//! - `index.json`: tag bindings and checkpoint offsets

pub mod index_file;
pub mod record;
pub mod wal;

pub use index_file::{CheckpointEntry, IndexFile};
pub use record::{StoredCommit, StoredOperation, StoredQuad, StoredTerm};
pub use wal::{CommitLog, LogError, LogResult};

use crate::versioning::{Version, VersionId};
use std::path::{Path, PathBuf};
use tracing::info;

/// State read back from a data directory
#[derive(Debug, Default)]
pub struct Recovered {
    /// Versions in id order
    pub versions: Vec<Version>,
    /// Log offset of each version's record, parallel to `versions`
    pub offsets: Vec<u64>,
    pub tags: Vec<(String, VersionId)>,
}

/// Owns the commit log and the index file of one data directory
pub struct PersistenceManager {
    /// Base path for all data
    base_path: PathBuf,
    log: CommitLog,
    index: IndexFile,
}

impl PersistenceManager {
    /// Open a data directory, creating it if needed
    pub fn new(base_path: impl AsRef<Path>, sync_writes: bool) -> LogResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;

        info!("Initializing persistence at: {:?}", base_path);

        let log = CommitLog::open(&base_path, sync_writes)?;
        let index = IndexFile::load(&base_path)?;

        Ok(Self {
            base_path,
            log,
            index,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Replay the commit log and read the tag table
    ///
    /// The checkpoint table is not read back: replay rebuilds it, and the
    /// caller rewrites it with `save_checkpoints`.
    pub fn recover(&self) -> LogResult<Recovered> {
        let mut recovered = Recovered::default();
        self.log.replay(|offset, stored| {
            recovered.versions.push(Version::try_from(stored)?);
            recovered.offsets.push(offset);
            Ok(())
        })?;

        for (name, version) in &self.index.tags {
            recovered
                .tags
                .push((name.clone(), VersionId::new(*version)));
        }

        info!(
            "Recovered {} versions, {} tags",
            recovered.versions.len(),
            recovered.tags.len()
        );
        Ok(recovered)
    }

    /// Append a committed version to the log, returning its offset
    pub fn persist_commit(&mut self, version: &Version) -> LogResult<u64> {
        self.log.append(StoredCommit::from(version))
    }

    /// Rewrite the tag table
    pub fn save_tags(&mut self, tags: &[(String, VersionId)]) -> LogResult<()> {
        let mut index = self.index.clone();
        index.tags = tags.iter().map(|(n, v)| (n.clone(), v.as_u64())).collect();
        index.save(&self.base_path)?;
        self.index = index;
        Ok(())
    }

    /// Checkpoint table as last written
    pub fn checkpoints(&self) -> &[CheckpointEntry] {
        &self.index.checkpoints
    }

    /// Rewrite the checkpoint table
    pub fn save_checkpoints(&mut self, checkpoints: Vec<CheckpointEntry>) -> LogResult<()> {
        if checkpoints == self.index.checkpoints {
            return Ok(());
        }
        let mut index = self.index.clone();
        index.checkpoints = checkpoints;
        index.save(&self.base_path)?;
        self.index = index;
        Ok(())
    }

    /// Flush all pending writes
    pub fn flush(&mut self) -> LogResult<()> {
        self.log.flush()
    }
}
