//! Checkpointed historical snapshots
//!
//! A full `QuadSet` is cached every `interval` versions. A historical snapshot
//! is rebuilt from whichever known state is closest: a checkpoint at or below
//! the target replayed forward, or a checkpoint (or head) above it replayed
//! backward through the recorded change sets.

use super::log::TransactionLog;
use super::version::VersionId;
use crate::rdf::QuadSet;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct CheckpointCache {
    interval: u64,
    snapshots: BTreeMap<VersionId, Arc<QuadSet>>,
}

impl CheckpointCache {
    /// `interval == 0` disables checkpointing
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            snapshots: BTreeMap::new(),
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn is_due(&self, id: VersionId) -> bool {
        self.interval > 0 && id.as_u64() % self.interval == 0
    }

    pub fn insert(&mut self, id: VersionId, snapshot: Arc<QuadSet>) {
        debug!("Checkpoint cached at version {} ({} quads)", id, snapshot.len());
        self.snapshots.insert(id, snapshot);
    }

    pub fn get(&self, id: VersionId) -> Option<&Arc<QuadSet>> {
        self.snapshots.get(&id)
    }

    /// Checkpointed version ids, ascending
    pub fn versions(&self) -> Vec<VersionId> {
        self.snapshots.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn at_or_below(&self, id: VersionId) -> Option<(VersionId, &Arc<QuadSet>)> {
        self.snapshots.range(..=id).next_back().map(|(v, s)| (*v, s))
    }

    fn at_or_above(&self, id: VersionId) -> Option<(VersionId, &Arc<QuadSet>)> {
        self.snapshots.range(id..).next().map(|(v, s)| (*v, s))
    }

    /// Materialize the snapshot at `target`
    ///
    /// `target` must be a committed version no later than `head_id`, and
    /// `head` must be the snapshot at `head_id`.
    pub fn snapshot_at(
        &self,
        log: &TransactionLog,
        target: VersionId,
        head_id: VersionId,
        head: &Arc<QuadSet>,
    ) -> Arc<QuadSet> {
        if target == head_id {
            return Arc::clone(head);
        }
        if let Some(exact) = self.get(target) {
            return Arc::clone(exact);
        }

        // forward base: nearest checkpoint below, or genesis (version 0)
        let (below_id, below) = match self.at_or_below(target) {
            Some((id, snapshot)) => (id.as_u64(), Some(snapshot)),
            None => (0, None),
        };
        // backward base: nearest checkpoint above, or head
        let (above_id, above) = match self.at_or_above(target) {
            Some((id, snapshot)) if id < head_id => (id, snapshot),
            _ => (head_id, head),
        };

        let forward_cost = target.as_u64() - below_id;
        let backward_cost = above_id.as_u64() - target.as_u64();

        if forward_cost <= backward_cost {
            let mut snapshot = below.map(|s| (**s).clone()).unwrap_or_default();
            let from = (below_id > 0).then(|| VersionId::new(below_id));
            for version in log.range(from, target) {
                snapshot.apply_changes(version.changes());
            }
            Arc::new(snapshot)
        } else {
            let mut snapshot = (**above).clone();
            for version in log.range(Some(target), above_id).iter().rev() {
                snapshot.unapply_changes(version.changes());
            }
            Arc::new(snapshot)
        }
    }
}
