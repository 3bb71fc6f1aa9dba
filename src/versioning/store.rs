//! Versioned store facade
//!
//! `VersionedStore` ties the transaction log, version index, checkpoint cache
//! and optional on-disk persistence together behind one thread-safe handle.
//!
//! Locking:
//! - `writer` serializes commits (blocking or fail-fast per config)
//! - `state` is held for reading by lookups and briefly for writing when a
//!   staged commit is applied
//! - `persistence` is only taken while no `state` guard is held, except by
//!   tag changes, which take it first

use super::checkpoint::CheckpointCache;
use super::diff::{CancelToken, Diff};
use super::index::{VersionIndex, VersionRef};
use super::log::{StagedCommit, TransactionLog};
use super::operation::Operation;
use super::transaction::Transaction;
use super::validation::{CommitValidator, LimitsValidator};
use super::version::{Version, VersionId};
use super::{VersionError, VersionResult};
use crate::config::{CommitPolicy, StoreConfig};
use crate::persistence::{CheckpointEntry, PersistenceManager};
use crate::rdf::{Quad, QuadPattern, QuadSet};
use chrono::Utc;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything readers look at, swapped under one lock
#[derive(Debug)]
struct State {
    log: TransactionLog,
    index: VersionIndex,
    /// Materialized snapshot at head
    head: Arc<QuadSet>,
    checkpoints: CheckpointCache,
    /// Log offsets of checkpointed versions (persistent stores only)
    checkpoint_entries: Vec<CheckpointEntry>,
}

impl State {
    fn new(checkpoint_interval: u64) -> Self {
        Self {
            log: TransactionLog::new(),
            index: VersionIndex::new(),
            head: Arc::new(QuadSet::new()),
            checkpoints: CheckpointCache::new(checkpoint_interval),
            checkpoint_entries: Vec::new(),
        }
    }

    /// Append a version and roll the head snapshot forward
    ///
    /// Returns the version and whether a checkpoint was taken.
    fn apply(&mut self, version: Version, offset: Option<u64>) -> VersionResult<(Arc<Version>, bool)> {
        let version = self.log.append(version)?;
        let id = version.id();
        Arc::make_mut(&mut self.head).apply_changes(version.changes());
        self.index.advance(id);

        let due = self.checkpoints.is_due(id);
        if due {
            self.checkpoints.insert(id, Arc::clone(&self.head));
            if let Some(offset) = offset {
                self.checkpoint_entries.push(CheckpointEntry {
                    version: id.as_u64(),
                    offset,
                });
            }
        }
        Ok((version, due))
    }

    fn version(&self, id: VersionId) -> VersionResult<Arc<Version>> {
        self.index.check(id)?;
        self.log
            .get(id)
            .cloned()
            .ok_or(VersionError::UnknownVersion(id))
    }
}

/// Transactional versioned quad store
pub struct VersionedStore {
    config: StoreConfig,
    state: RwLock<State>,
    /// Held for the whole of every commit
    writer: Mutex<()>,
    persistence: Option<Mutex<PersistenceManager>>,
    validators: RwLock<Vec<Arc<dyn CommitValidator>>>,
}

impl VersionedStore {
    /// Open a store described by `config`
    ///
    /// With a `data_path` the commit log is replayed and tags are restored;
    /// otherwise the store starts empty in memory.
    pub fn open(config: StoreConfig) -> VersionResult<Self> {
        config.validate()?;
        let mut state = State::new(config.checkpoint_interval);

        let persistence = match &config.data_path {
            Some(path) => {
                let mut manager = PersistenceManager::new(path, config.sync_writes)?;
                let recovered = manager.recover()?;
                let tag_count = recovered.tags.len();

                for (version, offset) in recovered.versions.into_iter().zip(recovered.offsets) {
                    state.apply(version, Some(offset))?;
                }
                state.index.restore_tags(recovered.tags);

                let tags = state.index.tags();
                if tags.len() != tag_count {
                    manager.save_tags(&tags)?;
                }
                manager.save_checkpoints(state.checkpoint_entries.clone())?;

                info!(
                    "Opened versioned store at {:?}: {} versions, {} tags, {} checkpoints",
                    path,
                    state.log.len(),
                    tags.len(),
                    state.checkpoints.len()
                );
                Some(Mutex::new(manager))
            }
            None => {
                info!("Opened in-memory versioned store");
                None
            }
        };

        let limits: Arc<dyn CommitValidator> =
            Arc::new(LimitsValidator::new(config.max_quads_per_commit));

        Ok(Self {
            config,
            state: RwLock::new(state),
            writer: Mutex::new(()),
            persistence,
            validators: RwLock::new(vec![limits]),
        })
    }

    /// Empty in-memory store with default configuration
    pub fn in_memory() -> Self {
        let config = StoreConfig::in_memory();
        let state = State::new(config.checkpoint_interval);
        Self {
            state: RwLock::new(state),
            writer: Mutex::new(()),
            persistence: None,
            validators: RwLock::new(vec![Arc::new(LimitsValidator::new(None))]),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence.is_some()
    }

    /// Register a validator run on every later commit
    pub fn add_validator(&self, validator: impl CommitValidator + 'static) {
        debug!("Registered commit validator '{}'", validator.name());
        self.validators.write().push(Arc::new(validator));
    }

    // ==================== Commits ====================

    /// Start a transaction against this store
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Commit operations as one new version
    pub fn commit(
        &self,
        operations: Vec<Operation>,
        message: Option<&str>,
    ) -> VersionResult<Arc<Version>> {
        let _writer = self.acquire_writer()?;
        self.commit_locked(operations, message.map(str::to_string))
    }

    /// Take the writer lock according to the configured policy
    pub(crate) fn acquire_writer(&self) -> VersionResult<MutexGuard<'_, ()>> {
        let guard = match (self.config.commit_policy, self.config.commit_timeout_ms) {
            (CommitPolicy::FailFast, _) => self.writer.try_lock(),
            (CommitPolicy::Blocking, Some(ms)) => self.writer.try_lock_for(Duration::from_millis(ms)),
            (CommitPolicy::Blocking, None) => Some(self.writer.lock()),
        };
        guard.ok_or_else(|| {
            debug!("Commit rejected: writer lock busy");
            VersionError::ConcurrencyConflict
        })
    }

    /// Stage, validate, persist, then apply. Caller holds the writer lock.
    pub(crate) fn commit_locked(
        &self,
        operations: Vec<Operation>,
        message: Option<String>,
    ) -> VersionResult<Arc<Version>> {
        let staged = {
            let state = self.state.read();
            state.log.stage(Arc::clone(&state.head), operations, message)
        };
        self.validate(&staged)?;
        let version = staged.into_version(Utc::now());

        let offset = match &self.persistence {
            Some(persistence) => Some(persistence.lock().persist_commit(&version)?),
            None => None,
        };

        let (version, checkpointed, entries) = {
            let mut state = self.state.write();
            let (version, checkpointed) = state.apply(version, offset)?;
            let entries = checkpointed.then(|| state.checkpoint_entries.clone());
            (version, checkpointed, entries)
        };

        if let (Some(persistence), Some(entries)) = (&self.persistence, entries) {
            // the commit itself is durable; a stale checkpoint table is rebuilt on open
            if let Err(e) = persistence.lock().save_checkpoints(entries) {
                warn!("Failed to record checkpoint at version {}: {}", version.id(), e);
            }
        }

        debug!(
            "Committed version {} (+{} -{}){}",
            version.id(),
            version.changes().added_count(),
            version.changes().removed_count(),
            if checkpointed { ", checkpointed" } else { "" }
        );
        Ok(version)
    }

    fn validate(&self, staged: &StagedCommit) -> VersionResult<()> {
        let validators = self.validators.read().clone();
        for validator in validators {
            if let Err(reason) = validator.validate(staged) {
                warn!("Commit {} rejected by '{}': {}", staged.id(), validator.name(), reason);
                return Err(VersionError::ValidationFailure(format!(
                    "{}: {}",
                    validator.name(),
                    reason
                )));
            }
        }
        Ok(())
    }

    // ==================== Version lookup ====================

    /// Latest version, `None` on an empty store
    pub fn head(&self) -> Option<Arc<Version>> {
        let state = self.state.read();
        state.index.head().and_then(|id| state.log.get(id).cloned())
    }

    pub fn head_id(&self) -> Option<VersionId> {
        self.state.read().index.head()
    }

    /// Number of committed versions
    pub fn version_count(&self) -> usize {
        self.state.read().log.len()
    }

    pub fn at(&self, id: VersionId) -> VersionResult<Arc<Version>> {
        self.state.read().version(id)
    }

    /// Version bound to a tag
    pub fn resolve(&self, tag: &str) -> VersionResult<Arc<Version>> {
        let state = self.state.read();
        let id = state.index.resolve(tag)?;
        state.version(id)
    }

    /// Walk `offset` versions from `id` (negative = older)
    pub fn relative(&self, id: VersionId, offset: i64) -> VersionResult<Arc<Version>> {
        let state = self.state.read();
        let target = state.index.relative(id, offset)?;
        state.version(target)
    }

    /// Resolve `HEAD`, `HEAD~N`, `HEAD^`, a version number or a tag name
    pub fn resolve_ref(&self, reference: &str) -> VersionResult<Arc<Version>> {
        let reference: VersionRef = reference.parse()?;
        let state = self.state.read();
        let id = state.index.resolve_ref(&reference)?;
        state.version(id)
    }

    pub(crate) fn version(&self, id: VersionId) -> Option<Arc<Version>> {
        self.state.read().log.get(id).cloned()
    }

    // ==================== Snapshots ====================

    /// Quad set at head (empty before the first commit)
    pub fn snapshot(&self) -> Arc<QuadSet> {
        Arc::clone(&self.state.read().head)
    }

    /// Quad set as of version `id`
    pub fn snapshot_at(&self, id: VersionId) -> VersionResult<Arc<QuadSet>> {
        let state = self.state.read();
        let id = state.index.check(id)?;
        let head_id = state.index.head().ok_or(VersionError::EmptyHistory)?;
        Ok(state.checkpoints.snapshot_at(&state.log, id, head_id, &state.head))
    }

    /// Match a pattern against head
    pub fn query(&self, pattern: &QuadPattern) -> Vec<Quad> {
        self.snapshot().query(pattern)
    }

    // ==================== Diff ====================

    /// Net change from `from` to `to`; `from` must not be after `to`
    pub fn diff(&self, from: VersionId, to: VersionId) -> VersionResult<Diff> {
        let versions = self.range(from, to)?;
        Diff::between(&versions, None)
    }

    /// Net change from `from` to `to` in either direction
    pub fn diff_reverse(&self, from: VersionId, to: VersionId) -> VersionResult<Diff> {
        if from > to {
            Ok(self.diff(to, from)?.inverse())
        } else {
            self.diff(from, to)
        }
    }

    /// Like `diff`, checking `token` between versions
    pub fn diff_cancellable(
        &self,
        from: VersionId,
        to: VersionId,
        token: &CancelToken,
    ) -> VersionResult<Diff> {
        let versions = self.range(from, to)?;
        Diff::between(&versions, Some(token))
    }

    /// Versions in `(from, to]`, copied out under a short read lock
    fn range(&self, from: VersionId, to: VersionId) -> VersionResult<Vec<Arc<Version>>> {
        let state = self.state.read();
        state.index.check(from)?;
        state.index.check(to)?;
        if from > to {
            return Err(VersionError::InvalidRange { from, to });
        }
        Ok(state.log.range(Some(from), to))
    }

    // ==================== Tags ====================

    /// Bind a new tag to a version
    pub fn create_tag(&self, name: &str, id: VersionId) -> VersionResult<()> {
        self.update_tags(|index| index.create_tag(name, id))?;
        info!("Tagged version {} as '{}'", id, name);
        Ok(())
    }

    /// Rebind an existing tag, returning the version it pointed to before
    pub fn move_tag(&self, name: &str, id: VersionId) -> VersionResult<VersionId> {
        let previous = self.update_tags(|index| index.move_tag(name, id))?;
        info!("Moved tag '{}' from version {} to {}", name, previous, id);
        Ok(previous)
    }

    pub fn delete_tag(&self, name: &str) -> VersionResult<VersionId> {
        let previous = self.update_tags(|index| index.delete_tag(name))?;
        info!("Deleted tag '{}' (was version {})", name, previous);
        Ok(previous)
    }

    /// All tags sorted by name
    pub fn tags(&self) -> Vec<(String, VersionId)> {
        self.state.read().index.tags()
    }

    pub fn tags_of(&self, id: VersionId) -> Vec<String> {
        self.state.read().index.tags_of(id)
    }

    /// Apply a tag change to a copy of the index, persist it, then publish it
    fn update_tags<T>(
        &self,
        change: impl FnOnce(&mut VersionIndex) -> VersionResult<T>,
    ) -> VersionResult<T> {
        let mut persistence = self.persistence.as_ref().map(|p| p.lock());
        let mut state = self.state.write();

        let mut index = state.index.clone();
        let result = change(&mut index)?;
        if let Some(persistence) = persistence.as_mut() {
            persistence.save_tags(&index.tags())?;
        }
        state.index = index;
        Ok(result)
    }

    /// Flush the commit log to disk
    pub fn flush(&self) -> VersionResult<()> {
        if let Some(persistence) = &self.persistence {
            persistence.lock().flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, NamedNode, RdfPredicate};

    fn quad(s: &str) -> Quad {
        Quad::triple(
            NamedNode::new(&format!("http://example.org/{s}")).unwrap(),
            RdfPredicate::new("http://example.org/p").unwrap(),
            Literal::new_simple_literal(s),
        )
    }

    #[test]
    fn test_empty_store() {
        let store = VersionedStore::in_memory();
        assert!(store.head().is_none());
        assert!(store.snapshot().is_empty());
        assert!(matches!(
            store.at(VersionId::new(1)),
            Err(VersionError::UnknownVersion(_))
        ));
        assert!(matches!(store.resolve_ref("HEAD"), Err(VersionError::EmptyHistory)));
    }

    #[test]
    fn test_commit_advances_head() {
        let store = VersionedStore::in_memory();
        let v1 = store.commit(vec![Operation::add([quad("a")])], Some("first")).unwrap();
        let v2 = store.commit(vec![Operation::add([quad("b")])], None).unwrap();

        assert_eq!(v1.id(), VersionId::new(1));
        assert_eq!(v1.message(), Some("first"));
        assert_eq!(v2.parent(), Some(v1.id()));
        assert_eq!(store.head().unwrap().id(), v2.id());
        assert_eq!(store.snapshot().len(), 2);
        assert_eq!(store.snapshot_at(v1.id()).unwrap().len(), 1);
    }

    #[test]
    fn test_reader_snapshot_is_isolated() {
        let store = VersionedStore::in_memory();
        store.commit(vec![Operation::add([quad("a")])], None).unwrap();
        let before = store.snapshot();
        store.commit(vec![Operation::remove([quad("a")])], None).unwrap();
        assert!(before.contains(&quad("a")));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_validation_failure_leaves_no_version() {
        let store = VersionedStore::in_memory();
        let err = store.commit(vec![Operation::add([])], None).unwrap_err();
        assert!(matches!(err, VersionError::ValidationFailure(_)));
        assert!(store.head().is_none());
        assert_eq!(store.version_count(), 0);
    }

    #[test]
    fn test_fail_fast_policy() {
        let store = VersionedStore::open(
            StoreConfig::in_memory().with_commit_policy(CommitPolicy::FailFast),
        )
        .unwrap();
        let guard = store.acquire_writer().unwrap();
        assert!(matches!(
            store.commit(vec![Operation::add([quad("a")])], None),
            Err(VersionError::ConcurrencyConflict)
        ));
        drop(guard);
        assert!(store.commit(vec![Operation::add([quad("a")])], None).is_ok());
    }

    #[test]
    fn test_blocking_policy_times_out() {
        let mut config = StoreConfig::in_memory();
        config.commit_timeout_ms = Some(20);
        let store = VersionedStore::open(config).unwrap();
        let _guard = store.acquire_writer().unwrap();
        assert!(matches!(
            store.commit(vec![Operation::add([quad("a")])], None),
            Err(VersionError::ConcurrencyConflict)
        ));
    }

    #[test]
    fn test_diff_ranges() {
        let store = VersionedStore::in_memory();
        for s in ["a", "b", "c"] {
            store.commit(vec![Operation::add([quad(s)])], None).unwrap();
        }
        let (v1, v3) = (VersionId::new(1), VersionId::new(3));

        assert!(store.diff(v3, v3).unwrap().is_empty());
        assert!(matches!(
            store.diff(v3, v1),
            Err(VersionError::InvalidRange { .. })
        ));
        let forward = store.diff(v1, v3).unwrap();
        let backward = store.diff_reverse(v3, v1).unwrap();
        assert_eq!(backward, forward.inverse());
        assert_eq!(backward.removals().len(), 2);
        assert!(matches!(
            store.diff(v1, VersionId::new(9)),
            Err(VersionError::UnknownVersion(_))
        ));
    }

    #[test]
    fn test_cancelled_diff() {
        let store = VersionedStore::in_memory();
        for s in ["a", "b", "c"] {
            store.commit(vec![Operation::add([quad(s)])], None).unwrap();
        }
        let (v1, v3) = (VersionId::new(1), VersionId::new(3));

        let token = CancelToken::new();
        let diff = store.diff_cancellable(v1, v3, &token).unwrap();
        assert_eq!(diff, store.diff(v1, v3).unwrap());

        token.cancel();
        assert!(matches!(
            store.diff_cancellable(v1, v3, &token),
            Err(VersionError::Cancelled)
        ));
        assert_eq!(store.version_count(), 3);
        assert_eq!(store.snapshot().len(), 3);

        // an empty range has nothing to cancel
        assert!(store.diff_cancellable(v3, v3, &token).unwrap().is_empty());
    }

    #[test]
    fn test_non_ascii_tag_resolves() {
        let store = VersionedStore::in_memory();
        let v1 = store.commit(vec![Operation::add([quad("a")])], None).unwrap();
        store.commit(vec![Operation::add([quad("b")])], None).unwrap();
        store.create_tag("発行版", v1.id()).unwrap();
        assert_eq!(store.resolve_ref("発行版").unwrap().id(), v1.id());
        assert!(matches!(
            store.resolve_ref("発行"),
            Err(VersionError::UnknownTag(_))
        ));
    }

    #[test]
    fn test_tags_follow_versions() {
        let store = VersionedStore::in_memory();
        let v1 = store.commit(vec![Operation::add([quad("a")])], None).unwrap();
        store.create_tag("first", v1.id()).unwrap();
        store.commit(vec![Operation::add([quad("b")])], None).unwrap();

        assert_eq!(store.resolve("first").unwrap().id(), v1.id());
        assert_eq!(store.resolve_ref("first").unwrap().id(), v1.id());
        assert_eq!(store.tags_of(v1.id()), vec!["first".to_string()]);
        assert!(matches!(
            store.create_tag("first", VersionId::new(2)),
            Err(VersionError::TagExists(_))
        ));
        assert_eq!(store.move_tag("first", VersionId::new(2)).unwrap(), v1.id());
        assert_eq!(store.delete_tag("first").unwrap(), VersionId::new(2));
        assert!(store.tags().is_empty());
    }

    #[test]
    fn test_config_validation_on_open() {
        let mut config = StoreConfig::in_memory();
        config.max_quads_per_commit = Some(0);
        assert!(matches!(
            VersionedStore::open(config),
            Err(VersionError::Config(_))
        ));
    }
}
