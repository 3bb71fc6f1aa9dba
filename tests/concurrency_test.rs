use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use versa::config::{CommitPolicy, StoreConfig};
use versa::rdf::{Literal, NamedNode, Quad, RdfPredicate};
use versa::versioning::{CommitValidator, Operation, StagedCommit, VersionError, VersionId, VersionedStore};

fn quad(n: usize) -> Quad {
    Quad::triple(
        NamedNode::new(&format!("http://example.org/n{n}")).unwrap(),
        RdfPredicate::new("http://example.org/value").unwrap(),
        Literal::new_simple_literal(n.to_string()),
    )
}

/// Parks the first commit it sees inside validation, i.e. while that commit
/// holds the writer lock
struct Gate {
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            armed: AtomicBool::new(true),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        })
    }
}

struct GateValidator(Arc<Gate>);

impl CommitValidator for GateValidator {
    fn name(&self) -> &str {
        "gate"
    }

    fn validate(&self, _commit: &StagedCommit) -> Result<(), String> {
        if self.0.armed.swap(false, Ordering::SeqCst) {
            self.0.entered.wait();
            self.0.release.wait();
        }
        Ok(())
    }
}

fn conflicting_commit(config: StoreConfig) {
    let store = VersionedStore::open(config).unwrap();
    let gate = Gate::new();
    store.add_validator(GateValidator(Arc::clone(&gate)));

    thread::scope(|s| {
        let first = s.spawn(|| store.commit(vec![Operation::add([quad(1)])], Some("first")));

        gate.entered.wait();
        let second = store.commit(vec![Operation::add([quad(2)])], Some("second"));
        assert!(matches!(second, Err(VersionError::ConcurrencyConflict)));
        // a rejected commit leaves nothing behind
        assert_eq!(store.version_count(), 0);
        gate.release.wait();

        let first = first.join().unwrap().unwrap();
        assert_eq!(first.id(), VersionId::new(1));
    });

    assert_eq!(store.version_count(), 1);
    assert!(!store.snapshot().contains(&quad(2)));
}

#[test]
fn test_fail_fast_reports_conflict() {
    conflicting_commit(StoreConfig::in_memory().with_commit_policy(CommitPolicy::FailFast));
}

#[test]
fn test_blocking_with_timeout_reports_conflict() {
    let mut config = StoreConfig::in_memory();
    config.commit_timeout_ms = Some(20);
    conflicting_commit(config);
}

#[test]
fn test_blocking_commits_are_serialized() {
    let store = VersionedStore::in_memory();

    thread::scope(|s| {
        for t in 0..4 {
            let store = &store;
            s.spawn(move || {
                for i in 0..25 {
                    store
                        .commit(vec![Operation::add([quad(t * 100 + i)])], None)
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(store.version_count(), 100);
    assert_eq!(store.snapshot().len(), 100);
    let ids: Vec<u64> = store
        .versions()
        .oldest_first()
        .into_iter()
        .map(|v| v.id().as_u64())
        .collect();
    assert_eq!(ids, (1..=100).collect::<Vec<_>>());
}

#[test]
fn test_readers_see_consistent_versions() {
    let store = VersionedStore::open(StoreConfig::in_memory().with_checkpoint_interval(8)).unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for n in 1..=60 {
                store.commit(vec![Operation::add([quad(n)])], None).unwrap();
            }
        });

        for _ in 0..3 {
            s.spawn(|| {
                for _ in 0..200 {
                    let Some(head) = store.head() else {
                        continue;
                    };
                    // one quad per commit, so version N holds exactly N quads
                    let n = head.id().as_u64();
                    assert_eq!(store.snapshot_at(head.id()).unwrap().len() as u64, n);
                    assert_eq!(store.diff(VersionId::new(1), head.id()).unwrap().len() as u64, n - 1);
                }
            });
        }
    });
}

#[test]
fn test_snapshot_is_isolated_from_later_commits() {
    let store = VersionedStore::in_memory();
    store.commit(vec![Operation::add([quad(1)])], None).unwrap();

    let snapshot = store.snapshot();
    store.commit(vec![Operation::add([quad(2)])], None).unwrap();
    store.commit(vec![Operation::remove([quad(1)])], None).unwrap();

    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains(&quad(1)));
    assert!(!store.snapshot().contains(&quad(1)));
}

#[test]
fn test_checkpointed_snapshots_match_genesis_replay() {
    let checkpointed =
        VersionedStore::open(StoreConfig::in_memory().with_checkpoint_interval(3)).unwrap();
    let plain = VersionedStore::open(StoreConfig::in_memory().with_checkpoint_interval(0)).unwrap();

    for store in [&checkpointed, &plain] {
        for n in 1..=20 {
            let mut ops = vec![Operation::add([quad(n)])];
            if n % 4 == 0 {
                ops.push(Operation::remove([quad(n - 2)]));
            }
            if n % 7 == 0 {
                ops.push(Operation::add([quad(n - 6)]));
            }
            store.commit(ops, None).unwrap();
        }
    }

    for n in 1..=20 {
        let id = VersionId::new(n);
        assert_eq!(
            checkpointed.snapshot_at(id).unwrap().sorted(),
            plain.snapshot_at(id).unwrap().sorted(),
            "version {}",
            n
        );
    }
}
