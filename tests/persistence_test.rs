use std::fs::OpenOptions;
use std::io::Write;
use tempfile::TempDir;
use versa::rdf::{Literal, NamedNode, Quad, RdfPredicate};
use versa::versioning::{Operation, VersionId, VersionedStore};
use versa::{LogError, StoreConfig, VersionError};

fn quad(n: u32, graph: Option<&str>) -> Quad {
    Quad::new(
        NamedNode::new(&format!("http://example.org/item/{n}")).unwrap(),
        RdfPredicate::new("http://purl.org/dc/terms/title").unwrap(),
        Literal::new_language_tagged_literal(format!("Item {n}"), "en").unwrap(),
        graph.map(|g| NamedNode::new(g).unwrap()),
    )
}

fn open(dir: &TempDir) -> VersionedStore {
    VersionedStore::open(StoreConfig::persistent(dir.path()).with_checkpoint_interval(2)).unwrap()
}

#[test]
fn test_reopen_reproduces_history() {
    let temp_dir = TempDir::new().unwrap();

    let (snapshots, messages) = {
        let store = open(&temp_dir);
        for n in 1..=5 {
            let graph = (n % 2 == 0).then_some("http://example.org/even");
            store
                .commit(vec![Operation::add([quad(n, graph)])], Some(&format!("item {n}")))
                .unwrap();
        }
        store
            .commit(vec![Operation::remove([quad(1, None)])], None)
            .unwrap();
        store.create_tag("release", VersionId::new(5)).unwrap();
        store.revert_to(VersionId::new(3), None).unwrap();

        let snapshots: Vec<Vec<Quad>> = (1..=7)
            .map(|n| store.snapshot_at(VersionId::new(n)).unwrap().sorted())
            .collect();
        let messages: Vec<Option<String>> = store
            .versions()
            .oldest_first()
            .into_iter()
            .map(|v| v.message().map(str::to_string))
            .collect();
        (snapshots, messages)
    };

    let store = open(&temp_dir);
    assert_eq!(store.version_count(), 7);
    assert_eq!(store.head_id(), Some(VersionId::new(7)));
    assert_eq!(store.resolve("release").unwrap().id(), VersionId::new(5));
    assert_eq!(store.snapshot().sorted(), snapshots[6]);
    for n in 1..=7u64 {
        assert_eq!(
            store.snapshot_at(VersionId::new(n)).unwrap().sorted(),
            snapshots[n as usize - 1]
        );
    }

    let reopened: Vec<Option<String>> = store
        .versions()
        .oldest_first()
        .into_iter()
        .map(|v| v.message().map(str::to_string))
        .collect();
    assert_eq!(reopened, messages);
    assert_eq!(reopened[5], None);

    // new commits continue the sequence
    let next = store.commit(vec![Operation::add([quad(9, None)])], None).unwrap();
    assert_eq!(next.id(), VersionId::new(8));
    assert_eq!(next.parent(), Some(VersionId::new(7)));
}

#[test]
fn test_torn_tail_is_truncated() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = open(&temp_dir);
        store.commit(vec![Operation::add([quad(1, None)])], None).unwrap();
        store.commit(vec![Operation::add([quad(2, None)])], None).unwrap();
        store.flush().unwrap();
    }

    // length prefix promising more bytes than follow it
    let log_path = temp_dir.path().join("commits.log");
    let intact_len = std::fs::metadata(&log_path).unwrap().len();
    {
        let mut file = OpenOptions::new().append(true).open(&log_path).unwrap();
        file.write_all(&512u32.to_le_bytes()).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
    }

    let store = open(&temp_dir);
    assert_eq!(store.version_count(), 2);
    assert_eq!(std::fs::metadata(&log_path).unwrap().len(), intact_len);

    let version = store.commit(vec![Operation::add([quad(3, None)])], None).unwrap();
    assert_eq!(version.id(), VersionId::new(3));
    drop(store);

    assert_eq!(open(&temp_dir).version_count(), 3);
}

#[test]
fn test_corrupted_record_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = open(&temp_dir);
        store.commit(vec![Operation::add([quad(1, None)])], Some("first")).unwrap();
    }

    let log_path = temp_dir.path().join("commits.log");
    let mut bytes = std::fs::read(&log_path).unwrap();
    let pos = bytes
        .windows(5)
        .position(|w| w == b"first")
        .unwrap();
    bytes[pos] = b'F';
    std::fs::write(&log_path, bytes).unwrap();

    let result = VersionedStore::open(StoreConfig::persistent(temp_dir.path()));
    assert!(matches!(
        result,
        Err(VersionError::Persistence(LogError::Corruption { .. }))
    ));
}

#[test]
fn test_dangling_tag_is_dropped() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = open(&temp_dir);
        store.commit(vec![Operation::add([quad(1, None)])], None).unwrap();
        store.create_tag("ok", VersionId::new(1)).unwrap();
    }

    let index_path = temp_dir.path().join("index.json");
    std::fs::write(
        &index_path,
        r#"{"tags": {"ok": 1, "future": 42}, "checkpoints": []}"#,
    )
    .unwrap();

    let store = open(&temp_dir);
    assert_eq!(store.tags(), vec![("ok".to_string(), VersionId::new(1))]);

    let saved = std::fs::read_to_string(&index_path).unwrap();
    assert!(!saved.contains("future"));
}

#[test]
fn test_config_from_yaml() {
    let temp_dir = TempDir::new().unwrap();
    let yaml = format!(
        "data_path: {:?}\ncommit_policy: fail_fast\ncheckpoint_interval: 4\nsync_writes: false\n",
        temp_dir.path()
    );
    let config = StoreConfig::from_yaml_str(&yaml).unwrap();
    assert_eq!(config.checkpoint_interval, 4);

    let store = VersionedStore::open(config).unwrap();
    assert!(store.is_persistent());
    store.commit(vec![Operation::add([quad(1, None)])], None).unwrap();
    assert!(temp_dir.path().join("commits.log").exists());
}

#[test]
fn test_stale_checkpoint_table_is_rebuilt_on_open() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = open(&temp_dir);
        for n in 1..=5 {
            store.commit(vec![Operation::add([quad(n, None)])], None).unwrap();
        }
    }

    let index_path = temp_dir.path().join("index.json");
    std::fs::write(
        &index_path,
        r#"{"tags": {}, "checkpoints": [{"version": 3, "offset": 1}, {"version": 40, "offset": 0}]}"#,
    )
    .unwrap();

    let store = open(&temp_dir);
    assert_eq!(store.version_count(), 5);
    assert_eq!(store.snapshot_at(VersionId::new(3)).unwrap().len(), 3);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&index_path).unwrap()).unwrap();
    let versions: Vec<u64> = saved["checkpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["version"].as_u64().unwrap())
        .collect();
    assert_eq!(versions, vec![2, 4]);
}
