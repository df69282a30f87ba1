use sidx_config::{SourceConfig, SyncConfig};
use sidx_sync::{MemRule, MemoryRuleStore, StaticFetcher, Synchronizer};

fn rule(sid: u64, rev: i32) -> String {
    format!("alert tcp any any -> any any (msg:\"r{sid}\"; sid:{sid}; rev:{rev};)")
}

fn config() -> SyncConfig {
    let mut cfg = SyncConfig {
        database: Default::default(),
        fetch: Default::default(),
        sources: Default::default(),
    };
    cfg.sources.insert(
        "et".to_string(),
        SourceConfig {
            source: "/static/et".to_string(),
            files: vec!["emerging.rules".to_string()],
        },
    );
    cfg
}

fn fetcher() -> StaticFetcher {
    let contents = [
        "# header".to_string(),
        rule(1, 1),
        rule(2, 3),
        rule(3, 1),
        rule(5, 1),
    ]
    .join("\n");
    StaticFetcher::new()
        .file("et", "emerging.rules", &contents)
        .file("et", "not-listed.rules", &rule(9, 1))
}

fn store() -> MemoryRuleStore {
    MemoryRuleStore::with_rules([
        (1, MemRule::active(1)),
        (2, MemRule::active(1)),
        (3, MemRule::inactive(1)),
        (4, MemRule::active(2)),
    ])
}

#[tokio::test]
async fn scenario_sync_classifies_and_deactivates() {
    let sync = Synchronizer::new(store(), fetcher());
    let r = sync.run(&config()).await.expect("run");

    assert_eq!(r.baseline, 4);
    assert_eq!(r.files, 1);
    assert_eq!(r.new, 1);
    assert_eq!(r.updated, 1);
    assert_eq!(r.reactivated, 1);
    assert_eq!(r.unchanged, 1);
    assert_eq!(r.removed, 1);
    assert_eq!(r.skipped_lines, 1);
    assert!(r.is_clean());

    let s = sync.store();
    assert_eq!(s.get(2).unwrap().rev, 3);
    assert!(s.get(3).unwrap().active);
    assert!(!s.get(4).unwrap().active, "absent rule deactivated, not deleted");
    let new = s.get(5).expect("new rule inserted");
    assert!(new.active);
    assert_eq!(new.file, "et:emerging.rules");
    assert!(new.pattern.contains("sid:5;"));
    assert!(s.get(9).is_none(), "files outside the allow-list are ignored");
}

#[tokio::test]
async fn scenario_second_run_is_quiet() {
    let sync = Synchronizer::new(store(), fetcher());
    let first = sync.run(&config()).await.expect("first run");
    let writes = sync.store().write_count();

    let r = sync.run(&config()).await.expect("second run");
    assert_eq!((r.new, r.updated, r.reactivated, r.removed), (0, 0, 0, 0));
    assert_eq!(r.unchanged, 4);
    assert_eq!(sync.store().write_count(), writes);
    assert_ne!(r.run_id, first.run_id);
}
