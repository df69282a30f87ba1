use sidx_config::{SourceConfig, SyncConfig};
use sidx_sync::{MemoryRuleStore, StaticFetcher, Synchronizer};

#[tokio::test]
async fn scenario_duplicate_sid_first_wins() {
    let fetcher = StaticFetcher::new()
        .file(
            "et",
            "first.rules",
            "alert ip any any -> any any (msg:\"one\"; sid:7; rev:1;)\n\
             alert ip any any -> any any (msg:\"again\"; sid:7; rev:5;)\n",
        )
        .file(
            "et",
            "second.rules",
            "alert ip any any -> any any (msg:\"two\"; sid:7; rev:9;)\n",
        );
    let mut cfg = SyncConfig {
        database: Default::default(),
        fetch: Default::default(),
        sources: Default::default(),
    };
    cfg.sources.insert(
        "et".to_string(),
        SourceConfig {
            source: "/et".to_string(),
            files: vec!["first.rules".to_string(), "second.rules".to_string()],
        },
    );

    let sync = Synchronizer::new(MemoryRuleStore::new(), fetcher);
    let r = sync.run(&cfg).await.expect("run");

    assert_eq!(r.new, 1);
    assert_eq!(r.duplicates, 2);
    assert_eq!(r.failures, 0);

    let stored = sync.store().get(7).expect("inserted once");
    assert_eq!(stored.rev, 1);
    assert_eq!(stored.file, "et:first.rules");
    assert!(stored.pattern.contains("\"one\""));
}
