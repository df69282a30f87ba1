//! Unused keys are reported in WARN mode and rejected in FAIL mode.

use sidx_config::{
    load_layered_yaml_from_strings, report_unused_keys, ConfigScope, UnusedKeyPolicy,
};

const YAML: &str = r#"
database:
  url_env: "SIDX_DATABASE_URL"
fetch:
  timeout_secs: 30
  retries: 3
sources:
  et:
    source: "/srv/rules"
    files: ["a.rules", "b.rules"]
    sorce: "typo"
"#;

#[test]
fn warn_mode_reports_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report = report_unused_keys(ConfigScope::Sync, &loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/fetch/retries".to_string(), "/sources/et/sorce".to_string()]
    );
    assert_eq!(report.scope, "SYNC");
}

#[test]
fn fail_mode_errors_with_code() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = report_unused_keys(ConfigScope::Sync, &loaded.config_json, UnusedKeyPolicy::Fail)
        .unwrap_err()
        .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "{err}");
    assert!(err.contains("/fetch/retries"), "{err}");
}

#[test]
fn clean_config_passes_fail_mode() {
    let yaml = r#"
database:
  url_env: "X"
sources:
  et:
    source: "/srv/rules"
    files: ["a.rules"]
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report =
        report_unused_keys(ConfigScope::Sync, &loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
