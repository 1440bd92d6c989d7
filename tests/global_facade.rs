//! The crate-root functions and macros forward to the global logger.

use std::fs;
use tempfile::TempDir;

#[test]
fn global_logger_lifecycle() {
    let dir = TempDir::new().unwrap();
    let all_log = dir.path().join("all.log");

    let source = config::Config::builder()
        .set_override("svc_name", "facade")
        .unwrap()
        .set_override("log.level", "warn")
        .unwrap()
        .set_override("log.rotate.all_log_path", all_log.to_string_lossy().into_owned())
        .unwrap()
        .build()
        .unwrap();

    let report = strata_log::init_from_source(&source).unwrap();
    assert!(report.is_clean());
    assert!(!strata_log::logger().enabled(strata_log::Rank::Info));

    strata_log::info(&[&"below threshold"]);
    strata_log::warnf!("queue depth {}", 128);
    strata_log::errorw("upstream timeout", &[("upstream", serde_json::json!("auth"))]);
    strata_log::sync().unwrap();

    let contents = fs::read_to_string(&all_log).unwrap();
    assert!(!contents.contains("below threshold"));
    assert!(contents.contains("\tWARN\t"));
    assert!(contents.contains("queue depth 128"));
    assert!(contents.contains("\"upstream\":\"auth\""));
    assert!(contents.contains("\"serviceName\":\"facade\""));
    assert!(contents.contains("global_facade.rs"));

    let snapshot = strata_log::diagnostics();
    assert_eq!(snapshot.records_suppressed, 1);
    assert!(snapshot.records_routed >= 2);

    // handles taken before re-initializing follow the new topology
    let earlier = strata_log::logger();
    let mut config = strata_log::load_config_from_str("[log]\nlevel = \"error\"\n").unwrap();
    config.log.rotate.all_log_path = dir.path().join("second.log");
    strata_log::init(&config).unwrap();

    assert!(!earlier.enabled(strata_log::Rank::Warn));
    earlier.error(&[&"from earlier handle"]);
    strata_log::errorf!("{} ready", "second");
    strata_log::sync().unwrap();

    let second = fs::read_to_string(dir.path().join("second.log")).unwrap();
    assert!(second.contains("from earlier handle"));
    assert!(second.contains("second ready"));
    assert!(!fs::read_to_string(&all_log).unwrap().contains("second ready"));
    assert_eq!(strata_log::diagnostics().sink_errors, 0);
}
