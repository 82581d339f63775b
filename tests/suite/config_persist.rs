//! Settings file round trips through the persistence layer.

use std::time::Duration;

use pclock_config::Settings;
use tempfile::tempdir;

#[test]
fn persisted_dominance_survives_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut settings = Settings::default();
    settings.session.target = Some("Some One".to_string());
    settings.actions.dominance = settings.actions.dominance.adjusted(-25);
    settings.actions.period = Duration::from_millis(500);
    settings.persist_to(&path).unwrap();

    let loaded = Settings::load_from(&path).unwrap().expect("file exists");
    assert_eq!(loaded.actions.dominance.pointer(), 35);
    assert_eq!(loaded.actions.dominance.key(), 65);
    assert_eq!(loaded.actions.period, Duration::from_millis(500));
    assert_eq!(loaded.session.target.as_deref(), Some("Some One"));
}

#[test]
fn malformed_file_is_reported_with_its_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[clock\ncycle_bits = 3").unwrap();

    let err = Settings::load_from(&path).unwrap_err();
    assert_eq!(err.path(), Some(&path));
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn persist_keeps_user_comments() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "# my clock\n[clock]\n# window size\ncycle_bits = 64\n",
    )
    .unwrap();

    let mut settings = Settings::load_from(&path).unwrap().unwrap();
    assert_eq!(settings.clock.cycle_bits, 64);
    settings.set_pointer_dominance(80);
    settings.persist_to(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("# my clock"));
    assert!(text.contains("# window size"));
    let reloaded = Settings::load_from(&path).unwrap().unwrap();
    assert_eq!(reloaded.actions.dominance.pointer(), 80);
    assert_eq!(reloaded.clock.cycle_bits, 64);
}
