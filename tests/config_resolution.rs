// tests/config_resolution.rs

use std::path::Path;
use std::time::Duration;

use labpilot::config::{resolve, ConfigSources};
use labpilot::errors::LabpilotError;
use labpilot::types::SinkKind;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Layers {
    dir: TempDir,
    sources: ConfigSources,
}

/// Working-dir, home and packaged layers inside one temp dir; none of the
/// files exist until written.
fn layers() -> Layers {
    let dir = tempfile::tempdir().expect("temp dir");
    let sources = ConfigSources {
        explicit: None,
        working_dir: Some(dir.path().join("cwd.labpilot.yaml")),
        home_dir: Some(dir.path().join("home.labpilot.yaml")),
        packaged: Some(dir.path().join("labpilot.yaml")),
    };
    Layers { dir, sources }
}

fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("write config");
}

#[test]
fn no_file_anywhere_yields_defaults() -> TestResult {
    let l = layers();
    let (cfg, source) = resolve(&l.sources)?;

    assert!(source.is_none());
    assert_eq!(cfg.database.path, "./labpilot.db");
    assert_eq!(cfg.timeout.default, 86400);
    assert_eq!(cfg.logging.max_log_lines, 20);
    assert!(cfg.git.auto_snapshot);
    assert!(!cfg.git.require_clean);
    assert!(cfg.active_sinks.is_none());
    assert_eq!(cfg.notification.ntfy.server, "https://ntfy.sh");
    Ok(())
}

#[test]
fn first_existing_layer_wins_without_merging() -> TestResult {
    let l = layers();
    let home = l.sources.home_dir.clone().unwrap();
    let cwd = l.sources.working_dir.clone().unwrap();
    write(&home, "server_name: from-home\ntimeout:\n  default: 10\n");
    write(&cwd, "logging:\n  max_log_lines: 5\n");

    let (cfg, source) = resolve(&l.sources)?;
    assert_eq!(source.as_deref(), Some(cwd.as_path()));
    assert_eq!(cfg.logging.max_log_lines, 5);
    // Nothing from the home layer leaks in.
    assert_eq!(cfg.server_name, None);
    assert_eq!(cfg.timeout.default, 86400);
    Ok(())
}

#[test]
fn home_layer_used_when_working_dir_missing() -> TestResult {
    let l = layers();
    let home = l.sources.home_dir.clone().unwrap();
    write(&home, "server_name: from-home\n");

    let (cfg, source) = resolve(&l.sources)?;
    assert_eq!(source.as_deref(), Some(home.as_path()));
    assert_eq!(cfg.server_name.as_deref(), Some("from-home"));
    Ok(())
}

#[test]
fn packaged_default_is_last_resort() -> TestResult {
    let l = layers();
    let packaged = l.sources.packaged.clone().unwrap();
    write(&packaged, "database:\n  path: /var/lib/labpilot/runs.db\n");

    let (cfg, _) = resolve(&l.sources)?;
    assert_eq!(cfg.database.path, "/var/lib/labpilot/runs.db");
    Ok(())
}

#[test]
fn empty_file_means_all_defaults() -> TestResult {
    let l = layers();
    let cwd = l.sources.working_dir.clone().unwrap();
    write(&cwd, "");

    let (cfg, source) = resolve(&l.sources)?;
    assert!(source.is_some());
    assert_eq!(cfg.logging.max_log_lines, 20);
    Ok(())
}

#[test]
fn explicit_path_must_exist() {
    let mut l = layers();
    l.sources.explicit = Some(l.dir.path().join("nope.yaml"));

    let err = resolve(&l.sources).unwrap_err();
    assert!(matches!(err, LabpilotError::ConfigError(_)), "got {err:?}");
}

#[test]
fn explicit_path_beats_other_layers() -> TestResult {
    let mut l = layers();
    let cwd = l.sources.working_dir.clone().unwrap();
    write(&cwd, "server_name: cwd\n");
    let explicit = l.dir.path().join("custom.yaml");
    write(&explicit, "server_name: custom\n");
    l.sources.explicit = Some(explicit);

    let (cfg, _) = resolve(&l.sources)?;
    assert_eq!(cfg.server_name.as_deref(), Some("custom"));
    Ok(())
}

#[test]
fn active_accepts_string_or_list() -> TestResult {
    let l = layers();
    let cwd = l.sources.working_dir.clone().unwrap();

    write(&cwd, "notification:\n  active: ntfy\n");
    let (cfg, _) = resolve(&l.sources)?;
    assert_eq!(cfg.active_sinks, Some(vec![SinkKind::Ntfy]));

    write(&cwd, "notification:\n  active: [dingtalk, ntfy]\n");
    let (cfg, _) = resolve(&l.sources)?;
    assert_eq!(cfg.active_sinks, Some(vec![SinkKind::Dingtalk, SinkKind::Ntfy]));
    Ok(())
}

#[test]
fn unknown_sink_name_is_rejected() {
    let l = layers();
    let cwd = l.sources.working_dir.clone().unwrap();
    write(&cwd, "notification:\n  active: [slack]\n");

    let err = resolve(&l.sources).unwrap_err();
    assert!(matches!(err, LabpilotError::ConfigError(_)), "got {err:?}");
}

#[test]
fn malformed_yaml_is_an_error() {
    let l = layers();
    let cwd = l.sources.working_dir.clone().unwrap();
    write(&cwd, "timeout: [unterminated\n");

    assert!(matches!(
        resolve(&l.sources),
        Err(LabpilotError::YamlError(_))
    ));
}

#[test]
fn timeout_resolution_prefers_cli_and_zero_disables() -> TestResult {
    let l = layers();
    let cwd = l.sources.working_dir.clone().unwrap();
    write(&cwd, "timeout:\n  default: 600\n");
    let (cfg, _) = resolve(&l.sources)?;

    assert_eq!(cfg.effective_timeout(None), Some(Duration::from_secs(600)));
    assert_eq!(cfg.effective_timeout(Some(30)), Some(Duration::from_secs(30)));
    assert_eq!(cfg.effective_timeout(Some(0)), None);
    assert_eq!(cfg.effective_timeout(Some(-1)), None);
    Ok(())
}

#[test]
fn negative_timeout_in_file_means_unbounded() -> TestResult {
    let l = layers();
    let cwd = l.sources.working_dir.clone().unwrap();
    write(&cwd, "timeout:\n  default: -1\n");
    let (cfg, _) = resolve(&l.sources)?;

    assert_eq!(cfg.timeout.default, -1);
    assert_eq!(cfg.effective_timeout(None), None);
    Ok(())
}
