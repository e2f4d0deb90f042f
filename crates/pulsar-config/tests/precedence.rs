//! Precedence between caller options, the configuration script and defaults.

use std::fs;
use std::path::Path;

use proptest::prelude::*;
use pulsar_config::{ConfigError, ConfigLayer, ConfigResolver, OptionKey, Options};
use tempfile::TempDir;

const USER_PORT: u16 = 5001;
const FILE_PORT: u16 = 6001;

fn app_dir(script: Option<&str>) -> TempDir {
    let dir = TempDir::new().unwrap();
    if let Some(content) = script {
        fs::create_dir(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/pulsar.toml"), content).unwrap();
    }
    dir
}

fn binds(options: Options, dir: &Path) -> Vec<String> {
    ConfigResolver::resolve_options(&options.base_dir(dir))
        .unwrap()
        .bind_urls()
}

#[test]
fn test_explicit_port_wins_over_script() {
    let dir = app_dir(Some(&format!("port = {FILE_PORT}")));
    let options = Options::new()
        .port(USER_PORT)
        .user_supplied_options([OptionKey::Port]);

    assert_eq!(binds(options, dir.path()), vec!["tcp://0.0.0.0:5001"]);
}

#[test]
fn test_script_wins_over_soft_port() {
    let dir = app_dir(Some(&format!("port = {FILE_PORT}")));
    let options = Options::new()
        .port(USER_PORT)
        .user_supplied_options(Vec::<OptionKey>::new());

    assert_eq!(binds(options, dir.path()), vec!["tcp://0.0.0.0:6001"]);
}

#[test]
fn test_default_port_without_script() {
    let dir = app_dir(None);
    assert_eq!(binds(Options::new(), dir.path()), vec!["tcp://0.0.0.0:9292"]);
}

#[test]
fn test_script_wins_over_default() {
    let dir = app_dir(Some(&format!("port = {FILE_PORT}")));
    assert_eq!(binds(Options::new(), dir.path()), vec!["tcp://0.0.0.0:6001"]);
}

#[test]
fn test_user_port_wins_over_default() {
    let dir = app_dir(None);
    let options = Options::new().port(USER_PORT);
    assert_eq!(binds(options, dir.path()), vec!["tcp://0.0.0.0:5001"]);
}

#[test]
fn test_user_port_without_explicit_set_wins_over_script() {
    let dir = app_dir(Some(&format!("port = {FILE_PORT}")));
    let options = Options::new().port(USER_PORT);
    assert_eq!(binds(options, dir.path()), vec!["tcp://0.0.0.0:5001"]);
}

#[test]
fn test_script_binds_override_derived_bind() {
    let dir = app_dir(Some(r#"binds = ["tcp://127.0.0.1:7000", "unix:///tmp/p.sock"]"#));
    assert_eq!(
        binds(Options::new(), dir.path()),
        vec!["tcp://127.0.0.1:7000", "unix:///tmp/p.sock"]
    );
}

#[test]
fn test_explicit_port_beats_script_binds() {
    let dir = app_dir(Some(r#"binds = ["tcp://127.0.0.1:7000"]"#));
    let options = Options::new().port(USER_PORT);
    assert_eq!(binds(options, dir.path()), vec!["tcp://0.0.0.0:5001"]);
}

#[test]
fn test_broken_script_produces_no_config() {
    let dir = app_dir(Some("port = "));
    let err = ConfigResolver::resolve_options(&Options::new().base_dir(dir.path())).unwrap_err();
    assert!(matches!(err, ConfigError::ScriptParse { .. }));
}

#[test]
fn test_unknown_script_key_produces_no_config() {
    let dir = app_dir(Some("workers = 2"));
    let err = ConfigResolver::resolve_options(&Options::new().base_dir(dir.path())).unwrap_err();
    assert!(err.is_script_error());
}

#[test]
fn test_non_numeric_port_is_invalid_option() {
    let dir = app_dir(None);
    let options = Options::new().set("Port", "eighty").base_dir(dir.path());
    let err = ConfigResolver::resolve_options(&options).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidOption { ref key, .. } if key == "Port"));
}

#[test]
fn test_unknown_option_passes_through() {
    let dir = app_dir(Some("[extra]\nworker_timeout = 30"));
    let options = Options::new()
        .set("worker_timeout", 60)
        .user_supplied_options(Vec::<OptionKey>::new())
        .base_dir(dir.path());

    let config = ConfigResolver::resolve_options(&options).unwrap();
    assert_eq!(config.extra("worker_timeout"), Some(&serde_json::json!(30)));
}

#[test]
fn test_provenance_is_reported() {
    let dir = app_dir(Some("host = \"127.0.0.1\""));
    let options = Options::new()
        .port(USER_PORT)
        .silent(true)
        .user_supplied_options(["Silent"])
        .base_dir(dir.path());

    let config = ConfigResolver::resolve_options(&options).unwrap();
    assert_eq!(config.layer_of(&OptionKey::Port), Some(ConfigLayer::Suggested));
    assert_eq!(config.layer_of(&OptionKey::Host), Some(ConfigLayer::Script));
    assert_eq!(config.layer_of(&OptionKey::Silent), Some(ConfigLayer::Explicit));
    assert_eq!(config.layer_of(&OptionKey::Threads), Some(ConfigLayer::Default));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_explicit_port_always_wins(user in 1u16.., file in proptest::option::of(1u16..)) {
        let dir = app_dir(file.map(|port| format!("port = {port}")).as_deref());
        let options = Options::new()
            .port(user)
            .user_supplied_options([OptionKey::Port]);

        let config = ConfigResolver::resolve_options(&options.base_dir(dir.path())).unwrap();
        prop_assert_eq!(config.port(), user);
        prop_assert_eq!(config.bind_urls(), vec![format!("tcp://0.0.0.0:{user}")]);
    }

    #[test]
    fn prop_script_beats_soft_port(user in proptest::option::of(1u16..), file in 1u16..) {
        let dir = app_dir(Some(&format!("port = {file}")));
        let mut options = Options::new().user_supplied_options(Vec::<OptionKey>::new());
        if let Some(port) = user {
            options = options.port(port);
        }

        let config = ConfigResolver::resolve_options(&options.base_dir(dir.path())).unwrap();
        prop_assert_eq!(config.port(), file);
    }

    #[test]
    fn prop_soft_port_beats_default(user in 1u16..) {
        let dir = app_dir(None);
        let options = Options::new()
            .port(user)
            .user_supplied_options(Vec::<OptionKey>::new());

        let config = ConfigResolver::resolve_options(&options.base_dir(dir.path())).unwrap();
        prop_assert_eq!(config.port(), user);
        prop_assert_eq!(config.layer_of(&OptionKey::Port), Some(ConfigLayer::Suggested));
    }
}
