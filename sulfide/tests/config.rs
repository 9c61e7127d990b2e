//! Integration tests for file-backed settings.

mod common;

use common::{app, site_catalog, with_module};
use sulfide::{
    ConfigError, ConfigTree, Response, artifacts::module_config_path, testing::RecordingModule,
};

#[test]
fn test_routing_settings_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.toml");
    std::fs::write(
        &path,
        r#"
[routing]
default_handler = "blog"
default_action = "view"
handler_dir = "pages"

[paths]
modules = "modules"
"#,
    )
    .unwrap();

    let config = ConfigTree::from_path(&path).unwrap();
    assert_eq!(config.get_str(&["routing", "default_handler"]).unwrap(), "blog");
    assert!(!config.exists(&["routing", "max_redirects"]));

    let app = sulfide::Application::new(config, site_catalog());
    assert_eq!(app.route("/").unwrap(), Response::content("view []"));
    assert_eq!(app.resolver().max_redirects(), 8);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigTree::from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_missing_routing_setting_escapes_as_error() {
    let config = ConfigTree::from_toml_str("[routing]\nhandler_dir = \"pages\"\n").unwrap();
    let app = sulfide::Application::new(config, site_catalog());
    assert!(matches!(
        app.route("/"),
        Err(sulfide::DispatchError::Config(ConfigError::KeyNotFound { .. }))
    ));
}

#[test]
fn test_module_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("blogroll.toml");
    std::fs::write(&file, "feeds = [\"a\", \"b\"]\n[cache]\nttl = 60\n").unwrap();

    let catalog = with_module(site_catalog(), "Blogroll", || RecordingModule::unshared("Blogroll"))
        .settings_file(module_config_path("modules", "Blogroll"), &file)
        .unwrap();
    let app = app(catalog);
    app.modules().load("Blogroll").unwrap();

    let feeds: Vec<String> = app
        .config()
        .get_as(&["modules", "Blogroll", "feeds"])
        .unwrap();
    assert_eq!(feeds, vec!["a", "b"]);
    assert_eq!(
        app.config()
            .get_integer(&["modules", "Blogroll", "cache", "ttl"])
            .unwrap(),
        60
    );
}
