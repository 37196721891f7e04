use pretty_assertions::assert_eq;
use signpost::{
    ConfigError, Gateway, MappingFile, Settings,
    config::Profile,
    hooks::standard_registry,
    testing::{MockClientFactory, MockLabClient},
};
use std::{fs, path::Path, sync::Arc};
use tempfile::TempDir;

const ROUTES: &str = r#"
routes:
  - source_prefix: /tutorials/
    target: ${base_url}/nb/user/${user}/lab/tree/notebooks/tutorial-notebooks/${path}.ipynb
    hooks:
      - signpost.hooks.ensure_running_lab
  - source_prefix: queries
    target: ${base_url}/nb/user/${user}/lab/tree/notebooks/queries/portal_${path}.ipynb
    hooks: [ensure_running_lab, portal_query]
"#;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn settings_yaml(mapping: &Path) -> String {
    format!(
        "environment_url: https://data.example.org/\n\
         mapping_path: {}\n\
         hook_timeout: 10\n\
         logging:\n  profile: production\n  level: debug\n",
        mapping.display()
    )
}

fn factory() -> Arc<MockClientFactory> {
    Arc::new(MockClientFactory::new(Arc::new(MockLabClient::new())))
}

#[tokio::test]
async fn test_gateway_from_files() {
    let dir = TempDir::new().unwrap();
    let routes = write(dir.path(), "routes.yaml", ROUTES);
    let settings_path = write(dir.path(), "settings.yaml", &settings_yaml(&routes));

    let settings = Settings::from_file(&settings_path).unwrap().validate().unwrap();
    assert_eq!(settings.logging.profile, Profile::Production);
    assert_eq!(settings.hook_timeout_secs, 10);

    let gateway = Gateway::from_settings(settings, factory()).unwrap();
    assert_eq!(gateway.base_url(), "https://data.example.org");
    assert_eq!(gateway.routes(), vec!["/tutorials/", "/queries/"]);

    let redirect = gateway
        .resolve_for("/queries/abc123", "rachel", "token")
        .await
        .unwrap();
    assert_eq!(
        redirect.location,
        "https://data.example.org/nb/user/rachel/lab/tree/notebooks/queries/portal_abc123.ipynb"
    );
}

#[test]
fn test_missing_mapping_file() {
    let dir = TempDir::new().unwrap();
    let settings_path = write(
        dir.path(),
        "settings.yaml",
        &settings_yaml(&dir.path().join("absent.yaml")),
    );

    let settings = Settings::from_file(&settings_path).unwrap();
    let err = Gateway::from_settings(settings, factory()).err().unwrap();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_malformed_mapping_file() {
    let dir = TempDir::new().unwrap();
    let routes = write(dir.path(), "routes.yaml", "routes:\n  - source_prefix: [oops\n");
    let settings_path = write(dir.path(), "settings.yaml", &settings_yaml(&routes));

    let settings = Settings::from_file(&settings_path).unwrap();
    let err = Gateway::from_settings(settings, factory()).err().unwrap();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_unknown_hook_in_mapping_file() {
    let dir = TempDir::new().unwrap();
    let routes = write(
        dir.path(),
        "routes.yaml",
        "routes:\n  - source_prefix: /x/\n    target: ${base_url}\n    hooks: [teleport]\n",
    );
    let settings_path = write(dir.path(), "settings.yaml", &settings_yaml(&routes));

    let settings = Settings::from_file(&settings_path).unwrap();
    let err = Gateway::from_settings(settings, factory()).err().unwrap();
    assert_eq!(err.to_string(), "route /x/: hook `teleport` is not registered");
}

#[tokio::test]
async fn test_reload_from_path() {
    let dir = TempDir::new().unwrap();
    let routes = write(dir.path(), "routes.yaml", ROUTES);
    let settings = Settings::from_file(write(dir.path(), "settings.yaml", &settings_yaml(&routes)))
        .unwrap();
    let gateway = Gateway::from_settings(settings, factory()).unwrap();

    let replacement = write(
        dir.path(),
        "routes-v2.yaml",
        "routes:\n  - source_prefix: /docs/\n    target: ${base_url}/docs/${path}\n",
    );
    gateway.reload_from_path(&replacement).unwrap();
    assert_eq!(gateway.routes(), vec!["/docs/"]);

    let err = gateway
        .reload_from_path(dir.path().join("absent.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert_eq!(gateway.routes(), vec!["/docs/"]);
}

#[test]
fn test_settings_require_environment_url() {
    let err = Settings::default().validate().unwrap_err();
    assert_eq!(err.to_string(), "missing required setting `environment_url`");
}

#[test]
fn test_from_parts_rejects_zero_timeouts() {
    let base = Settings {
        environment_url: Some("https://data.example.org".to_string()),
        ..Settings::default()
    };
    let mapping = MappingFile::from_yaml_str(ROUTES).unwrap();

    for (settings, key) in [
        (
            Settings {
                hook_timeout_secs: 0,
                ..base.clone()
            },
            "hook_timeout",
        ),
        (
            Settings {
                client_timeout_secs: 0,
                ..base.clone()
            },
            "client_timeout",
        ),
    ] {
        let err = Gateway::from_parts(settings, standard_registry(), &mapping, factory())
            .err()
            .unwrap();
        assert!(
            matches!(err, ConfigError::InvalidValue { key: k, .. } if k == key),
            "{err}"
        );
    }

    assert!(Gateway::from_parts(base, standard_registry(), &mapping, factory()).is_ok());
}
