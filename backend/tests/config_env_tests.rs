//! Environment overrides on top of `coach.toml`.

mod support;

use call_coach::config::{AppConfig, ConfigError};
use call_coach::db::RepositoryType;

const BASE: &str = r#"
[server]
port = 9000

[sharing]
base_url = "https://coach.example.com"
"#;

#[test]
fn test_env_overrides_file_values() {
    support::with_scoped_env(
        &[
            ("HOST", Some("127.0.0.1")),
            ("PORT", Some("7070")),
            ("SHARE_BASE_URL", Some("https://share.example.com")),
            ("ANALYSIS_ENDPOINT", Some("http://analysis.local/score")),
            ("ANALYSIS_TIMEOUT_SECS", Some("5")),
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || {
            let mut config = AppConfig::from_toml_str(BASE).unwrap();
            config.apply_env_overrides().unwrap();
            config.validate().unwrap();

            assert_eq!(config.server.bind_addr(), "127.0.0.1:7070");
            assert_eq!(config.sharing.base_url, "https://share.example.com");
            assert_eq!(
                config.analysis.endpoint.as_deref(),
                Some("http://analysis.local/score")
            );
            assert_eq!(config.analysis.timeout_secs, 5);
            assert_eq!(config.storage.repository_type().unwrap(), RepositoryType::Local);
        },
    );
}

#[test]
fn test_file_values_kept_without_env() {
    support::with_scoped_env(
        &[
            ("HOST", None),
            ("PORT", None),
            ("SHARE_BASE_URL", None),
            ("ANALYSIS_ENDPOINT", None),
            ("ANALYSIS_TIMEOUT_SECS", None),
        ],
        || {
            let mut config = AppConfig::from_toml_str(BASE).unwrap();
            config.apply_env_overrides().unwrap();
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.sharing.base_url, "https://coach.example.com");
            assert!(config.analysis.endpoint.is_none());
        },
    );
}

#[test]
fn test_unparsable_port_is_rejected() {
    support::with_scoped_env(&[("PORT", Some("eighty"))], || {
        let mut config = AppConfig::from_toml_str(BASE).unwrap();
        let err = config.apply_env_overrides().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    });
}

#[test]
fn test_zero_timeout_fails_validation() {
    support::with_scoped_env(&[("ANALYSIS_TIMEOUT_SECS", Some("0"))], || {
        let mut config = AppConfig::from_toml_str(BASE).unwrap();
        config.apply_env_overrides().unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    });
}

#[test]
fn test_database_url_selects_postgres_storage() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("postgres")),
            ("DATABASE_URL", Some("postgres://localhost/coach")),
        ],
        || {
            let mut config = AppConfig::from_toml_str(BASE).unwrap();
            config.apply_env_overrides().unwrap();
            assert_eq!(
                config.storage.repository_type().unwrap(),
                RepositoryType::Postgres
            );
            assert_eq!(config.storage.postgres.database_url, "postgres://localhost/coach");
        },
    );
}

#[test]
fn test_from_file_reads_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coach.toml");
    std::fs::write(
        &path,
        r#"
[repository]
type = "local"

[sharing]
base_url = "https://coach.example.com/"
default_expiry_days = 14

[auth]
mode = "tokens"

[[auth.tokens]]
token = "dev-token"
user_id = "dev"
email = "dev@example.com"
"#,
    )
    .unwrap();

    let config = AppConfig::from_file(&path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.sharing.default_expiry_days, Some(14));
    assert_eq!(config.storage.repository_type().unwrap(), RepositoryType::Local);
    assert!(config.auth.build_authenticator().is_ok());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
