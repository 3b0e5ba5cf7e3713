//! Repository factory, builder and `[repository]` config wiring.

mod support;

use std::str::FromStr;

use call_coach::db::factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
use call_coach::db::{services, RepositoryConfig};
use call_coach::models::{CallTimestamp, NewCall, Speaker, TranscriptSegment};

fn sample_call() -> NewCall {
    NewCall {
        rep_name: "Dana".to_string(),
        customer_name: "Acme".to_string(),
        duration: 90.0,
        segments: vec![
            TranscriptSegment::new(Speaker::Representative, "How is your team set up today?", CallTimestamp::ZERO),
            TranscriptSegment::new(Speaker::Customer, "Five people, mostly remote.", CallTimestamp::from_seconds(6)),
        ],
    }
}

#[test]
fn test_repository_type_aliases() {
    assert_eq!(RepositoryType::from_str("PG").unwrap(), RepositoryType::Postgres);
    assert_eq!(RepositoryType::from_str("Local").unwrap(), RepositoryType::Local);
    let err = RepositoryType::from_str("sqlite").unwrap_err();
    assert!(err.contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Local),
    );
}

#[test]
fn test_repository_type_from_env_with_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", Some("postgres://localhost/coach")),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Postgres),
    );
}

#[test]
fn test_explicit_type_wins_over_database_url() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("local")),
            ("DATABASE_URL", Some("postgres://localhost/coach")),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Local),
    );
}

#[test]
fn test_invalid_env_type_defaults_to_local() {
    support::with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("invalid")),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || assert_eq!(RepositoryType::from_env(), RepositoryType::Local),
    );
}

#[tokio::test]
async fn test_local_repository_from_config_is_usable() {
    let config = RepositoryConfig::from_toml_str("[repository]\ntype = \"local\"\n").unwrap();
    let repo = RepositoryFactory::from_repository_config(&config).await.unwrap();

    assert!(services::health_check(repo.as_ref()).await.unwrap());
    let call = services::store_call(repo.as_ref(), &sample_call()).await.unwrap();
    let listed = services::list_calls(repo.as_ref()).await.unwrap();
    assert_eq!(listed, vec![call]);
}

#[tokio::test]
async fn test_builder_explicit_local() {
    let repo = RepositoryBuilder::new()
        .repository_type(RepositoryType::Local)
        .build()
        .await
        .unwrap();
    assert!(services::list_calls(repo.as_ref()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_config_type_is_configuration_error() {
    let config = RepositoryConfig::from_toml_str("[repository]\ntype = \"mongo\"\n").unwrap();
    let err = RepositoryFactory::from_repository_config(&config)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("Invalid repository type"));
}

#[cfg(feature = "postgres-repo")]
#[tokio::test]
async fn test_create_postgres_without_config_fails() {
    let result = RepositoryFactory::create(RepositoryType::Postgres, None).await;
    assert!(result
        .err()
        .unwrap()
        .to_string()
        .contains("requires PostgresConfig"));
}

#[cfg(not(feature = "postgres-repo"))]
#[tokio::test]
async fn test_create_postgres_without_feature_fails() {
    let result = RepositoryFactory::create(RepositoryType::Postgres, None).await;
    let err = result.err().unwrap();
    assert!(err.to_string().contains("feature not enabled"));
}
