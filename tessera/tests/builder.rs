use std::sync::Arc;

use tessera::{
    JwtConfig, OtpConfig, RateLimitConfig, SessionConfig, SqliteRepositoryProvider,
    TesseraBuilder, TesseraBuilderError,
};

fn session_config() -> SessionConfig {
    SessionConfig::new(JwtConfig::new_hs256(
        b"builder-test-secret-key-32-bytes!".to_vec(),
    ))
}

#[tokio::test]
async fn test_build_with_sqlite_and_migrations() {
    let tessera = TesseraBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .unwrap()
        .with_session_config(session_config())
        .apply_migrations(true)
        .build()
        .await
        .unwrap();

    tessera.health_check().await.unwrap();
    assert_eq!(tessera.sweep_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn test_build_without_session_config_fails() {
    let result = TesseraBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .unwrap()
        .build()
        .await;

    assert!(matches!(
        result,
        Err(TesseraBuilderError::InvalidConfiguration(_))
    ));
}

#[tokio::test]
async fn test_build_rejects_zero_attempts() {
    let result = TesseraBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .unwrap()
        .with_session_config(session_config())
        .with_otp_config(OtpConfig::default().with_max_attempts(0))
        .build()
        .await;

    assert!(matches!(
        result,
        Err(TesseraBuilderError::InvalidConfiguration(_))
    ));
}

#[tokio::test]
async fn test_unreachable_database_is_a_connection_error() {
    let result = TesseraBuilder::new()
        .with_sqlite("sqlite:///definitely/missing/dir/tessera.db")
        .await;

    assert!(matches!(
        result,
        Err(TesseraBuilderError::StorageConnection(_))
    ));
}

#[tokio::test]
async fn test_build_with_existing_repositories() {
    let repositories = Arc::new(
        SqliteRepositoryProvider::connect("sqlite::memory:")
            .await
            .unwrap(),
    );

    let tessera = TesseraBuilder::new()
        .with_repositories(repositories.clone())
        .with_session_config(session_config())
        .with_rate_limit_config(RateLimitConfig {
            max_per_minute: 2,
            ..RateLimitConfig::default()
        })
        .build()
        .await
        .unwrap();

    // Migrations were not requested
    tessera.migrate().await.unwrap();

    assert!(Arc::ptr_eq(tessera.repositories(), &repositories));
    assert_eq!(tessera.rate_limit_config().max_per_minute, 2);
    assert!(tessera.admit("10.0.0.1").is_allowed());
    assert!(tessera.admit("10.0.0.1").is_allowed());
    assert!(!tessera.admit("10.0.0.1").is_allowed());
}
