use chrono::{Duration, Utc};
use tessera_core::{
    DispatchKind, DispatchStatus, NewDispatchRecord, NewVerificationCode,
    repositories::{
        AuditSink, AuditSinkProvider, CodeRepository, CodeRepositoryProvider, PrincipalDirectory,
        PrincipalDirectoryProvider, RepositoryProvider,
    },
};
use tessera_storage_sqlite::SqliteRepositoryProvider;

async fn provider() -> SqliteRepositoryProvider {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let provider = SqliteRepositoryProvider::connect("sqlite::memory:")
        .await
        .unwrap();
    provider.migrate().await.unwrap();
    provider
}

#[tokio::test]
async fn test_migrate_twice_and_health_check() {
    let provider = provider().await;

    provider.migrate().await.unwrap();
    provider.health_check().await.unwrap();
}

#[tokio::test]
async fn test_repositories_share_one_database() {
    let provider = provider().await;

    provider
        .principal()
        .resolve_or_create("a@example.com")
        .await
        .unwrap();
    assert!(provider.principal().exists("a@example.com").await.unwrap());

    let code = NewVerificationCode::new(
        "a@example.com",
        "hash".to_string(),
        Utc::now(),
        Duration::minutes(10),
    )
    .unwrap();
    provider.code().insert(code).await.unwrap();
    assert!(
        provider
            .code()
            .find_active("a@example.com")
            .await
            .unwrap()
            .is_some()
    );

    provider
        .audit()
        .record(NewDispatchRecord {
            recipient: "a@example.com".to_string(),
            kind: DispatchKind::Notice,
            subject: "Welcome".to_string(),
            status: DispatchStatus::Disabled,
            error_message: None,
            sent_at: Utc::now(),
        })
        .await
        .unwrap();
    assert_eq!(
        provider
            .audit()
            .find_by_recipient("a@example.com")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_connect_rejects_garbage_url() {
    let result = SqliteRepositoryProvider::connect("postgres://nope").await;
    assert!(result.is_err());
}
