//! ProfileRepository 統合テスト
//!
//! データベースを使用したテスト。sqlx::test マクロを使用して、
//! テストごとに独立したデータベースを作成する。
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p moneymanager-infra --test profile_repository_test -- --ignored
//! ```

use chrono::Utc;
use moneymanager_domain::{
    password::PasswordHash,
    profile::{Email, FullName, Profile, ProfileId},
};
use moneymanager_infra::{
    InfraErrorKind,
    repository::{PostgresProfileRepository, ProfileRepository},
};
use pretty_assertions::assert_eq;
use sqlx::PgPool;

fn new_profile(email: &str) -> Profile {
    Profile::register(
        ProfileId::new(),
        FullName::new("Akash Kumar").unwrap(),
        Email::new(email).unwrap(),
        PasswordHash::new("$argon2id$v=19$m=65536,t=1,p=1$dGVzdA$dGVzdA"),
        Some("https://example.com/me.png".to_string()),
        Utc::now(),
    )
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_登録したプロフィールをメールアドレスで取得できる(pool: PgPool) {
    let sut = PostgresProfileRepository::new(pool);
    let profile = new_profile("akash@example.com");

    sut.insert(&profile).await.unwrap();
    let found = sut.find_by_email(profile.email()).await.unwrap().unwrap();

    assert_eq!(found.id(), profile.id());
    assert_eq!(found.full_name(), profile.full_name());
    assert_eq!(found.activation_token(), profile.activation_token());
    assert!(!found.is_active());
    assert!(sut.exists_by_email(profile.email()).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_メールアドレスの重複はconflictになる(pool: PgPool) {
    let sut = PostgresProfileRepository::new(pool);
    sut.insert(&new_profile("dup@example.com")).await.unwrap();

    let err = sut
        .insert(&new_profile("dup@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), InfraErrorKind::Conflict { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_有効化トークンは一度だけ使える(pool: PgPool) {
    // Given
    let sut = PostgresProfileRepository::new(pool);
    let profile = new_profile("akash@example.com");
    sut.insert(&profile).await.unwrap();
    let token = profile.activation_token().unwrap().clone();

    // When
    let found = sut.find_by_activation_token(&token).await.unwrap().unwrap();
    let activated = found.activate(Utc::now());
    let first = sut.update_activation(&activated, &token).await.unwrap();
    let second = sut.update_activation(&activated, &token).await.unwrap();

    // Then
    assert!(first);
    assert!(!second);
    assert!(sut.find_by_activation_token(&token).await.unwrap().is_none());
    let stored = sut.find_by_id(profile.id()).await.unwrap().unwrap();
    assert!(stored.is_active());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_削除したプロフィールは取得できない(pool: PgPool) {
    let sut = PostgresProfileRepository::new(pool);
    let profile = new_profile("akash@example.com");
    sut.insert(&profile).await.unwrap();

    sut.delete(profile.id()).await.unwrap();

    assert!(sut.find_by_id(profile.id()).await.unwrap().is_none());
    assert!(!sut.exists_by_email(profile.email()).await.unwrap());
}
