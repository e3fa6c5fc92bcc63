//! # ProfileRepository
//!
//! プロフィールの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **メールアドレスの一意性**: `profiles.email` の一意制約で保証し、
//!   違反は [`InfraErrorKind::Conflict`](crate::InfraErrorKind::Conflict) として返す
//! - **有効化は条件付き更新**: トークンが一致する行だけを更新し、
//!   同じトークンでの二重有効化を防ぐ

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moneymanager_domain::{
    password::PasswordHash,
    profile::{ActivationToken, Email, FullName, Profile, ProfileId},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// プロフィールリポジトリトレイト
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// プロフィールを新規作成する
    ///
    /// メールアドレスが既に登録されている場合は `Conflict` エラー。
    async fn insert(&self, profile: &Profile) -> Result<(), InfraError>;

    async fn exists_by_email(&self, email: &Email) -> Result<bool, InfraError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<Profile>, InfraError>;

    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<Profile>, InfraError>;

    async fn find_by_activation_token(
        &self,
        token: &ActivationToken,
    ) -> Result<Option<Profile>, InfraError>;

    /// 有効化状態を保存する
    ///
    /// `consumed` がまだ保存されている行のみ更新する。
    /// 更新できた場合は `true`、既に消費済みだった場合は `false`。
    async fn update_activation(
        &self,
        profile: &Profile,
        consumed: &ActivationToken,
    ) -> Result<bool, InfraError>;

    async fn delete(&self, id: &ProfileId) -> Result<(), InfraError>;
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id:                Uuid,
    full_name:         String,
    email:             String,
    password_hash:     String,
    profile_image_url: Option<String>,
    is_active:         bool,
    activation_token:  Option<String>,
    created_at:        DateTime<Utc>,
    updated_at:        DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = InfraError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile::from_db(
            ProfileId::from_uuid(row.id),
            FullName::new(row.full_name).map_err(|e| InfraError::unexpected(e.to_string()))?,
            Email::new(row.email).map_err(|e| InfraError::unexpected(e.to_string()))?,
            PasswordHash::new(row.password_hash),
            row.profile_image_url,
            row.is_active,
            row.activation_token.map(ActivationToken::new),
            row.created_at,
            row.updated_at,
        ))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, full_name, email, password_hash, profile_image_url,
           is_active, activation_token, created_at, updated_at
    FROM profiles
"#;

/// PostgreSQL 実装の ProfileRepository
#[derive(Debug, Clone)]
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        value: &str,
    ) -> Result<Option<Profile>, InfraError> {
        let sql = format!("{SELECT_COLUMNS} WHERE {condition}");
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Profile::try_from).transpose()
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(profile_id = %profile.id()))]
    async fn insert(&self, profile: &Profile) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (
                id, full_name, email, password_hash, profile_image_url,
                is_active, activation_token, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(profile.id().as_uuid())
        .bind(profile.full_name().as_str())
        .bind(profile.email().as_str())
        .bind(profile.password_hash().as_str())
        .bind(profile.profile_image_url())
        .bind(profile.is_active())
        .bind(profile.activation_token().map(ActivationToken::as_str))
        .bind(profile.created_at())
        .bind(profile.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| InfraError::from_write(e, "Profile", profile.email().as_str()))?;

        Ok(())
    }

    async fn exists_by_email(&self, email: &Email) -> Result<bool, InfraError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM profiles WHERE email = $1)")
                .bind(email.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Profile>, InfraError> {
        self.fetch_one_where("email = $1", email.as_str()).await
    }

    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<Profile>, InfraError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = $1");
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn find_by_activation_token(
        &self,
        token: &ActivationToken,
    ) -> Result<Option<Profile>, InfraError> {
        self.fetch_one_where("activation_token = $1", token.as_str())
            .await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(profile_id = %profile.id()))]
    async fn update_activation(
        &self,
        profile: &Profile,
        consumed: &ActivationToken,
    ) -> Result<bool, InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET is_active = $2, activation_token = $3, updated_at = $4
            WHERE id = $1 AND activation_token = $5
            "#,
        )
        .bind(profile.id().as_uuid())
        .bind(profile.is_active())
        .bind(profile.activation_token().map(ActivationToken::as_str))
        .bind(profile.updated_at())
        .bind(consumed.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(profile_id = %id))]
    async fn delete(&self, id: &ProfileId) -> Result<(), InfraError> {
        sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
