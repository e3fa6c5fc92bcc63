//! # プロフィールユースケース
//!
//! 登録・有効化・ログイン・プロフィール取得のビジネスロジックを実装する。
//!
//! ## 登録フロー
//!
//! ```text
//! 入力検証 → 重複確認 → ハッシュ化 → 保存（無効状態）
//!   → 有効化メール送信 ─┬─ 成功 → 登録完了
//!                        └─ 失敗 → プロフィール削除 → RegistrationFailed
//! ```
//!
//! 有効化トークンは条件付き更新で消費するため、同じトークンは一度しか使えない。

use std::sync::Arc;

use chrono::Utc;
use moneymanager_domain::{
    password::PlainPassword,
    profile::{ActivationToken, Email, FullName, Profile, ProfileId},
};
use moneymanager_infra::{PasswordService, TokenService, repository::ProfileRepository};
use moneymanager_shared::{event_log::event, log_business_event};

use super::{NotificationService, TemplateRenderer};
use crate::error::{ApiError, EMAIL_ALREADY_REGISTERED};

/// 登録入力
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub full_name:         String,
    pub email:             String,
    pub password:          String,
    pub profile_image_url: Option<String>,
}

/// ログイン結果
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token:   String,
    pub profile: Profile,
}

/// プロフィールユースケースの実装
pub struct ProfileUseCaseImpl {
    profile_repository:  Arc<dyn ProfileRepository>,
    password_service:    Arc<dyn PasswordService>,
    token_service:       Arc<dyn TokenService>,
    notification:        NotificationService,
    template_renderer:   Arc<TemplateRenderer>,
    activation_base_url: String,
}

impl ProfileUseCaseImpl {
    pub fn new(
        profile_repository: Arc<dyn ProfileRepository>,
        password_service: Arc<dyn PasswordService>,
        token_service: Arc<dyn TokenService>,
        notification: NotificationService,
        template_renderer: Arc<TemplateRenderer>,
        activation_base_url: impl Into<String>,
    ) -> Self {
        Self {
            profile_repository,
            password_service,
            token_service,
            notification,
            template_renderer,
            activation_base_url: activation_base_url.into(),
        }
    }

    /// プロフィールを登録し、有効化メールを送信する
    ///
    /// メールを送信できなかった場合は保存したプロフィールを削除する。
    #[tracing::instrument(skip_all, fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<Profile, ApiError> {
        let full_name = FullName::new(input.full_name)?;
        let email = Email::new(input.email)?;
        let password = PlainPassword::for_registration(input.password)?;

        if self.profile_repository.exists_by_email(&email).await? {
            return Err(ApiError::Conflict(EMAIL_ALREADY_REGISTERED.to_string()));
        }

        let password_hash = self
            .password_service
            .hash(&password)
            .map_err(|e| ApiError::RegistrationFailed(e.to_string()))?;

        let profile = Profile::register(
            ProfileId::new(),
            full_name,
            email,
            password_hash,
            input.profile_image_url,
            Utc::now(),
        );

        // 確認と保存の間に同じメールアドレスが登録された場合も 409
        self.profile_repository
            .insert(&profile)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    ApiError::Conflict(EMAIL_ALREADY_REGISTERED.to_string())
                } else {
                    ApiError::RegistrationFailed(e.to_string())
                }
            })?;

        if let Err(cause) = self.send_activation_email(&profile).await {
            self.roll_back_registration(&profile, &cause).await;
            return Err(ApiError::RegistrationFailed(cause));
        }

        log_business_event!(
            event.category = event::category::PROFILE,
            event.action = event::action::PROFILE_REGISTERED,
            event.entity_type = event::entity_type::PROFILE,
            event.entity_id = %profile.id(),
            event.result = event::result::SUCCESS,
            "プロフィール登録"
        );

        Ok(profile)
    }

    async fn send_activation_email(&self, profile: &Profile) -> Result<(), String> {
        let token = profile
            .activation_token()
            .ok_or_else(|| "有効化トークンがありません".to_string())?;

        let email = self
            .template_renderer
            .render_activation(
                profile.full_name().as_str(),
                &self.activation_base_url,
                token.as_str(),
            )
            .map_err(|e| format!("有効化メールの生成に失敗: {e}"))?;

        self.notification
            .notify(profile.email().as_str(), &email.subject, &email.body)
            .await
            .map_err(|e| e.to_string())
    }

    async fn roll_back_registration(&self, profile: &Profile, cause: &str) {
        if let Err(e) = self.profile_repository.delete(profile.id()).await {
            tracing::error!(
                error = %e,
                profile_id = %profile.id(),
                "登録の取り消しに失敗"
            );
        }

        log_business_event!(
            event.category = event::category::PROFILE,
            event.action = event::action::REGISTRATION_ROLLED_BACK,
            event.entity_type = event::entity_type::PROFILE,
            event.entity_id = %profile.id(),
            event.result = event::result::FAILURE,
            reason = %cause,
            "有効化メールを送信できないため登録を取り消し"
        );
    }

    /// 有効化トークンでプロフィールを有効化する
    ///
    /// トークンが見つからない・使用済みの場合は `false`。
    #[tracing::instrument(skip_all)]
    pub async fn activate(&self, token: &str) -> Result<bool, ApiError> {
        let token = ActivationToken::new(token.trim());
        if token.as_str().is_empty() {
            return Ok(false);
        }

        let Some(profile) = self
            .profile_repository
            .find_by_activation_token(&token)
            .await?
        else {
            return Ok(false);
        };

        let activated = profile.activate(Utc::now());
        let updated = self
            .profile_repository
            .update_activation(&activated, &token)
            .await?;

        if updated {
            log_business_event!(
                event.category = event::category::PROFILE,
                event.action = event::action::PROFILE_ACTIVATED,
                event.entity_type = event::entity_type::PROFILE,
                event.entity_id = %activated.id(),
                event.result = event::result::SUCCESS,
                "プロフィール有効化"
            );
        }

        Ok(updated)
    }

    /// ログインしてアクセストークンを発行する
    ///
    /// 未登録・未有効化のアカウントは `AccountInactive`、
    /// パスワード不一致は `InvalidCredentials`。
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ApiError> {
        let profile = match Email::new(email) {
            Ok(email) => self.profile_repository.find_by_email(&email).await?,
            Err(_) => None,
        };

        let Some(profile) = profile.filter(Profile::is_active) else {
            log_login_failure(None, "inactive");
            return Err(ApiError::AccountInactive);
        };

        let verified = self
            .password_service
            .verify(&PlainPassword::new(password), profile.password_hash())
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        if !verified.is_match() {
            log_login_failure(Some(profile.id()), "password_mismatch");
            return Err(ApiError::InvalidCredentials);
        }

        let token = self
            .token_service
            .issue(profile.id(), profile.email(), Utc::now())
            .map_err(|e| ApiError::Internal(e.to_string()))?;

        log_business_event!(
            event.category = event::category::AUTH,
            event.action = event::action::LOGIN_SUCCESS,
            event.entity_type = event::entity_type::PROFILE,
            event.entity_id = %profile.id(),
            event.result = event::result::SUCCESS,
            "ログイン成功"
        );

        Ok(LoginResult { token, profile })
    }

    /// アクセストークンを検証してプロフィール ID を返す
    pub fn authenticate(&self, token: &str) -> Result<ProfileId, ApiError> {
        let claims = self.token_service.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "アクセストークンの検証に失敗");
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;

        claims
            .profile_id()
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))
    }

    pub async fn get_profile(&self, id: &ProfileId) -> Result<Profile, ApiError> {
        self.profile_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))
    }
}

fn log_login_failure(profile_id: Option<&ProfileId>, reason: &str) {
    let entity_id = profile_id.map(ToString::to_string).unwrap_or_default();
    log_business_event!(
        event.category = event::category::AUTH,
        event.action = event::action::LOGIN_FAILURE,
        event.entity_type = event::entity_type::PROFILE,
        event.entity_id = %entity_id,
        event.result = event::result::FAILURE,
        reason = reason,
        "ログイン失敗"
    );
}
