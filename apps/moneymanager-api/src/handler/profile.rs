//! # プロフィールハンドラ
//!
//! 登録・有効化・ログイン・プロフィール取得のエンドポイントを提供する。
//!
//! ## エンドポイント
//!
//! - `POST /register` - プロフィール登録（有効化メールを送信）
//! - `GET /activate?token=...` - 有効化（プレーンテキストで応答）
//! - `POST /login` - ログイン（JWT を発行）
//! - `GET /profile` - 認証済みプロフィールの取得（`Authorization: Bearer <jwt>`）

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use moneymanager_domain::profile::Profile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    usecase::{ProfileUseCase, RegisterInput},
};

const ACTIVATED: &str = "Profile activated successfully";
const ACTIVATION_TOKEN_NOT_FOUND: &str = "Activation token not found or already used";

/// プロフィールハンドラの共有状態
pub struct ProfileState {
    pub usecase: Arc<dyn ProfileUseCase>,
}

// --- リクエスト/レスポンス型 ---

/// 登録リクエスト
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name:         String,
    pub email:             String,
    pub password:          String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// ログインリクエスト
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email:    String,
    pub password: String,
}

/// 有効化クエリ
#[derive(Debug, Deserialize)]
pub struct ActivateQuery {
    #[serde(default)]
    pub token: String,
}

/// プロフィール DTO
///
/// パスワードハッシュと有効化トークンは含めない。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub id:                Uuid,
    pub full_name:         String,
    pub email:             String,
    pub profile_image_url: Option<String>,
    pub created_at:        DateTime<Utc>,
    pub updated_at:        DateTime<Utc>,
}

impl From<&Profile> for ProfileDto {
    fn from(profile: &Profile) -> Self {
        Self {
            id:                *profile.id().as_uuid(),
            full_name:         profile.full_name().as_str().to_string(),
            email:             profile.email().as_str().to_string(),
            profile_image_url: profile.profile_image_url().map(str::to_string),
            created_at:        profile.created_at(),
            updated_at:        profile.updated_at(),
        }
    }
}

/// ログインレスポンス
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user:  ProfileDto,
}

// --- ハンドラ ---

/// POST /register
pub async fn register(
    State(state): State<Arc<ProfileState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .usecase
        .register(RegisterInput {
            full_name:         req.full_name,
            email:             req.email,
            password:          req.password,
            profile_image_url: req.profile_image_url,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ProfileDto::from(&profile))))
}

/// GET /activate?token=...
pub async fn activate(
    State(state): State<Arc<ProfileState>>,
    Query(query): Query<ActivateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if state.usecase.activate(&query.token).await? {
        Ok((StatusCode::OK, ACTIVATED))
    } else {
        Ok((StatusCode::NOT_FOUND, ACTIVATION_TOKEN_NOT_FOUND))
    }
}

/// POST /login
pub async fn login(
    State(state): State<Arc<ProfileState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state.usecase.login(&req.email, &req.password).await?;

    Ok(Json(LoginResponse {
        token: result.token,
        user:  ProfileDto::from(&result.profile),
    }))
}

/// GET /profile
pub async fn get_profile(
    State(state): State<Arc<ProfileState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers).ok_or_else(|| {
        ApiError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;
    let profile_id = state.usecase.authenticate(token)?;
    let profile = state.usecase.get_profile(&profile_id).await?;

    Ok(Json(ProfileDto::from(&profile)))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
