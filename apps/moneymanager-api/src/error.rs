//! # API エラー定義
//!
//! ユースケースで発生するエラーと、HTTP レスポンスへの変換を定義する。
//!
//! レスポンスボディは [`ErrorResponse`]（RFC 9457）で、
//! クライアント向けのメッセージは `detail` に入る。
//!
//! | バリアント | ステータス | detail |
//! |-----------|-----------|--------|
//! | `Validation` | 400 | 検証メッセージ |
//! | `InvalidCredentials` | 400 | `Invalid email or password` |
//! | `Unauthorized` | 401 | 理由 |
//! | `AccountInactive` | 403 | `Account is not active. Please activate your account first.` |
//! | `NotFound` | 404 | 理由 |
//! | `Conflict` | 409 | 理由 |
//! | `RegistrationFailed` | 500 | `Registration failed: <原因>` |
//! | `Database` / `Internal` | 500 | 固定メッセージ |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use moneymanager_domain::DomainError;
use moneymanager_infra::InfraError;
use moneymanager_shared::{ErrorResponse, event_log::error as log_error};
use thiserror::Error;

pub const EMAIL_ALREADY_REGISTERED: &str = "Email already registered";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const ACCOUNT_NOT_ACTIVE: &str = "Account is not active. Please activate your account first.";

/// API で発生するエラー
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("Account is not active. Please activate your account first.")]
    AccountInactive,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// 登録処理の失敗（原因をクライアントに返す）
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),

    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::NotFound { .. } => Self::NotFound(err.to_string()),
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl ApiError {
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::Validation(msg) => ErrorResponse::validation_error(msg),
            Self::InvalidCredentials => ErrorResponse::bad_request(INVALID_CREDENTIALS),
            Self::Unauthorized(msg) => ErrorResponse::unauthorized(msg),
            Self::AccountInactive => ErrorResponse::new(
                "account-inactive",
                "Account Inactive",
                StatusCode::FORBIDDEN.as_u16(),
                ACCOUNT_NOT_ACTIVE,
            ),
            Self::NotFound(msg) => ErrorResponse::not_found(msg),
            Self::Conflict(msg) => ErrorResponse::conflict(msg),
            Self::RegistrationFailed(_) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::INTERNAL,
                    "{}",
                    self
                );
                ErrorResponse::internal_error_with_detail(self.to_string())
            }
            Self::Database(e) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::DATABASE,
                    span_trace = %e.span_trace(),
                    "データベースエラー: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
            Self::Internal(msg) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::INTERNAL,
                    "内部エラー: {}",
                    msg
                );
                ErrorResponse::internal_error()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = self.to_error_response();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ApiError::Validation("氏名は必須です".into()), StatusCode::BAD_REQUEST, "氏名は必須です")]
    #[case(ApiError::InvalidCredentials, StatusCode::BAD_REQUEST, INVALID_CREDENTIALS)]
    #[case(ApiError::Unauthorized("トークンが不正です".into()), StatusCode::UNAUTHORIZED, "トークンが不正です")]
    #[case(ApiError::AccountInactive, StatusCode::FORBIDDEN, ACCOUNT_NOT_ACTIVE)]
    #[case(ApiError::Conflict(EMAIL_ALREADY_REGISTERED.into()), StatusCode::CONFLICT, EMAIL_ALREADY_REGISTERED)]
    #[case(
        ApiError::RegistrationFailed("Failed to send email: relay down".into()),
        StatusCode::INTERNAL_SERVER_ERROR,
        "Registration failed: Failed to send email: relay down"
    )]
    #[case(ApiError::Internal("jwt".into()), StatusCode::INTERNAL_SERVER_ERROR, "内部エラーが発生しました")]
    #[tokio::test]
    async fn test_エラーがステータスとdetailに変換される(
        #[case] error: ApiError,
        #[case] expected_status: StatusCode,
        #[case] expected_detail: &str,
    ) {
        let response = error.into_response();

        assert_eq!(response.status(), expected_status);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], expected_detail);
        assert_eq!(json["status"], expected_status.as_u16());
    }

    #[test]
    fn test_domain_errorのvalidationは400に対応する() {
        let error: ApiError = DomainError::Validation("不正".to_string()).into();

        assert!(matches!(error, ApiError::Validation(msg) if msg == "不正"));
    }
}
