//! # API サーバー設定
//!
//! 環境変数から起動時の設定を読み込む。
//!
//! メール送信の接続設定（`SMTP_HOST` など）はここでは読まない。
//! 送信のたびに [`EnvMailSettings`](moneymanager_infra::notification::EnvMailSettings)
//! が読み直すため、再起動なしで反映される。

use std::str::FromStr;

use thiserror::Error;

/// メール送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MailBackend {
    /// SMTP リレー経由で送信する
    #[default]
    Smtp,
    /// 送信せずログ出力のみ（ローカル開発用）
    Noop,
}

/// 設定の読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// API サーバーの設定
#[derive(Clone)]
pub struct ApiConfig {
    pub host:                 String,
    pub port:                 u16,
    pub database_url:         String,
    pub jwt_secret:           String,
    pub jwt_expiration_hours: i64,
    /// 有効化リンクのベース URL（例: `http://localhost:8080`）
    pub activation_base_url:  String,
    pub mail_backend:         MailBackend,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("activation_base_url", &self.activation_base_url)
            .field("mail_backend", &self.mail_backend)
            .finish()
    }
}

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 24;
const DEFAULT_ACTIVATION_BASE_URL: &str = "http://localhost:8080";

impl ApiConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空白のみの値は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            host:                 get("API_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port:                 parse_or("API_PORT", get("API_PORT"), DEFAULT_PORT)?,
            database_url:         get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            jwt_secret:           get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            jwt_expiration_hours: parse_or(
                "JWT_EXPIRATION_HOURS",
                get("JWT_EXPIRATION_HOURS"),
                DEFAULT_JWT_EXPIRATION_HOURS,
            )?,
            activation_base_url:  get("ACTIVATION_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ACTIVATION_BASE_URL.to_string()),
            mail_backend:         parse_or("MAIL_BACKEND", get("MAIL_BACKEND"), MailBackend::default())?,
        })
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
