//! # MoneyManager インフラ層
//!
//! 外部システム（PostgreSQL、SMTP サーバー）との接続・通信を担当する。
//!
//! ## 依存関係
//!
//! ```text
//! api → infra → domain
//! ```
//!
//! ドメイン層で定義された値（`MessageDescriptor`、`Profile` など）を受け取り、
//! 外部システムの詳細をカプセル化する。
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続プールとマイグレーション
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - メール送信（送信経路の選択とフォールバック）
//! - [`password`] - Argon2id によるパスワードのハッシュ化・検証
//! - [`repository`] - リポジトリ実装
//! - [`token`] - JWT アクセストークンの発行・検証
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use moneymanager_infra::{
//!     db,
//!     notification::{EnvMailSettings, MailSender, MailTransportAdapter, SmtpMailSender},
//! };
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/moneymanager").await?;
//!
//!     let settings = Arc::new(EnvMailSettings);
//!     let sender = MailSender::Controllable(Arc::new(SmtpMailSender::new(settings.clone())));
//!     let adapter = MailTransportAdapter::new(sender, settings);
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod password;
pub mod repository;
pub mod token;

pub use error::{InfraError, InfraErrorKind};
pub use password::{Argon2PasswordService, PasswordService};
pub use token::{AccessClaims, JwtTokenService, TokenService};
