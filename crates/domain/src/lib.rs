//! # MoneyManager ドメイン層
//!
//! 家計簿アプリケーションのドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! api → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、SMTP サーバー）に一切依存しない。
//! メール送信もここでは「何を送るか」のみを表現し、「どう送るか」は
//! インフラ層の責務とする。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`notification`] - メール通知のメッセージ記述子・配送結果
//! - [`password`] - パスワード関連の値オブジェクト
//! - [`profile`] - プロフィール（利用者アカウント）
//!
//! ## 使用例
//!
//! ```rust
//! use moneymanager_domain::{DomainError, profile::Email};
//!
//! let email = Email::new("user@example.com").unwrap();
//! assert_eq!(email.as_str(), "user@example.com");
//!
//! let error = Email::new("invalid").unwrap_err();
//! assert!(matches!(error, DomainError::Validation(_)));
//! ```

#[macro_use]
mod macros;

pub mod error;
pub mod notification;
pub mod password;
pub mod profile;

pub use error::DomainError;
