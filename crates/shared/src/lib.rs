//! # MoneyManager 共有ユーティリティ
//!
//! API サーバー・インフラ層から共通で使用されるユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum には依存しない（HTTP レスポンスへの変換は各アプリの責務）
//! - tracing 関連の依存は `observability` feature の背後に置く
//!
//! ## モジュール
//!
//! - [`error_response`]: RFC 9457 形式のエラーレスポンス
//! - [`health`]: ヘルスチェックのレスポンス型
//! - [`event_log`]: ビジネスイベントログの定数とマクロ
//! - [`observability`]: トレーシング初期化（`observability` feature）
//! - [`canonical_log`]: リクエスト完了サマリログ（`observability` feature）

#[cfg(feature = "observability")]
pub mod canonical_log;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
