//! # Money Manager API ライブラリ
//!
//! API サーバーのコアモジュール。
//!
//! ## モジュール構成
//!
//! - `app_builder`: ルーターとミドルウェアの構築
//! - `error`: API エラーと HTTP レスポンスへの変換
//! - `handler`: HTTP ハンドラ
//! - `usecase`: プロフィール管理とメール通知のビジネスロジック

pub mod app_builder;
pub mod error;
pub mod handler;
pub mod usecase;
