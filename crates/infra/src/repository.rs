//! # リポジトリ実装
//!
//! ドメインオブジェクトの永続化を担当する。
//!
//! ## 設計方針
//!
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: トレイト経由でモック可能な設計

pub mod profile_repository;

pub use profile_repository::{PostgresProfileRepository, ProfileRepository};
