//! # ユースケース層
//!
//! API サーバーのビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **トレイトベースの設計**: ハンドラのテストでスタブに差し替えられるようにする
//! - **依存性注入**: リポジトリ・パスワード・トークン・通知を外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約

pub mod notification;
pub mod profile;

use async_trait::async_trait;
use moneymanager_domain::profile::{Profile, ProfileId};
pub use notification::{NotificationService, TemplateRenderer};
pub use profile::{LoginResult, ProfileUseCaseImpl, RegisterInput};

use crate::error::ApiError;

/// プロフィールユースケーストレイト
#[async_trait]
pub trait ProfileUseCase: Send + Sync {
    /// 登録して有効化メールを送信する
    async fn register(&self, input: RegisterInput) -> Result<Profile, ApiError>;

    /// 有効化する（トークンが見つからない・使用済みなら `false`）
    async fn activate(&self, token: &str) -> Result<bool, ApiError>;

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ApiError>;

    /// アクセストークンを検証する
    fn authenticate(&self, token: &str) -> Result<ProfileId, ApiError>;

    async fn get_profile(&self, id: &ProfileId) -> Result<Profile, ApiError>;
}

#[async_trait]
impl ProfileUseCase for ProfileUseCaseImpl {
    async fn register(&self, input: RegisterInput) -> Result<Profile, ApiError> {
        self.register(input).await
    }

    async fn activate(&self, token: &str) -> Result<bool, ApiError> {
        self.activate(token).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ApiError> {
        self.login(email, password).await
    }

    fn authenticate(&self, token: &str) -> Result<ProfileId, ApiError> {
        self.authenticate(token)
    }

    async fn get_profile(&self, id: &ProfileId) -> Result<Profile, ApiError> {
        self.get_profile(id).await
    }
}
