//! # プロフィール
//!
//! 家計簿アプリの利用者アカウントを表現する。
//!
//! ## ライフサイクル
//!
//! ```text
//! register ──→ 無効（activation_token あり）──activate──→ 有効（token 消費済み）
//! ```
//!
//! 有効化トークンは一度しか使えない。有効化時にトークンを破棄するため、
//! 同じトークンでの再有効化は「見つからない」扱いになる。
//!
//! ## 使用例
//!
//! ```rust
//! use chrono::Utc;
//! use moneymanager_domain::{
//!     password::PasswordHash,
//!     profile::{Email, FullName, Profile, ProfileId},
//! };
//!
//! let profile = Profile::register(
//!     ProfileId::new(),
//!     FullName::new("Akash Kumar").unwrap(),
//!     Email::new("akash@example.com").unwrap(),
//!     PasswordHash::new("$argon2id$..."),
//!     None,
//!     Utc::now(),
//! );
//! assert!(!profile.is_active());
//!
//! let activated = profile.activate(Utc::now());
//! assert!(activated.is_active());
//! assert!(activated.activation_token().is_none());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DomainError, password::PasswordHash};

define_uuid_id! {
    /// プロフィール ID
    pub struct ProfileId;
}

define_validated_string! {
    /// 氏名
    pub struct FullName {
        label: "氏名",
        max_length: 100,
    }
}

/// メールアドレスの最大長
const MAX_EMAIL_LENGTH: usize = 255;

/// メールアドレス（値オブジェクト）
///
/// `local@domain` の形をしていることのみを検証する。
/// 到達可能性の確認は有効化メールの送信で代替する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// メールアドレスを作成する
    ///
    /// 前後の空白は除去する。
    ///
    /// # エラー
    ///
    /// - 空文字列
    /// - `@` をちょうど 1 つ含まない、またはローカル部・ドメイン部のいずれかが空
    /// - ドメイン部に `.` を含まない、空白を含む
    /// - 255 文字を超える
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        let Some((local, domain)) = value.rsplit_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        let malformed = local.is_empty()
            || local.contains('@')
            || domain.is_empty()
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || value.chars().any(char::is_whitespace);
        if malformed {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        if value.len() > MAX_EMAIL_LENGTH {
            return Err(DomainError::Validation(format!(
                "メールアドレスは{MAX_EMAIL_LENGTH}文字以内である必要があります"
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 有効化トークン
///
/// 登録時に発行し、有効化メールのリンクに埋め込む。ランダムな UUID v4。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivationToken(String);

impl ActivationToken {
    /// 新しいトークンを発行する
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 既存のトークン文字列から復元する
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActivationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// プロフィール（エンティティ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id:                ProfileId,
    full_name:         FullName,
    email:             Email,
    password_hash:     PasswordHash,
    profile_image_url: Option<String>,
    is_active:         bool,
    activation_token:  Option<ActivationToken>,
    created_at:        DateTime<Utc>,
    updated_at:        DateTime<Utc>,
}

impl Profile {
    /// 新規登録する
    ///
    /// 無効状態で作成し、有効化トークンを発行する。
    pub fn register(
        id: ProfileId,
        full_name: FullName,
        email: Email,
        password_hash: PasswordHash,
        profile_image_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            full_name,
            email,
            password_hash,
            profile_image_url: profile_image_url.filter(|url| !url.trim().is_empty()),
            is_active: false,
            activation_token: Some(ActivationToken::generate()),
            created_at: now,
            updated_at: now,
        }
    }

    /// 既存のデータから復元する
    ///
    /// データベースからの読み込み時に使用する。
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: ProfileId,
        full_name: FullName,
        email: Email,
        password_hash: PasswordHash,
        profile_image_url: Option<String>,
        is_active: bool,
        activation_token: Option<ActivationToken>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            full_name,
            email,
            password_hash,
            profile_image_url,
            is_active,
            activation_token,
            created_at,
            updated_at,
        }
    }

    /// 有効化した新しいインスタンスを返す
    ///
    /// トークンは消費される。
    pub fn activate(self, now: DateTime<Utc>) -> Self {
        Self {
            is_active: true,
            activation_token: None,
            updated_at: now,
            ..self
        }
    }

    pub fn id(&self) -> &ProfileId {
        &self.id
    }

    pub fn full_name(&self) -> &FullName {
        &self.full_name
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn profile_image_url(&self) -> Option<&str> {
        self.profile_image_url.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn activation_token(&self) -> Option<&ActivationToken> {
        self.activation_token.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
