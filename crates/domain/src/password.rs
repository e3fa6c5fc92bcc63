//! # パスワード
//!
//! | 型 | 用途 |
//! |---|------|
//! | [`PlainPassword`] | 登録・ログイン時の入力値 |
//! | [`PasswordHash`] | 永続化用のハッシュ値（Argon2id PHC 文字列） |
//! | [`PasswordVerifyResult`] | パスワード検証の成否 |

use crate::DomainError;

/// 登録時に受け付けるパスワードの最大文字数
const MAX_PASSWORD_LENGTH: usize = 128;

/// 平文パスワード
///
/// Debug 出力では値をマスクする。
#[derive(Clone)]
pub struct PlainPassword(String);

impl std::fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PlainPassword").field(&"[REDACTED]").finish()
    }
}

impl PlainPassword {
    /// 検証なしでラップする（ログイン時の入力値）
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 新規登録用のパスワードを作成する
    ///
    /// 空白のみ、または最大文字数を超える値は受け付けない。
    pub fn for_registration(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();

        if value.trim().is_empty() {
            return Err(DomainError::Validation("パスワードは必須です".to_string()));
        }

        if value.chars().count() > MAX_PASSWORD_LENGTH {
            return Err(DomainError::Validation(format!(
                "パスワードは {MAX_PASSWORD_LENGTH} 文字以内である必要があります"
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// パスワードハッシュ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// ハッシュ文字列からインスタンスを作成する（主に DB からの復元時）
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// パスワード検証結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerifyResult {
    Match,
    Mismatch,
}

impl PasswordVerifyResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

impl From<bool> for PasswordVerifyResult {
    fn from(matched: bool) -> Self {
        if matched { Self::Match } else { Self::Mismatch }
    }
}
