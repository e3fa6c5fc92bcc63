//! # パスワードハッシュ
//!
//! Argon2id によるパスワードのハッシュ化と検証を提供する。

use argon2::{
    Argon2,
    Params,
    PasswordHasher as _,
    PasswordVerifier as _,
    password_hash::{PasswordHash as Argon2PasswordHash, SaltString},
};
use moneymanager_domain::password::{PasswordHash, PasswordVerifyResult, PlainPassword};

use crate::InfraError;

/// パスワードのハッシュ化・検証を担当するトレイト
pub trait PasswordService: Send + Sync {
    /// パスワードをハッシュ化する（ソルトは毎回ランダム）
    fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError>;

    /// パスワードを検証する
    ///
    /// # Errors
    ///
    /// - 不正なハッシュ形式の場合
    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError>;
}

/// Argon2id によるパスワードサービス
///
/// OWASP 推奨パラメータ（RFC 9106）を使用:
/// - Memory: 64 MB
/// - Iterations: 1
/// - Parallelism: 1
pub struct Argon2PasswordService {
    argon2: Argon2<'static>,
}

impl Argon2PasswordService {
    pub fn new() -> Self {
        let params = Params::new(
            65536, // memory (KB) = 64 MB
            1,     // iterations
            1,     // parallelism
            None,  // output length (default: 32)
        )
        .unwrap_or_default();

        Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError> {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|e| InfraError::password_hash(format!("ソルトの生成に失敗: {e}")))?;

        let hash = self
            .argon2
            .hash_password(password.as_str().as_bytes(), &salt)
            .map_err(|e| InfraError::password_hash(format!("ハッシュ化に失敗: {e}")))?;

        Ok(PasswordHash::new(hash.to_string()))
    }

    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError> {
        let parsed = Argon2PasswordHash::new(hash.as_str())
            .map_err(|e| InfraError::password_hash(format!("不正なハッシュ形式: {e}")))?;

        let matched = self
            .argon2
            .verify_password(password.as_str().as_bytes(), &parsed)
            .is_ok();

        Ok(PasswordVerifyResult::from(matched))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn service() -> Argon2PasswordService {
        Argon2PasswordService::new()
    }

    #[rstest]
    fn test_ハッシュ化したパスワードを検証できる(service: Argon2PasswordService) {
        let password = PlainPassword::new("password123");

        let hash = service.hash(&password).unwrap();

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(service.verify(&password, &hash).unwrap().is_match());
    }

    #[rstest]
    fn test_異なるパスワードは一致しない(service: Argon2PasswordService) {
        let hash = service.hash(&PlainPassword::new("password123")).unwrap();

        let result = service
            .verify(&PlainPassword::new("wrongpassword"), &hash)
            .unwrap();

        assert!(!result.is_match());
    }

    #[rstest]
    fn test_同じパスワードでもソルトによりハッシュが異なる(service: Argon2PasswordService) {
        let password = PlainPassword::new("password123");

        let first = service.hash(&password).unwrap();
        let second = service.hash(&password).unwrap();

        assert_ne!(first, second);
    }

    #[rstest]
    fn test_不正なハッシュ形式はエラー(service: Argon2PasswordService) {
        let result = service.verify(
            &PlainPassword::new("password123"),
            &PasswordHash::new("not-a-valid-hash"),
        );

        assert!(result.is_err());
    }
}
