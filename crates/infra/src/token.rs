//! # アクセストークン
//!
//! ログイン成功時に発行する JWT（HS256）の発行と検証を行う。
//!
//! | クレーム | 内容 |
//! |---------|------|
//! | `sub` | プロフィール ID |
//! | `email` | メールアドレス |
//! | `iat` | 発行時刻（UNIX 秒） |
//! | `exp` | 有効期限（UNIX 秒） |

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moneymanager_domain::profile::{Email, ProfileId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::InfraError;

/// アクセストークンのクレーム
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub:   String,
    pub email: String,
    pub iat:   i64,
    pub exp:   i64,
}

impl AccessClaims {
    /// `sub` をプロフィール ID として解釈する
    pub fn profile_id(&self) -> Result<ProfileId, InfraError> {
        Uuid::parse_str(&self.sub)
            .map(ProfileId::from_uuid)
            .map_err(|e| InfraError::unexpected(format!("不正なプロフィール ID: {e}")))
    }
}

/// トークンの発行・検証を担当するトレイト
pub trait TokenService: Send + Sync {
    fn issue(
        &self,
        profile_id: &ProfileId,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<String, InfraError>;

    /// 署名と有効期限を検証してクレームを返す
    fn verify(&self, token: &str) -> Result<AccessClaims, InfraError>;
}

/// HS256 の JWT を扱うトークンサービス
#[derive(Clone)]
pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration:   Duration,
}

impl JwtTokenService {
    pub fn new(secret: &str, expiration: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration,
        }
    }
}

impl TokenService for JwtTokenService {
    fn issue(
        &self,
        profile_id: &ProfileId,
        email: &Email,
        now: DateTime<Utc>,
    ) -> Result<String, InfraError> {
        let claims = AccessClaims {
            sub:   profile_id.to_string(),
            email: email.as_str().to_string(),
            iat:   now.timestamp(),
            exp:   (now + self.expiration).timestamp(),
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, InfraError> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn service() -> JwtTokenService {
        JwtTokenService::new("test-secret", Duration::hours(24))
    }

    #[rstest]
    fn test_発行したトークンを検証できる(service: JwtTokenService) {
        // Given
        let profile_id = ProfileId::new();
        let email = Email::new("akash@example.com").unwrap();
        let now = Utc::now();

        // When
        let token = service.issue(&profile_id, &email, now).unwrap();
        let claims = service.verify(&token).unwrap();

        // Then
        assert_eq!(claims.profile_id().unwrap(), profile_id);
        assert_eq!(claims.email, "akash@example.com");
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[rstest]
    fn test_期限切れのトークンは拒否する(service: JwtTokenService) {
        let issued_at = Utc::now() - Duration::hours(48);
        let token = service
            .issue(&ProfileId::new(), &Email::new("a@b.com").unwrap(), issued_at)
            .unwrap();

        assert!(service.verify(&token).is_err());
    }

    #[rstest]
    fn test_別の鍵で署名されたトークンは拒否する(service: JwtTokenService) {
        let other = JwtTokenService::new("other-secret", Duration::hours(24));
        let token = other
            .issue(&ProfileId::new(), &Email::new("a@b.com").unwrap(), Utc::now())
            .unwrap();

        assert!(service.verify(&token).is_err());
    }

    #[rstest]
    fn test_不正な形式のトークンは拒否する(service: JwtTokenService) {
        assert!(service.verify("not.a.jwt").is_err());
    }
}
