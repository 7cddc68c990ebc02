//! warden-auth-core - 认证核心库
//!
//! access / refresh 令牌的签发与校验。两类令牌使用各自独立的签名密钥，
//! 泄露其中一把不能伪造另一类令牌。

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use warden_common::{AccountId, Role, SessionId};
use warden_errors::{AppError, AppResult};

#[doc(hidden)]
pub use warden_errors as __errors;

/// 令牌类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// 令牌主体：账户 + 角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub account_id: AccountId,
    pub role: Role,
}

impl Principal {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }
}

/// Access Token Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account ID)
    pub sub: AccountId,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub token_type: TokenType,
}

impl AccessClaims {
    pub fn principal(&self) -> Principal {
        Principal::new(self.sub, self.role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

/// Refresh Token Claims
///
/// `jti` 即会话 ID，受签名保护；调用方不能另外提供会话 ID。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub jti: SessionId,
    pub sub: AccountId,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub token_type: TokenType,
}

impl RefreshClaims {
    pub fn session_id(&self) -> SessionId {
        self.jti
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.sub, self.role)
    }
}

/// 新签发的 refresh token
///
/// `raw_token` 只返回给调用方一次，持久化时必须替换为摘要。
#[derive(Clone)]
pub struct IssuedRefreshToken {
    pub id: SessionId,
    pub account_id: AccountId,
    pub raw_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedRefreshToken")
            .field("id", &self.id)
            .field("account_id", &self.account_id)
            .field("raw_token", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKey {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// 令牌签发器
pub struct TokenSigner {
    access: SigningKey,
    refresh: SigningKey,
    issuer: String,
}

impl TokenSigner {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            access: SigningKey::new(access_secret, access_ttl),
            refresh: SigningKey::new(refresh_secret, refresh_ttl),
            issuer: issuer.into(),
        }
    }

    /// access token 有效期（秒）
    pub fn access_expires_in(&self) -> i64 {
        self.access.ttl.num_seconds()
    }

    /// 签发 access token
    pub fn sign_access(&self, principal: &Principal) -> AppResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: principal.account_id,
            role: principal.role,
            exp: (now + self.access.ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            token_type: TokenType::Access,
        };

        encode(&Header::default(), &claims, &self.access.encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign access token: {}", e)))
    }

    /// 签发 refresh token，并生成嵌入载荷的随机会话 ID
    pub fn sign_refresh(&self, principal: &Principal) -> AppResult<IssuedRefreshToken> {
        let created_at = Utc::now();
        let expires_at = created_at + self.refresh.ttl;
        let id = SessionId::random();

        let claims = RefreshClaims {
            jti: id,
            sub: principal.account_id,
            role: principal.role,
            exp: expires_at.timestamp(),
            iat: created_at.timestamp(),
            iss: self.issuer.clone(),
            token_type: TokenType::Refresh,
        };

        let raw_token = encode(&Header::default(), &claims, &self.refresh.encoding)
            .map_err(|e| AppError::internal(format!("Failed to sign refresh token: {}", e)))?;

        Ok(IssuedRefreshToken {
            id,
            account_id: principal.account_id,
            raw_token,
            created_at,
            expires_at,
        })
    }

    /// 校验 access token
    ///
    /// 格式错误、签名错误、过期统一返回 `None`，不区分原因。
    pub fn verify_access(&self, token: &str) -> Option<AccessClaims> {
        let claims: AccessClaims = self.decode(token, &self.access.decoding)?;
        (claims.token_type == TokenType::Access).then_some(claims)
    }

    /// 校验 refresh token，语义同 [`TokenSigner::verify_access`]
    pub fn verify_refresh(&self, token: &str) -> Option<RefreshClaims> {
        let claims: RefreshClaims = self.decode(token, &self.refresh.decoding)?;
        (claims.token_type == TokenType::Refresh).then_some(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, token: &str, key: &DecodingKey) -> Option<T> {
        match decode::<T>(token, key, &self.validation()) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error_kind = ?e.kind(), "Token rejected");
                None
            }
        }
    }
}

/// 角色检查宏
///
/// `require_role!(claims, Role::Admin, Role::Superadmin)` 任一角色匹配即放行；
/// `require_role!(claims, at_least: Role::Admin)` 按角色等级放行。
/// 不满足时返回 `AppError::Forbidden`（经 `Into` 转换为调用方的错误类型）。
#[macro_export]
macro_rules! require_role {
    ($claims:expr, at_least: $min:expr) => {
        if !$claims.role.is_at_least($min) {
            return Err($crate::__errors::AppError::forbidden(format!(
                "Requires role {} or higher",
                $min
            ))
            .into());
        }
    };
    ($claims:expr, $($role:expr),+ $(,)?) => {
        if !$claims.has_any_role(&[$($role),+]) {
            return Err($crate::__errors::AppError::forbidden(format!(
                "Requires one of roles: {:?}",
                [$($role),+]
            ))
            .into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            b"access-secret",
            b"refresh-secret",
            Duration::minutes(15),
            Duration::days(7),
            "warden-test",
        )
    }

    fn principal(role: Role) -> Principal {
        Principal::new(AccountId::new(), role)
    }

    #[test]
    fn test_access_round_trip() {
        let signer = signer();
        let p = principal(Role::Admin);

        let token = signer.sign_access(&p).unwrap();
        let claims = signer.verify_access(&token).unwrap();

        assert_eq!(claims.principal(), p);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(signer.access_expires_in(), 900);
    }

    #[test]
    fn test_refresh_embeds_session_id() {
        let signer = signer();
        let p = principal(Role::User);

        let issued = signer.sign_refresh(&p).unwrap();
        let claims = signer.verify_refresh(&issued.raw_token).unwrap();

        assert_eq!(claims.session_id(), issued.id);
        assert_eq!(claims.principal(), p);
        assert_eq!(issued.account_id, p.account_id);
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(issued.expires_at - issued.created_at, Duration::days(7));
    }

    #[test]
    fn test_refresh_ids_are_unique() {
        let signer = signer();
        let p = principal(Role::User);

        let a = signer.sign_refresh(&p).unwrap();
        let b = signer.sign_refresh(&p).unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.raw_token, b.raw_token);
    }

    #[test]
    fn test_token_classes_do_not_cross_verify() {
        let signer = signer();
        let p = principal(Role::User);

        let access = signer.sign_access(&p).unwrap();
        let refresh = signer.sign_refresh(&p).unwrap().raw_token;

        assert!(signer.verify_refresh(&access).is_none());
        assert!(signer.verify_access(&refresh).is_none());
    }

    #[test]
    fn test_token_type_checked_even_with_shared_secret() {
        let signer = TokenSigner::new(
            b"shared",
            b"shared",
            Duration::minutes(15),
            Duration::days(7),
            "warden-test",
        );
        let refresh = signer.sign_refresh(&principal(Role::User)).unwrap().raw_token;
        assert!(signer.verify_access(&refresh).is_none());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let other = TokenSigner::new(
            b"another-access-secret",
            b"another-refresh-secret",
            Duration::minutes(15),
            Duration::days(7),
            "warden-test",
        );
        let token = other.sign_access(&principal(Role::User)).unwrap();
        assert!(signer().verify_access(&token).is_none());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = TokenSigner::new(
            b"access-secret",
            b"refresh-secret",
            Duration::seconds(-30),
            Duration::seconds(-30),
            "warden-test",
        );
        let p = principal(Role::User);

        let access = signer.sign_access(&p).unwrap();
        let refresh = signer.sign_refresh(&p).unwrap().raw_token;

        assert!(signer.verify_access(&access).is_none());
        assert!(signer.verify_refresh(&refresh).is_none());
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let other = TokenSigner::new(
            b"access-secret",
            b"refresh-secret",
            Duration::minutes(15),
            Duration::days(7),
            "someone-else",
        );
        let token = other.sign_access(&principal(Role::User)).unwrap();
        assert!(signer().verify_access(&token).is_none());
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let signer = signer();
        assert!(signer.verify_access("").is_none());
        assert!(signer.verify_access("not.a.jwt").is_none());
        assert!(signer.verify_refresh("definitely not a token").is_none());

        let mut token = signer.sign_access(&principal(Role::User)).unwrap();
        token.push('x');
        assert!(signer.verify_access(&token).is_none());
    }

    #[test]
    fn test_issued_refresh_debug_redacts_token() {
        let issued = signer().sign_refresh(&principal(Role::User)).unwrap();
        let debug = format!("{:?}", issued);
        assert!(!debug.contains(&issued.raw_token));
        assert!(debug.contains("[REDACTED]"));
    }

    fn admin_only(claims: &AccessClaims) -> AppResult<()> {
        require_role!(claims, Role::Admin, Role::Superadmin);
        Ok(())
    }

    #[test]
    fn test_require_role() {
        let signer = signer();

        let admin = signer.sign_access(&principal(Role::Superadmin)).unwrap();
        let admin = signer.verify_access(&admin).unwrap();
        assert!(admin_only(&admin).is_ok());

        let user = signer.sign_access(&principal(Role::User)).unwrap();
        let user = signer.verify_access(&user).unwrap();
        assert!(matches!(admin_only(&user), Err(AppError::Forbidden(_))));
    }

    fn admin_or_above(claims: &AccessClaims) -> AppResult<()> {
        require_role!(claims, at_least: Role::Admin);
        Ok(())
    }

    #[test]
    fn test_require_role_by_rank() {
        let signer = signer();
        let check = |role| {
            let token = signer.sign_access(&principal(role)).unwrap();
            admin_or_above(&signer.verify_access(&token).unwrap())
        };

        assert!(check(Role::Superadmin).is_ok());
        assert!(check(Role::Admin).is_ok());
        match check(Role::User) {
            Err(AppError::Forbidden(msg)) => assert!(msg.contains("admin")),
            other => panic!("expected forbidden, got {:?}", other),
        }
    }
}
