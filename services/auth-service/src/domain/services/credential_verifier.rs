//! 凭证校验
//!
//! 密码使用 Argon2id（慢哈希），refresh token 使用 SHA-256（快摘要）。
//! refresh token 本身是高熵随机串，摘要只需保证存储泄露时不能直接复用。

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::warn;
use warden_config::PasswordHashingConfig;
use warden_errors::{AppError, AppResult};

use crate::domain::value_objects::HashedPassword;

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// 哈希明文密码（加盐、不可逆）
    async fn hash(&self, plaintext: &str) -> AppResult<HashedPassword>;

    /// 比较明文与哈希；哈希格式错误时返回 `false`
    async fn compare(&self, plaintext: &str, hashed: &HashedPassword) -> bool;

    /// refresh token 摘要（确定性、单向）
    fn hash_refresh_token(&self, raw: &str) -> String {
        hash_refresh_token(raw)
    }
}

/// SHA-256 十六进制摘要
pub fn hash_refresh_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Argon2id 实现
///
/// 哈希与校验都是 CPU 密集操作，放到 blocking 线程池执行。
#[derive(Clone)]
pub struct Argon2CredentialVerifier {
    params: Params,
}

impl Argon2CredentialVerifier {
    pub fn new(config: &PasswordHashingConfig) -> AppResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AppError::internal(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

#[async_trait]
impl CredentialVerifier for Argon2CredentialVerifier {
    async fn hash(&self, plaintext: &str) -> AppResult<HashedPassword> {
        let hasher = self.hasher();
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(plaintext.as_bytes(), &salt)
                .map(|hash| HashedPassword::new(hash.to_string()))
                .map_err(|e| AppError::internal(format!("Failed to hash password: {}", e)))
        })
        .await
        .map_err(|e| AppError::internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn compare(&self, plaintext: &str, hashed: &HashedPassword) -> bool {
        let hasher = self.hasher();
        let plaintext = plaintext.to_owned();
        let hashed = hashed.as_str().to_owned();

        let result = tokio::task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&hashed) else {
                return false;
            };
            hasher
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok()
        })
        .await;

        match result {
            Ok(matched) => matched,
            Err(e) => {
                warn!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}
