//! 认证编排服务
//!
//! 注册、登录、refresh token 轮换、access token 校验，以及联合身份登录。
//! 所有跨请求状态都在账户目录和会话存储中，服务本身无可变状态。

use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use tracing::{debug, info, instrument, warn};
use warden_auth_core::{Principal, TokenSigner};
use warden_common::{Role, SessionId};
use warden_errors::AppError;

use crate::application::dto::{Credentials, FederatedIdentity, Registration, TokenPair, VerifyOutcome};
use crate::domain::repositories::{AccountDirectory, SessionStore};
use crate::domain::services::CredentialVerifier;
use crate::domain::{Account, RefreshSession};
use crate::error::{AuthError, AuthResult};
use crate::infrastructure::events::{AuthDomainEvent, EventPublisher, NoOpEventPublisher};

pub struct AuthService {
    accounts: Arc<dyn AccountDirectory>,
    sessions: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialVerifier>,
    tokens: Arc<TokenSigner>,
    events: Arc<dyn EventPublisher>,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialVerifier>,
        tokens: Arc<TokenSigner>,
    ) -> Self {
        Self {
            accounts,
            sessions,
            credentials,
            tokens,
            events: Arc::new(NoOpEventPublisher),
        }
    }

    pub fn with_event_publisher(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    /// 注册本地账户
    ///
    /// 不签发令牌，调用方需另行登录。
    #[instrument(skip_all)]
    pub async fn register(&self, registration: Registration) -> AuthResult<Account> {
        let result = self.register_inner(registration).await;
        metrics::counter!("auth_register_total", "outcome" => outcome_label(&result)).increment(1);
        result
    }

    async fn register_inner(&self, registration: Registration) -> AuthResult<Account> {
        let Registration {
            name,
            email,
            password,
        } = registration;

        if self.accounts.find_by_email(&email).await?.is_some() {
            debug!("Registration rejected, email already taken");
            return Err(AuthError::AccountExists);
        }

        let role = self.bootstrap_role().await?;
        let password_hash = self.credentials.hash(password.expose_secret()).await?;
        let account = Account::local(name, email, password_hash, role);

        // 预检查与插入之间存在竞争，最终以存储层唯一约束为准
        self.accounts
            .insert(&account)
            .await
            .map_err(conflict_as_account_exists)?;

        info!(account_id = %account.id, role = %account.role, "Account registered");
        self.events
            .publish(AuthDomainEvent::AccountRegistered {
                account_id: account.id,
                email: account.email.to_string(),
                role: account.role,
                federated: false,
                timestamp: account.created_at,
            })
            .await;

        Ok(account)
    }

    /// 密码登录
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: Credentials) -> AuthResult<TokenPair> {
        let result = self.login_inner(credentials).await;
        metrics::counter!("auth_login_total", "outcome" => outcome_label(&result), "method" => "password")
            .increment(1);
        result
    }

    async fn login_inner(&self, credentials: Credentials) -> AuthResult<TokenPair> {
        let account = self
            .accounts
            .find_by_email(&credentials.email)
            .await?
            .ok_or(AuthError::NotFound)?;

        // 仅联合身份的账户没有密码，不能走密码登录
        let Some(password_hash) = account.password_hash.as_ref() else {
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .credentials
            .compare(credentials.password.expose_secret(), password_hash)
            .await
        {
            debug!(account_id = %account.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_session(&account.principal()).await
    }

    /// refresh token 轮换
    ///
    /// 顺序固定：验签 → 查会话 → 过期检查 → 摘要比对 → 删除 → 重新签发。
    /// 旧会话删除成功之后才签发新令牌；新会话持久化失败时调用方被登出。
    #[instrument(skip_all)]
    pub async fn refresh(&self, raw_token: &str) -> AuthResult<TokenPair> {
        let result = self.refresh_inner(raw_token).await;
        metrics::counter!("auth_refresh_total", "outcome" => outcome_label(&result)).increment(1);
        result
    }

    async fn refresh_inner(&self, raw_token: &str) -> AuthResult<TokenPair> {
        let claims = self
            .tokens
            .verify_refresh(raw_token)
            .ok_or(AuthError::InvalidToken)?;
        let session_id = claims.session_id();

        let session = self
            .sessions
            .find_by_id(&session_id)
            .await?
            .ok_or_else(|| {
                warn!(%session_id, account_id = %claims.sub, "Refresh token replayed or revoked");
                AuthError::TokenNotFoundOrAlreadyRotated
            })?;

        if session.is_expired_at(Utc::now()) {
            debug!(%session_id, "Refresh session expired");
            return Err(AuthError::TokenExpired);
        }

        if self.credentials.hash_refresh_token(raw_token) != session.token_hash
            || session.account_id != claims.sub
        {
            warn!(%session_id, "Refresh token does not match stored session");
            return Err(AuthError::InvalidToken);
        }

        if !self.sessions.delete_by_id(&session_id).await? {
            warn!(%session_id, "Refresh session consumed concurrently");
            return Err(AuthError::TokenNotFoundOrAlreadyRotated);
        }

        let principal = Principal::new(session.account_id, claims.role);
        let (pair, new_session_id) = self.mint_session(&principal).await?;

        info!(
            account_id = %principal.account_id,
            previous_session_id = %session_id,
            session_id = %new_session_id,
            "Refresh token rotated"
        );
        self.events
            .publish(AuthDomainEvent::SessionRotated {
                account_id: principal.account_id,
                previous_session_id: session_id,
                session_id: new_session_id,
                timestamp: Utc::now(),
            })
            .await;

        Ok(pair)
    }

    /// access token 无状态校验，不查会话存储
    pub fn verify_access(&self, token: &str) -> VerifyOutcome {
        match self.tokens.verify_access(token) {
            Some(claims) => VerifyOutcome::Valid {
                account_id: claims.sub,
                role: claims.role,
            },
            None => VerifyOutcome::Invalid,
        }
    }

    /// 外部身份登录，首次出现时自动建号
    #[instrument(skip_all)]
    pub async fn login_or_register_federated(
        &self,
        identity: FederatedIdentity,
    ) -> AuthResult<TokenPair> {
        let result = self.federated_inner(identity).await;
        metrics::counter!("auth_login_total", "outcome" => outcome_label(&result), "method" => "federated")
            .increment(1);
        result
    }

    async fn federated_inner(&self, identity: FederatedIdentity) -> AuthResult<TokenPair> {
        let account = match self
            .accounts
            .find_by_external_id(&identity.external_id)
            .await?
        {
            Some(account) => account,
            None => {
                let role = self.bootstrap_role().await?;
                let candidate = Account::federated(
                    identity.name,
                    identity.email,
                    identity.external_id,
                    role,
                );
                let stored = self
                    .accounts
                    .insert_federated(&candidate)
                    .await
                    .map_err(conflict_as_account_exists)?;

                if stored.id == candidate.id {
                    info!(account_id = %stored.id, role = %stored.role, "Federated account registered");
                    self.events
                        .publish(AuthDomainEvent::AccountRegistered {
                            account_id: stored.id,
                            email: stored.email.to_string(),
                            role: stored.role,
                            federated: true,
                            timestamp: stored.created_at,
                        })
                        .await;
                }
                stored
            }
        };

        self.issue_session(&account.principal()).await
    }

    /// 为账户签发 access + refresh 令牌并持久化会话
    pub async fn issue_session(&self, principal: &Principal) -> AuthResult<TokenPair> {
        let (pair, session_id) = self.mint_session(principal).await?;

        info!(account_id = %principal.account_id, %session_id, "Session issued");
        self.events
            .publish(AuthDomainEvent::SessionIssued {
                account_id: principal.account_id,
                session_id,
                timestamp: Utc::now(),
            })
            .await;

        Ok(pair)
    }

    async fn mint_session(&self, principal: &Principal) -> AuthResult<(TokenPair, SessionId)> {
        let access_token = self.tokens.sign_access(principal)?;
        let issued = self.tokens.sign_refresh(principal)?;

        let token_hash = self.credentials.hash_refresh_token(&issued.raw_token);
        let session = RefreshSession::from_issued(&issued, token_hash);
        self.sessions.store(&session).await?;

        Ok((
            TokenPair {
                access_token,
                refresh_token: issued.raw_token,
            },
            session.id,
        ))
    }

    /// 目录为空时首个账户为 superadmin
    ///
    /// 并发的首次注册可能都看到 0，这里只保证至少一个 superadmin。
    async fn bootstrap_role(&self) -> AuthResult<Role> {
        let count = self.accounts.count_accounts().await?;
        Ok(if count == 0 { Role::Superadmin } else { Role::User })
    }
}

fn conflict_as_account_exists(err: AppError) -> AuthError {
    if err.is_conflict() {
        AuthError::AccountExists
    } else {
        AuthError::Infrastructure(err)
    }
}

fn outcome_label<T>(result: &AuthResult<T>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => {
            if !e.is_business() {
                tracing::error!(error = %e, "Authentication infrastructure failure");
            }
            e.outcome()
        }
    }
}
