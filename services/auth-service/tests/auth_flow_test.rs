//! 认证流程集成测试（内存存储）

use std::sync::Arc;

use auth_service::application::{Credentials, FederatedIdentity, Registration, VerifyOutcome};
use auth_service::domain::repositories::SessionStore;
use auth_service::domain::services::{Argon2CredentialVerifier, hash_refresh_token};
use auth_service::domain::value_objects::Email;
use auth_service::infrastructure::events::{AuthDomainEvent, InMemoryEventBus};
use auth_service::infrastructure::persistence::{InMemoryAccountDirectory, InMemorySessionStore};
use auth_service::{AuthError, AuthService};
use chrono::{Duration, Utc};
use secrecy::Secret;
use warden_auth_core::{Principal, TokenSigner};
use warden_common::{AccountId, Role};
use warden_config::PasswordHashingConfig;

struct Harness {
    service: AuthService,
    sessions: Arc<InMemorySessionStore>,
    signer: Arc<TokenSigner>,
    events: InMemoryEventBus,
}

fn signer_with(access_ttl: Duration) -> Arc<TokenSigner> {
    Arc::new(TokenSigner::new(
        b"test-access-secret",
        b"test-refresh-secret",
        access_ttl,
        Duration::days(7),
        "warden-test",
    ))
}

fn harness_with(signer: Arc<TokenSigner>) -> Harness {
    let sessions = Arc::new(InMemorySessionStore::new());
    let events = InMemoryEventBus::new();
    let verifier = Argon2CredentialVerifier::new(&PasswordHashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();

    let service = AuthService::new(
        Arc::new(InMemoryAccountDirectory::new()),
        sessions.clone(),
        Arc::new(verifier),
        signer.clone(),
    )
    .with_event_publisher(Arc::new(events.clone()));

    Harness {
        service,
        sessions,
        signer,
        events,
    }
}

fn harness() -> Harness {
    harness_with(signer_with(Duration::minutes(15)))
}

fn registration(name: &str, email: &str, password: &str) -> Registration {
    Registration {
        name: name.into(),
        email: Email::new(email).unwrap(),
        password: Secret::new(password.into()),
    }
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: Email::new(email).unwrap(),
        password: Secret::new(password.into()),
    }
}

fn google(email: &str, external_id: &str) -> FederatedIdentity {
    FederatedIdentity {
        email: Email::new(email).unwrap(),
        name: "Federated User".into(),
        external_id: external_id.into(),
    }
}

#[tokio::test]
async fn test_register_login_refresh_then_reuse_is_rejected() {
    let h = harness();

    let account = h
        .service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    assert_eq!(account.role, Role::Superadmin);
    assert_eq!(account.name, "Ann Lee");

    let pair = h
        .service
        .login(credentials("ann@example.com", "secret1"))
        .await
        .unwrap();
    assert!(!pair.access_token.is_empty());
    assert!(!pair.refresh_token.is_empty());

    let rotated = h.service.refresh(&pair.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);

    let err = h.service.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenNotFoundOrAlreadyRotated));

    // 新令牌仍然可用
    assert!(h.service.refresh(&rotated.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_only_first_account_is_superadmin() {
    let h = harness();

    let first = h
        .service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let second = h
        .service
        .register(registration("Bob Stone", "bob@example.com", "secret2"))
        .await
        .unwrap();

    assert_eq!(first.role, Role::Superadmin);
    assert_eq!(second.role, Role::User);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let h = harness();
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();

    let err = h
        .service
        .register(registration("Ann Again", "ann@example.com", "another1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountExists));
}

#[tokio::test]
async fn test_login_failures_are_distinguished_internally() {
    let h = harness();
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();

    let err = h
        .service
        .login(credentials("ann@example.com", "wrong-password"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let err = h
        .service
        .login(credentials("nobody@example.com", "secret1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotFound));
}

#[tokio::test]
async fn test_only_refresh_token_digest_is_stored() {
    let h = harness();
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let pair = h
        .service
        .login(credentials("ann@example.com", "secret1"))
        .await
        .unwrap();

    let claims = h.signer.verify_refresh(&pair.refresh_token).unwrap();
    let session = h
        .sessions
        .find_by_id(&claims.session_id())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(session.token_hash, hash_refresh_token(&pair.refresh_token));
    assert_ne!(session.token_hash, pair.refresh_token);
    assert_eq!(session.account_id, claims.sub);
    assert_eq!(h.sessions.len(), 1);
}

#[tokio::test]
async fn test_expired_session_is_rejected_and_kept_for_sweeper() {
    let h = harness();
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let pair = h
        .service
        .login(credentials("ann@example.com", "secret1"))
        .await
        .unwrap();

    let session_id = h
        .signer
        .verify_refresh(&pair.refresh_token)
        .unwrap()
        .session_id();
    let mut session = h.sessions.find_by_id(&session_id).await.unwrap().unwrap();
    session.expires_at = Utc::now() - Duration::seconds(1);
    h.sessions.store(&session).await.unwrap();

    let err = h.service.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::TokenExpired));
    assert!(h.sessions.find_by_id(&session_id).await.unwrap().is_some());

    let swept = h.sessions.delete_expired(Utc::now()).await.unwrap();
    assert_eq!(swept, 1);
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn test_garbage_refresh_token_is_invalid() {
    let h = harness();

    let err = h.service.refresh("not-a-jwt-at-all").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn test_access_token_is_not_accepted_as_refresh_token() {
    let h = harness();
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let pair = h
        .service
        .login(credentials("ann@example.com", "secret1"))
        .await
        .unwrap();

    let err = h.service.refresh(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
    assert!(!h.service.verify_access(&pair.refresh_token).is_valid());
}

#[tokio::test]
async fn test_verify_access_returns_principal() {
    let h = harness();
    let account = h
        .service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let pair = h
        .service
        .login(credentials("ann@example.com", "secret1"))
        .await
        .unwrap();

    assert_eq!(
        h.service.verify_access(&pair.access_token),
        VerifyOutcome::Valid {
            account_id: account.id,
            role: Role::Superadmin,
        }
    );
}

#[tokio::test]
async fn test_verify_access_rejects_foreign_and_expired_tokens() {
    let h = harness();
    let account = h
        .service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();

    let foreign = TokenSigner::new(
        b"other-access",
        b"other-refresh",
        Duration::minutes(15),
        Duration::days(7),
        "warden-test",
    );
    let token = foreign.sign_access(&account.principal()).unwrap();
    assert_eq!(h.service.verify_access(&token), VerifyOutcome::Invalid);

    let stale = signer_with(Duration::seconds(-60));
    let token = stale.sign_access(&account.principal()).unwrap();
    assert_eq!(h.service.verify_access(&token), VerifyOutcome::Invalid);

    assert_eq!(h.service.verify_access("abc.def.ghi"), VerifyOutcome::Invalid);
}

#[tokio::test]
async fn test_concurrent_refresh_has_single_winner() {
    let h = harness();
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let pair = h
        .service
        .login(credentials("ann@example.com", "secret1"))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        h.service.refresh(&pair.refresh_token),
        h.service.refresh(&pair.refresh_token),
    );

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser.unwrap_err(),
        AuthError::TokenNotFoundOrAlreadyRotated
    ));
    assert_eq!(h.sessions.len(), 1);
}

#[tokio::test]
async fn test_rotation_keeps_role_from_refresh_token() {
    let h = harness();
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let bob = h
        .service
        .register(registration("Bob Stone", "bob@example.com", "secret2"))
        .await
        .unwrap();
    let pair = h
        .service
        .login(credentials("bob@example.com", "secret2"))
        .await
        .unwrap();

    let rotated = h.service.refresh(&pair.refresh_token).await.unwrap();
    assert_eq!(
        h.service.verify_access(&rotated.access_token),
        VerifyOutcome::Valid {
            account_id: bob.id,
            role: Role::User,
        }
    );
}

#[tokio::test]
async fn test_federated_login_creates_account_once() {
    let h = harness();

    let first = h
        .service
        .login_or_register_federated(google("fed@example.com", "google-123"))
        .await
        .unwrap();
    let second = h
        .service
        .login_or_register_federated(google("fed@example.com", "google-123"))
        .await
        .unwrap();

    let a = h.service.verify_access(&first.access_token);
    let b = h.service.verify_access(&second.access_token);
    assert!(a.is_valid());
    assert_eq!(a, b);
    assert!(matches!(
        a,
        VerifyOutcome::Valid {
            role: Role::Superadmin,
            ..
        }
    ));

    let registered = h
        .events
        .events()
        .await
        .into_iter()
        .filter(|e| matches!(e, AuthDomainEvent::AccountRegistered { federated: true, .. }))
        .count();
    assert_eq!(registered, 1);
    assert_eq!(h.sessions.len(), 2);
}

#[tokio::test]
async fn test_federated_account_cannot_use_password_login() {
    let h = harness();
    h.service
        .login_or_register_federated(google("fed@example.com", "google-123"))
        .await
        .unwrap();

    let err = h
        .service
        .login(credentials("fed@example.com", "anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_federated_email_taken_by_local_account() {
    let h = harness();
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();

    let err = h
        .service
        .login_or_register_federated(google("ann@example.com", "google-999"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::AccountExists));
}

#[tokio::test]
async fn test_issue_session_for_known_principal() {
    let h = harness();
    let account = h
        .service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();

    let pair = h
        .service
        .issue_session(&Principal::new(account.id, account.role))
        .await
        .unwrap();
    assert!(h.service.verify_access(&pair.access_token).is_valid());
    assert_eq!(h.sessions.len(), 1);
}

#[tokio::test]
async fn test_events_follow_successful_operations() {
    let h = harness();
    let account = h
        .service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let pair = h
        .service
        .login(credentials("ann@example.com", "secret1"))
        .await
        .unwrap();
    h.service.refresh(&pair.refresh_token).await.unwrap();

    // 失败的操作不产生事件
    let _ = h.service.refresh(&pair.refresh_token).await;
    let _ = h
        .service
        .login(credentials("ann@example.com", "wrong-password"))
        .await;

    let events = h.events.events().await;
    let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(
        kinds,
        vec!["AccountRegistered", "SessionIssued", "SessionRotated"]
    );
    assert!(events.iter().all(|e| e.account_id() == account.id));
}

async fn logged_in_session(h: &Harness) -> (String, auth_service::domain::RefreshSession) {
    h.service
        .register(registration("Ann Lee", "ann@example.com", "secret1"))
        .await
        .unwrap();
    let pair = h
        .service
        .login(credentials("ann@example.com", "secret1"))
        .await
        .unwrap();
    let session_id = h
        .signer
        .verify_refresh(&pair.refresh_token)
        .unwrap()
        .session_id();
    let session = h.sessions.find_by_id(&session_id).await.unwrap().unwrap();
    (pair.refresh_token, session)
}

async fn rotated_events(h: &Harness) -> usize {
    h.events
        .events()
        .await
        .iter()
        .filter(|e| matches!(e, AuthDomainEvent::SessionRotated { .. }))
        .count()
}

#[tokio::test]
async fn test_refresh_rejects_digest_mismatch() {
    let h = harness();
    let (refresh_token, mut session) = logged_in_session(&h).await;

    session.token_hash = hash_refresh_token("something-else");
    h.sessions.store(&session).await.unwrap();

    let err = h.service.refresh(&refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
    assert!(h.sessions.find_by_id(&session.id).await.unwrap().is_some());
    assert_eq!(rotated_events(&h).await, 0);
}

#[tokio::test]
async fn test_refresh_rejects_session_owned_by_other_account() {
    let h = harness();
    let (refresh_token, mut session) = logged_in_session(&h).await;

    session.account_id = AccountId::new();
    h.sessions.store(&session).await.unwrap();

    let err = h.service.refresh(&refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
    assert!(h.sessions.find_by_id(&session.id).await.unwrap().is_some());
    assert_eq!(rotated_events(&h).await, 0);
    assert_eq!(h.sessions.len(), 1);
}
