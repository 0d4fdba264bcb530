use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use quill_auth::{AccessToken, Session, SessionChange, SessionEvent, SessionSubject};
use quill_core::UserId;

use super::{IdentityError, IdentityProvider, UserAttributes};

const MIN_PASSWORD_LEN: usize = 6;
const EVENT_BUFFER: usize = 64;

/// A reset email the in-memory provider "sent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryEmail {
    pub email: String,
    /// The one-time recovery token embedded in `link`.
    pub token: AccessToken,
    pub link: String,
}

#[derive(Debug)]
struct Account {
    id: UserId,
    email: String,
    password: String,
}

#[derive(Debug, Default)]
struct State {
    /// Keyed by lower-cased email.
    accounts: HashMap<String, Account>,
    /// Keyed by access token.
    sessions: HashMap<String, Session>,
    outbox: Vec<RecoveryEmail>,
    fail_next: Option<String>,
}

impl State {
    /// Store `session`, dropping any that have already expired.
    fn open_session(&mut self, session: Session) {
        let now = Utc::now();
        self.sessions.retain(|_, s| !s.is_expired(now));
        self.sessions
            .insert(session.access_token.as_str().to_string(), session);
    }
}

/// In-memory identity provider for tests/dev.
///
/// Mirrors the observable behavior of a hosted provider: provider-style error
/// messages, expiring sessions, recovery links, and session-change
/// notifications. Credentials are kept in process memory only.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    state: Mutex<State>,
    events: broadcast::Sender<SessionChange>,
    session_ttl: Duration,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::with_session_ttl(Duration::hours(1))
    }

    pub fn with_session_ttl(session_ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: Mutex::new(State::default()),
            events,
            session_ttl,
        }
    }

    /// Make the next call fail with `message` (e.g. a rate-limit rejection).
    pub fn fail_next(&self, message: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = Some(message.into());
        }
    }

    /// Subject id registered for `email`, if any.
    pub fn subject_for(&self, email: &str) -> Option<UserId> {
        let state = self.state.lock().ok()?;
        state.accounts.get(&email.to_lowercase()).map(|a| a.id)
    }

    /// Sessions currently held, expired ones included until the next mint.
    pub fn session_count(&self) -> usize {
        self.state.lock().map(|s| s.sessions.len()).unwrap_or(0)
    }

    pub fn account_count(&self) -> usize {
        self.state.lock().map(|s| s.accounts.len()).unwrap_or(0)
    }

    /// Reset emails delivered so far, oldest first.
    pub fn recovery_emails(&self) -> Vec<RecoveryEmail> {
        self.state.lock().map(|s| s.outbox.clone()).unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, IdentityError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| IdentityError::Unavailable("provider state poisoned".to_string()))?;
        if let Some(msg) = state.fail_next.take() {
            return Err(IdentityError::Rejected(msg));
        }
        Ok(state)
    }

    fn session_for(&self, account: &Account) -> Session {
        Session {
            access_token: AccessToken::new(Uuid::new_v4().simple().to_string()),
            user: SessionSubject {
                id: account.id,
                email: account.email.clone(),
            },
            expires_at: Some(Utc::now() + self.session_ttl),
        }
    }

    fn emit(&self, change: SessionChange) {
        // No subscribers is fine.
        let _ = self.events.send(change);
    }
}

fn validate_email(email: &str) -> Result<String, IdentityError> {
    let normalized = email.trim().to_lowercase();
    let valid = match normalized.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(IdentityError::rejected("Unable to validate email address: invalid format"));
    }
    Ok(normalized)
}

fn validate_password(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::rejected(format!(
            "Password should be at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SessionSubject, IdentityError> {
        let mut state = self.lock()?;
        let key = validate_email(email)?;
        validate_password(password)?;

        if state.accounts.contains_key(&key) {
            return Err(IdentityError::rejected("User already registered"));
        }

        let account = Account {
            id: UserId::new(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let subject = SessionSubject {
            id: account.id,
            email: account.email.clone(),
        };
        state.accounts.insert(key, account);
        Ok(subject)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let session = {
            let mut state = self.lock()?;
            let account = state
                .accounts
                .get(&email.trim().to_lowercase())
                .filter(|a| a.password == password)
                .ok_or_else(|| IdentityError::rejected("Invalid login credentials"))?;
            let session = self.session_for(account);
            state.open_session(session.clone());
            session
        };

        self.emit(SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), IdentityError> {
        let removed = {
            let mut state = self.lock()?;
            state.sessions.remove(token.as_str())
        };

        match removed {
            Some(_) => {
                self.emit(SessionChange::signed_out());
                Ok(())
            }
            None => Err(IdentityError::rejected("Auth session missing!")),
        }
    }

    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, IdentityError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        match state.sessions.get(token.as_str()) {
            Some(s) if s.is_expired(now) => {
                state.sessions.remove(token.as_str());
                Ok(None)
            }
            Some(s) => Ok(Some(s.clone())),
            None => Ok(None),
        }
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        let mut state = self.lock()?;
        let key = validate_email(email)?;

        // Unregistered addresses get the same answer and no email.
        let Some(account) = state.accounts.get(&key) else {
            return Ok(());
        };

        let session = self.session_for(account);
        let token = session.access_token.clone();
        let link = format!("{redirect_to}#access_token={}&type=recovery", token.as_str());
        state.open_session(session);
        state.outbox.push(RecoveryEmail {
            email: key,
            token,
            link,
        });
        Ok(())
    }

    async fn update_user(
        &self,
        token: &AccessToken,
        attributes: UserAttributes,
    ) -> Result<(), IdentityError> {
        let session = {
            let mut state = self.lock()?;
            let session = state
                .sessions
                .get(token.as_str())
                .filter(|s| !s.is_expired(Utc::now()))
                .cloned()
                .ok_or_else(|| IdentityError::rejected("Auth session missing!"))?;

            if let Some(password) = &attributes.password {
                validate_password(password)?;
                let account = state
                    .accounts
                    .values_mut()
                    .find(|a| a.id == session.user.id)
                    .ok_or_else(|| IdentityError::rejected("User not found"))?;
                if &account.password == password {
                    return Err(IdentityError::rejected(
                        "New password should be different from the old password.",
                    ));
                }
                account.password = password.clone();
            }
            session
        };

        self.emit(SessionChange {
            event: SessionEvent::UserUpdated,
            session: Some(session),
        });
        Ok(())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_returns_stable_subject() {
        let idp = InMemoryIdentityProvider::new();
        let subject = idp.sign_up("Ada@Example.com", "hunter22").await.unwrap();
        assert_eq!(idp.subject_for("ada@example.com"), Some(subject.id));
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let idp = InMemoryIdentityProvider::new();
        idp.sign_up("ada@example.com", "hunter22").await.unwrap();
        let err = idp.sign_up("ADA@example.com", "hunter22").await.unwrap_err();
        assert_eq!(err, IdentityError::rejected("User already registered"));
        assert_eq!(idp.account_count(), 1);
    }

    #[tokio::test]
    async fn weak_password_and_bad_email_are_rejected() {
        let idp = InMemoryIdentityProvider::new();
        assert!(matches!(
            idp.sign_up("ada@example.com", "123").await,
            Err(IdentityError::Rejected(m)) if m.contains("at least 6")
        ));
        assert!(matches!(
            idp.sign_up("not-an-email", "hunter22").await,
            Err(IdentityError::Rejected(m)) if m.contains("invalid format")
        ));
    }

    #[tokio::test]
    async fn sign_in_emits_and_resolves_session() {
        let idp = InMemoryIdentityProvider::new();
        let subject = idp.sign_up("ada@example.com", "hunter22").await.unwrap();
        let mut events = idp.on_session_change();

        let session = idp.sign_in_with_password("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(session.subject_id(), subject.id);

        let change = events.recv().await.unwrap();
        assert_eq!(change.event, SessionEvent::SignedIn);
        assert_eq!(change.session.as_ref(), Some(&session));

        let resolved = idp.get_session(&session.access_token).await.unwrap();
        assert_eq!(resolved, Some(session));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let idp = InMemoryIdentityProvider::new();
        idp.sign_up("ada@example.com", "hunter22").await.unwrap();
        let err = idp.sign_in_with_password("ada@example.com", "nope-nope").await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn sign_out_revokes_and_emits() {
        let idp = InMemoryIdentityProvider::new();
        idp.sign_up("ada@example.com", "hunter22").await.unwrap();
        let session = idp.sign_in_with_password("ada@example.com", "hunter22").await.unwrap();
        let mut events = idp.on_session_change();

        idp.sign_out(&session.access_token).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionChange::signed_out());
        assert_eq!(idp.get_session(&session.access_token).await.unwrap(), None);
        assert!(idp.sign_out(&session.access_token).await.is_err());
    }

    #[tokio::test]
    async fn expired_sessions_resolve_to_none() {
        let idp = InMemoryIdentityProvider::with_session_ttl(Duration::seconds(-1));
        idp.sign_up("ada@example.com", "hunter22").await.unwrap();
        let session = idp.sign_in_with_password("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(idp.get_session(&session.access_token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn minting_purges_expired_sessions() {
        let idp = InMemoryIdentityProvider::with_session_ttl(Duration::seconds(-1));
        idp.sign_up("ada@example.com", "hunter22").await.unwrap();
        idp.sign_in_with_password("ada@example.com", "hunter22").await.unwrap();
        idp.reset_password_for_email("ada@example.com", "http://app/reset-password")
            .await
            .unwrap();
        idp.sign_in_with_password("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(idp.session_count(), 1);
    }

    #[tokio::test]
    async fn reset_only_mails_registered_addresses() {
        let idp = InMemoryIdentityProvider::new();
        idp.sign_up("ada@example.com", "hunter22").await.unwrap();

        idp.reset_password_for_email("ghost@example.com", "http://app/reset-password")
            .await
            .unwrap();
        assert!(idp.recovery_emails().is_empty());

        idp.reset_password_for_email("ada@example.com", "http://app/reset-password")
            .await
            .unwrap();
        let mails = idp.recovery_emails();
        assert_eq!(mails.len(), 1);
        assert!(mails[0].link.starts_with("http://app/reset-password#access_token="));
    }

    #[tokio::test]
    async fn recovery_token_can_update_password() {
        let idp = InMemoryIdentityProvider::new();
        idp.sign_up("ada@example.com", "hunter22").await.unwrap();
        idp.reset_password_for_email("ada@example.com", "http://app/reset-password")
            .await
            .unwrap();
        let token = idp.recovery_emails()[0].token.clone();

        idp.update_user(&token, UserAttributes::password("correct-horse")).await.unwrap();
        assert!(idp.sign_in_with_password("ada@example.com", "hunter22").await.is_err());
        assert!(idp.sign_in_with_password("ada@example.com", "correct-horse").await.is_ok());
    }

    #[tokio::test]
    async fn update_without_session_is_rejected() {
        let idp = InMemoryIdentityProvider::new();
        let err = idp
            .update_user(&AccessToken::new("missing"), UserAttributes::password("whatever1"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Auth session missing!");
    }

    #[tokio::test]
    async fn fail_next_applies_once() {
        let idp = InMemoryIdentityProvider::new();
        idp.fail_next("Email rate limit exceeded");
        let err = idp
            .reset_password_for_email("ada@example.com", "http://app/reset-password")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Email rate limit exceeded");
        assert!(idp
            .reset_password_for_email("ada@example.com", "http://app/reset-password")
            .await
            .is_ok());
    }

    #[test]
    fn attributes_debug_hides_password() {
        let rendered = format!("{:?}", UserAttributes::password("s3cret!"));
        assert!(!rendered.contains("s3cret"));
    }
}
