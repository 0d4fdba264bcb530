//! GoTrue-compatible REST client (the auth API behind hosted Supabase).
//!
//! Endpoints used, relative to `{base_url}/auth/v1`:
//!
//! | operation                  | request                               |
//! |----------------------------|---------------------------------------|
//! | sign_up                    | `POST /signup`                        |
//! | sign_in_with_password      | `POST /token?grant_type=password`     |
//! | sign_out                   | `POST /logout` (bearer)               |
//! | get_session                | `GET /user` (bearer)                  |
//! | reset_password_for_email   | `POST /recover?redirect_to=...`       |
//! | update_user                | `PUT /user` (bearer)                  |
//!
//! 4xx responses are provider rejections and carry a user-facing message in
//! one of `msg`, `message`, `error_description` or `error`. Anything else is
//! treated as the provider being unavailable.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use uuid::Uuid;

use quill_auth::{AccessToken, Session, SessionChange, SessionEvent, SessionSubject};
use quill_core::UserId;

use super::{IdentityError, IdentityProvider, UserAttributes};

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct GoTrueConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`. The `/auth/v1` suffix is
    /// appended by the client.
    pub base_url: String,
    /// Public (anon) API key sent as the `apikey` header.
    pub anon_key: String,
}

pub struct GoTrueIdentityProvider {
    config: GoTrueConfig,
    http: reqwest::Client,
    events: broadcast::Sender<SessionChange>,
}

impl GoTrueIdentityProvider {
    pub fn new(config: GoTrueConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: GoTrueConfig, http: reqwest::Client) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self { config, http, events }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("apikey", &self.config.anon_key)
    }

    fn emit(&self, change: SessionChange) {
        let _ = self.events.send(change);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl WireUser {
    fn into_subject(self) -> SessionSubject {
        SessionSubject {
            id: UserId::from_uuid(self.id),
            email: self.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    #[serde(default)]
    expires_at: Option<i64>,
    user: WireUser,
}

impl WireSession {
    fn into_session(self) -> Session {
        Session {
            access_token: AccessToken::new(self.access_token),
            user: self.user.into_subject(),
            expires_at: self.expires_at.and_then(unix_seconds),
        }
    }
}

/// `/signup` returns a bare user when email confirmation is on and a full
/// session when it is off.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(WireSession),
    User(WireUser),
}

#[derive(Debug, Default, Deserialize)]
struct WireError {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl WireError {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

fn unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

fn network_error(operation: &'static str, err: reqwest::Error) -> IdentityError {
    tracing::warn!(operation, error = %err, "identity provider request failed");
    IdentityError::Unavailable(format!("{operation}: {err}"))
}

/// Turn a non-success response into an `IdentityError`.
async fn error_from_response(operation: &'static str, resp: Response) -> IdentityError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if status.is_client_error() {
        let message = serde_json::from_str::<WireError>(&body)
            .ok()
            .and_then(WireError::into_message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request rejected").to_string());
        tracing::debug!(operation, %status, "identity provider rejected request");
        return IdentityError::Rejected(message);
    }

    tracing::warn!(operation, %status, "identity provider returned server error");
    IdentityError::Unavailable(format!("{operation}: HTTP {status}"))
}

async fn expect_success(
    operation: &'static str,
    resp: Response,
) -> Result<Response, IdentityError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(error_from_response(operation, resp).await)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    resp: Response,
) -> Result<T, IdentityError> {
    resp.json::<T>()
        .await
        .map_err(|e| IdentityError::InvalidResponse(format!("{operation}: {e}")))
}

#[async_trait::async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<SessionSubject, IdentityError> {
        let resp = self
            .request(reqwest::Method::POST, "/signup")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| network_error("sign_up", e))?;
        let resp = expect_success("sign_up", resp).await?;

        match decode::<SignUpResponse>("sign_up", resp).await? {
            SignUpResponse::Session(session) => Ok(session.user.into_subject()),
            SignUpResponse::User(user) => Ok(user.into_subject()),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let resp = self
            .request(reqwest::Method::POST, "/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| network_error("sign_in", e))?;
        let resp = expect_success("sign_in", resp).await?;

        let session = decode::<WireSession>("sign_in", resp).await?.into_session();
        self.emit(SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), IdentityError> {
        let resp = self
            .request(reqwest::Method::POST, "/logout")
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| network_error("sign_out", e))?;
        expect_success("sign_out", resp).await?;

        self.emit(SessionChange::signed_out());
        Ok(())
    }

    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, IdentityError> {
        let resp = self
            .request(reqwest::Method::GET, "/user")
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(|e| network_error("get_session", e))?;

        // Revoked, expired and malformed tokens all come back as 401/403.
        if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }
        let resp = expect_success("get_session", resp).await?;
        let user = decode::<WireUser>("get_session", resp).await?;

        Ok(Some(Session {
            access_token: token.clone(),
            user: user.into_subject(),
            expires_at: None,
        }))
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), IdentityError> {
        let resp = self
            .request(reqwest::Method::POST, "/recover")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(|e| network_error("reset_password", e))?;
        expect_success("reset_password", resp).await?;
        Ok(())
    }

    async fn update_user(
        &self,
        token: &AccessToken,
        attributes: UserAttributes,
    ) -> Result<(), IdentityError> {
        let mut body = serde_json::Map::new();
        if let Some(password) = attributes.password {
            body.insert("password".to_string(), password.into());
        }

        let resp = self
            .request(reqwest::Method::PUT, "/user")
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error("update_user", e))?;
        let resp = expect_success("update_user", resp).await?;
        let user = decode::<WireUser>("update_user", resp).await?;

        self.emit(SessionChange {
            event: SessionEvent::UserUpdated,
            session: Some(Session {
                access_token: token.clone(),
                user: user.into_subject(),
                expires_at: None,
            }),
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

    fn provider(base_url: &str) -> GoTrueIdentityProvider {
        GoTrueIdentityProvider::new(GoTrueConfig {
            base_url: base_url.to_string(),
            anon_key: "anon".to_string(),
        })
    }

    #[test]
    fn url_joins_without_double_slash() {
        let p = provider("https://project.example.co/");
        assert_eq!(p.url("/user"), "https://project.example.co/auth/v1/user");
    }

    #[test]
    fn error_message_prefers_msg_then_message() {
        let err: WireError =
            serde_json::from_str(r#"{"msg":"User already registered","error":"x"}"#).unwrap();
        assert_eq!(err.into_message().as_deref(), Some("User already registered"));

        let err: WireError =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(err.into_message().as_deref(), Some("Invalid login credentials"));
    }

    #[test]
    fn sign_up_accepts_user_or_session_shapes() {
        let id = Uuid::new_v4();
        let user = format!(r#"{{"id":"{id}","email":"ada@example.com","aud":"authenticated"}}"#);
        assert!(matches!(
            serde_json::from_str::<SignUpResponse>(&user).unwrap(),
            SignUpResponse::User(u) if u.id == id
        ));

        let session = format!(
            r#"{{"access_token":"t","token_type":"bearer","expires_at":1700000000,"user":{{"id":"{id}","email":"ada@example.com"}}}}"#
        );
        match serde_json::from_str::<SignUpResponse>(&session).unwrap() {
            SignUpResponse::Session(s) => {
                let s = s.into_session();
                assert_eq!(s.subject_id(), UserId::from_uuid(id));
                assert_eq!(s.expires_at.map(|t| t.timestamp()), Some(1_700_000_000));
            }
            other => panic!("expected session, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable_not_rejected() {
        // Port 9 (discard) on loopback is closed in test environments.
        let p = provider("http://127.0.0.1:9");
        let err = p.sign_in_with_password("a@b.co", "secret1").await.unwrap_err();
        assert!(matches!(err, IdentityError::Unavailable(_)));
        assert_eq!(err.user_message(), super::super::PROVIDER_UNAVAILABLE_MESSAGE);
    }
}
