//! HTTP client for the quill API.
//!
//! Holds the caller's session the way a browser client would: `sign_in`
//! stores it and announces `SIGNED_IN`, `sign_out` clears it and announces
//! `SIGNED_OUT`. Subscribers (the session observer) see every transition.

use std::sync::RwLock;

use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use quill_auth::{Session, SessionChange, UserProfile};
use quill_core::UserId;

use crate::source::{FetchError, ProfileFetcher, SessionSource};

const EVENT_BUFFER: usize = 32;

/// Login/logout response body: either a tagged success or `{error}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionResponse {
    Error { error: String },
    Success {
        #[serde(default)]
        session: Option<Session>,
    },
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionChange>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            session: RwLock::new(None),
            events,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn session(&self) -> Option<Session> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    fn store_session(&self, session: Option<Session>) {
        if let Ok(mut slot) = self.session.write() {
            *slot = session;
        }
    }

    fn bearer(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session() {
            Some(session) => req.bearer_auth(session.access_token.as_str()),
            None => req,
        }
    }

    async fn post_action(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<Option<Session>, FetchError> {
        let resp = self
            .bearer(self.http.post(self.url(path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| FetchError::Network(e.to_string()))?;
        match serde_json::from_str::<ActionResponse>(&text) {
            Ok(ActionResponse::Error { error }) => Err(FetchError::Rejected(error)),
            Ok(ActionResponse::Success { session }) if status.is_success() => Ok(session),
            _ => Err(FetchError::Status {
                status: status.as_u16(),
                body: text,
            }),
        }
    }

    /// Sign in and remember the session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, FetchError> {
        let session = self
            .post_action("/auth/login", json!({ "email": email, "password": password }))
            .await?
            .ok_or_else(|| FetchError::Decode("login response carried no session".to_string()))?;

        self.store_session(Some(session.clone()));
        let _ = self.events.send(SessionChange::signed_in(session.clone()));
        tracing::debug!(user_id = %session.subject_id(), "client signed in");
        Ok(session)
    }

    /// Sign out. The local session is cleared even if the server call fails.
    pub async fn sign_out(&self) -> Result<(), FetchError> {
        let result = self.post_action("/auth/logout", json!({})).await.map(|_| ());
        self.store_session(None);
        let _ = self.events.send(SessionChange::signed_out());
        result
    }
}

#[async_trait::async_trait]
impl SessionSource for ApiClient {
    async fn current_session(&self) -> Result<Option<Session>, FetchError> {
        Ok(self.session().filter(|s| !s.is_expired(Utc::now())))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }
}

#[async_trait::async_trait]
impl ProfileFetcher for ApiClient {
    async fn fetch_profile(&self, id: &UserId) -> Result<Option<UserProfile>, FetchError> {
        let resp = self
            .bearer(self.http.get(self.url(&format!("/api/users/{id}"))))
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => resp
                .json::<UserProfile>()
                .await
                .map(Some)
                .map_err(|e| FetchError::Decode(e.to_string())),
            status => Err(FetchError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_response_shapes() {
        let err: ActionResponse =
            serde_json::from_str(r#"{"error":"Invalid login credentials"}"#).unwrap();
        assert!(
            matches!(err, ActionResponse::Error { error } if error == "Invalid login credentials")
        );

        let ok: ActionResponse =
            serde_json::from_str(r#"{"success":true,"redirect":"/login"}"#).unwrap();
        assert!(matches!(ok, ActionResponse::Success { session: None }));
    }

    #[tokio::test]
    async fn fresh_client_has_no_session() {
        let client = ApiClient::new("http://127.0.0.1:9/");
        assert_eq!(client.current_session().await, Ok(None));
        assert_eq!(client.url("/health"), "http://127.0.0.1:9/health");
    }

    #[tokio::test]
    async fn sign_out_clears_and_announces_even_when_offline() {
        let client = ApiClient::new("http://127.0.0.1:9");
        let mut events = client.subscribe();
        assert!(client.sign_out().await.is_err());
        assert_eq!(events.recv().await.unwrap(), SessionChange::signed_out());
        assert_eq!(client.session(), None);
    }
}
