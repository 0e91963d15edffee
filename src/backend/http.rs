//! Reqwest implementation of the auth backend client
//!
//! Targets the GoTrue-flavored REST surface hosted auth backends expose:
//! `/token` (pkce and refresh grants), `/verify`, `/user`, `/logout`.
//! Every request carries the configured `apikey` header; user-scoped
//! requests add a bearer token on top.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::{AuthBackend, BackendError, SessionPayload, UserPayload};
use crate::link;
use crate::models::{AuthFlow, ResolvedSession};
use crate::settings::AuthBackendSettings;
use crate::utils::jwt;

/// Shared HTTP client; backend instances are per-attempt, the client is not
static CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

pub struct HttpAuthBackend {
    base_url: String,
    api_key: String,
    timeout: Duration,
    // Local session slot, the way an auth SDK would keep one. Never held
    // across an await.
    session: Mutex<Option<ResolvedSession>>,
}

impl HttpAuthBackend {
    #[must_use]
    pub fn new(settings: &AuthBackendSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
            session: Mutex::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        bearer: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let request = CLIENT
            .request(method, self.endpoint(path))
            .timeout(self.timeout)
            .header("apikey", &self.api_key);
        match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_for_session(
        &self,
        path: &str,
        body: Value,
    ) -> Result<ResolvedSession, BackendError> {
        debug!("POST {path}");
        let response = self
            .request(reqwest::Method::POST, path, None)
            .json(&body)
            .send()
            .await?;
        let payload = parse_body::<SessionPayload>(response).await?;
        Ok(payload.into_resolved())
    }

    async fn fetch_user(&self, access_token: &str) -> Result<UserPayload, BackendError> {
        debug!("GET /user");
        let response = self
            .request(reqwest::Method::GET, "/user", Some(access_token))
            .send()
            .await?;
        parse_body::<UserPayload>(response).await
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<ResolvedSession, BackendError> {
        self.post_for_session(
            "/token?grant_type=refresh_token",
            json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    fn store_session(&self, session: &ResolvedSession) {
        if let Ok(mut slot) = self.session.lock() {
            *slot = Some(session.clone());
        }
    }

    fn take_session(&self) -> Option<ResolvedSession> {
        self.session.lock().ok().and_then(|mut slot| slot.take())
    }

    fn peek_session(&self) -> Option<ResolvedSession> {
        self.session.lock().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn exchange_code(&self, code: &str) -> Result<ResolvedSession, BackendError> {
        self.post_for_session("/token?grant_type=pkce", json!({ "auth_code": code }))
            .await
    }

    async fn current_session(&self) -> Result<Option<ResolvedSession>, BackendError> {
        let Some(held) = self.peek_session() else {
            return Ok(None);
        };

        if !held.is_expired() {
            return Ok(Some(held));
        }

        // Held session has lapsed; refresh it if we can, drop it if not
        if held.refresh_token.is_empty() {
            self.take_session();
            return Ok(None);
        }

        match self.refresh_grant(&held.refresh_token).await {
            Ok(refreshed) => {
                self.store_session(&refreshed);
                Ok(Some(refreshed))
            }
            Err(err) => {
                warn!("Could not refresh held session: {err}");
                self.take_session();
                Ok(None)
            }
        }
    }

    async fn verify_otp(
        &self,
        token_hash: &str,
        flow: AuthFlow,
    ) -> Result<ResolvedSession, BackendError> {
        self.post_for_session(
            "/verify",
            json!({ "type": flow.as_str(), "token_hash": token_hash }),
        )
        .await
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ResolvedSession, BackendError> {
        // Validate the access token first; only fall back to the refresh
        // grant when the backend no longer accepts it
        match self.fetch_user(access_token).await {
            Ok(user) => {
                let session = ResolvedSession {
                    access_token: access_token.to_string(),
                    refresh_token: refresh_token.to_string(),
                    email: user.email,
                    expires_at: token_expiry(access_token),
                };
                self.store_session(&session);
                Ok(session)
            }
            Err(err @ BackendError::Transport(_)) => Err(err),
            Err(err) => {
                debug!("Access token not accepted ({err}); trying refresh grant");
                let session = self.refresh_grant(refresh_token).await?;
                self.store_session(&session);
                Ok(session)
            }
        }
    }

    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), BackendError> {
        debug!("PUT /user (password update)");
        let response = self
            .request(reqwest::Method::PUT, "/user", Some(access_token))
            .json(&json!({ "password": new_password }))
            .send()
            .await?;
        parse_body::<UserPayload>(response).await.map(|_| ())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(held) = self.take_session() else {
            return Ok(());
        };

        // Remote revocation is best-effort; the local slot is already clear
        let result = self
            .request(reqwest::Method::POST, "/logout", Some(&held.access_token))
            .send()
            .await;
        if let Err(err) = result {
            warn!("Sign-out revocation failed (ignored): {err}");
        }
        Ok(())
    }
}

/// Absolute expiry from the unverified `exp` claim, when the token carries
/// one
fn token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    let claims = jwt::decode_payload_claims(access_token).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

async fn parse_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(error_from_body(status.as_u16(), &body));
    }

    serde_json::from_str::<T>(&body)
        .map_err(|err| BackendError::InvalidResponse(format!("{err} in {status} response")))
}

/// Map a structured error body to a `BackendError`
///
/// The backend has shipped two body dialects over time:
/// `{"error_code": …, "msg": …}` and `{"error": …, "error_description": …}`.
/// Both are read, and expiry-shaped payloads get their own variant so the
/// resolver can branch on them.
fn error_from_body(status: u16, body: &str) -> BackendError {
    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    let code = ["error_code", "error", "code"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .unwrap_or("request_failed")
        .to_string();
    let message = ["msg", "message", "error_description"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map_or_else(|| format!("HTTP {status}"), ToString::to_string);

    if link::is_expiry_error(Some(&code), Some(&message)) {
        BackendError::OtpExpired { code, message }
    } else {
        BackendError::Rejected {
            status,
            code,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn backend() -> HttpAuthBackend {
        HttpAuthBackend::new(&AuthBackendSettings {
            base_url: "http://localhost:9999/auth/v1/".to_string(),
            api_key: "test-key".to_string(),
            timeout_secs: 5,
        })
    }

    #[test]
    fn test_endpoint_building_trims_trailing_slash() {
        let backend = backend();
        assert_eq!(
            backend.endpoint("/token?grant_type=pkce"),
            "http://localhost:9999/auth/v1/token?grant_type=pkce"
        );
        assert_eq!(backend.endpoint("/user"), "http://localhost:9999/auth/v1/user");
    }

    #[test]
    fn test_error_body_mapping_gotrue_dialect() {
        let err = error_from_body(
            403,
            r#"{"error_code": "otp_expired", "msg": "Email link is invalid or has expired"}"#,
        );
        assert!(matches!(err, BackendError::OtpExpired { .. }));

        let err = error_from_body(400, r#"{"error_code": "validation_failed", "msg": "bad"}"#);
        match err {
            BackendError::Rejected { status, code, .. } => {
                assert_eq!(status, 400);
                assert_eq!(code, "validation_failed");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_error_body_mapping_oauth_dialect() {
        let err = error_from_body(
            401,
            r#"{"error": "access_denied", "error_description": "Link has expired"}"#,
        );
        assert!(matches!(err, BackendError::OtpExpired { .. }));
    }

    #[test]
    fn test_error_body_mapping_unstructured() {
        let err = error_from_body(502, "upstream down");
        match err {
            BackendError::Rejected {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 502);
                assert_eq!(code, "request_failed");
                assert_eq!(message, "HTTP 502");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_token_expiry_claim() {
        let token = fixtures::jwt_access_token("a@b.com", 1_900_000_000);
        let expiry = token_expiry(&token).expect("expiry claim");
        assert_eq!(expiry.timestamp(), 1_900_000_000);

        assert_eq!(token_expiry("opaque-token"), None);
    }

    #[tokio::test]
    async fn test_session_slot_lifecycle() {
        let backend = backend();
        assert!(backend.current_session().await.unwrap().is_none());

        let session = fixtures::resolved_session();
        backend.store_session(&session);
        let held = backend.current_session().await.unwrap().expect("held session");
        assert_eq!(held.access_token, session.access_token);

        // An expired session without a refresh token is dropped outright
        let mut stale = fixtures::resolved_session();
        stale.refresh_token = String::new();
        stale.expires_at = Some(Utc::now() - chrono::Duration::minutes(10));
        backend.store_session(&stale);
        assert!(backend.current_session().await.unwrap().is_none());
        assert!(backend.peek_session().is_none());
    }
}
