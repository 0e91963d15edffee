//! Auth backend client
//!
//! The resolver never talks to the hosted auth backend directly; it goes
//! through the `AuthBackend` trait, which mirrors the surface an auth SDK
//! exposes: one-time-code redemption, OTP verification, a local "current
//! session" slot, password updates, and sign-out. The HTTP implementation
//! speaks the GoTrue-flavored REST dialect.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{AuthFlow, ResolvedSession};

pub mod http;

pub use http::HttpAuthBackend;

/// Errors surfaced by auth backend calls
#[derive(Debug, Error)]
pub enum BackendError {
    /// One-time code or token was expired or already consumed
    #[error("one-time code expired or invalid: {message}")]
    OtpExpired { code: String, message: String },

    /// Backend rejected the request with a structured error body
    #[error("auth backend rejected the request ({code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    /// Request never produced a usable response
    #[error("auth backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response arrived but did not match the expected shape
    #[error("unexpected auth backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Whether this failure means the link token itself is dead
    #[must_use]
    pub const fn is_expiry(&self) -> bool {
        matches!(self, Self::OtpExpired { .. })
    }
}

/// Client-side view of the hosted auth backend
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Redeem a one-time authorization code for a session
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the code, the code has
    /// expired, or the request fails
    async fn exchange_code(&self, code: &str) -> Result<ResolvedSession, BackendError>;

    /// Read the locally held session, if a live one exists
    ///
    /// # Errors
    ///
    /// Returns an error if a held session needed a refresh and the
    /// refresh request failed in transit
    async fn current_session(&self) -> Result<Option<ResolvedSession>, BackendError>;

    /// Verify a one-time token of the given flow
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or expired, or the
    /// request fails
    async fn verify_otp(
        &self,
        token_hash: &str,
        flow: AuthFlow,
    ) -> Result<ResolvedSession, BackendError>;

    /// Validate a token pair and make it the locally held session
    ///
    /// # Errors
    ///
    /// Returns an error if neither the access token nor the refresh token
    /// is accepted by the backend
    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ResolvedSession, BackendError>;

    /// Update the password of the user the access token belongs to
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not accepted or the password is
    /// rejected (for example by a strength policy)
    async fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> Result<(), BackendError>;

    /// Drop the locally held session and best-effort revoke it remotely
    ///
    /// # Errors
    ///
    /// Currently infallible in practice: remote revocation failures are
    /// logged, not surfaced
    async fn sign_out(&self) -> Result<(), BackendError>;
}

/// Session body returned by the token and verify endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SessionPayload {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<UserPayload>,
}

/// User record as the backend serializes it
///
/// Only the fields the resolver reads; the backend sends many more.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl SessionPayload {
    /// Convert the wire payload into the resolver's session type
    ///
    /// `expires_in` is relative to receipt, so the absolute expiry is
    /// pinned here.
    #[must_use]
    pub fn into_resolved(self) -> ResolvedSession {
        let expires_at = self
            .expires_in
            .map(|seconds| Utc::now() + Duration::seconds(seconds));
        ResolvedSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token.unwrap_or_default(),
            email: self.user.and_then(|user| user.email),
            expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_payload_conversion() {
        let payload: SessionPayload = serde_json::from_str(
            r#"{
                "access_token": "t1",
                "refresh_token": "r1",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": {"id": "u-1", "email": "a@b.com"}
            }"#,
        )
        .unwrap();

        let session = payload.into_resolved();
        assert_eq!(session.access_token, "t1");
        assert_eq!(session.refresh_token, "r1");
        assert_eq!(session.email, Some("a@b.com".to_string()));

        let expires_at = session.expires_at.unwrap();
        let delta = expires_at - Utc::now();
        assert!(delta > Duration::minutes(59) && delta <= Duration::hours(1));
    }

    #[test]
    fn test_session_payload_tolerates_sparse_bodies() {
        let payload: SessionPayload =
            serde_json::from_str(r#"{"access_token": "t1"}"#).unwrap();
        let session = payload.into_resolved();
        assert_eq!(session.refresh_token, "");
        assert_eq!(session.email, None);
        assert_eq!(session.expires_at, None);
    }

    #[test]
    fn test_backend_error_expiry_detection() {
        let expired = BackendError::OtpExpired {
            code: "otp_expired".to_string(),
            message: "Email link is invalid or has expired".to_string(),
        };
        assert!(expired.is_expiry());

        let rejected = BackendError::Rejected {
            status: 401,
            code: "invalid_grant".to_string(),
            message: "Invalid code".to_string(),
        };
        assert!(!rejected.is_expiry());
    }
}
