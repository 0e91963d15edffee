//! Test fixtures providing pre-built test objects
//!
//! Commonly used test data and configurations, so test files don't
//! recreate the same sessions and settings over and over.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};

use crate::models::ResolvedSession;
use crate::settings::{AuthBackendSettings, DestinationSettings, PassbridgeSettings};

use super::constants::{TEST_ACCESS_TOKEN, TEST_API_KEY, TEST_EMAIL, TEST_REFRESH_TOKEN};

/// The standard resolved session: `t1` / `r1` for the fixture user
#[must_use]
pub fn resolved_session() -> ResolvedSession {
    ResolvedSession {
        access_token: TEST_ACCESS_TOKEN.to_string(),
        refresh_token: TEST_REFRESH_TOKEN.to_string(),
        email: Some(TEST_EMAIL.to_string()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}

/// A structurally valid JWT with the given email and expiry claims
///
/// The signature is junk; only good for code paths that read claims
/// without verifying.
#[must_use]
pub fn jwt_access_token(email: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = serde_json::json!({
        "sub": "11111111-1111-1111-1111-111111111111",
        "email": email,
        "exp": exp,
    });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2ln")
}

/// Default destination settings: same-origin paths, `app` scheme
#[must_use]
pub fn destination_settings() -> DestinationSettings {
    DestinationSettings::default()
}

/// Auth backend settings pointing at a local test address
#[must_use]
pub fn auth_backend_settings() -> AuthBackendSettings {
    AuthBackendSettings {
        base_url: "http://localhost:9999/auth/v1".to_string(),
        api_key: TEST_API_KEY.to_string(),
        timeout_secs: 5,
    }
}

/// Full settings with test defaults
#[must_use]
pub fn settings() -> PassbridgeSettings {
    PassbridgeSettings {
        auth_backend: auth_backend_settings(),
        ..PassbridgeSettings::default()
    }
}
