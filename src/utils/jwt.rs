// Unverified JWT payload inspection
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use log::debug;
use serde_json::Value;

/// Check whether a token has the three dot-separated segments of a JWT
#[must_use]
pub fn looks_like_jwt(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}

/// Decode the payload segment of a JWT without verifying its signature
///
/// Only ever used to read display hints (the `email` claim); nothing
/// security-relevant may depend on the result.
///
/// # Errors
///
/// Returns an error if the token is not JWT-shaped or the payload segment
/// is not base64-encoded JSON
pub fn decode_payload_claims(token: &str) -> Result<Value> {
    if !looks_like_jwt(token) {
        return Err(anyhow!("token is not JWT-shaped"));
    }

    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow!("token has no payload segment"))?;

    // Providers emit unpadded base64url; tolerate padded variants too
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| anyhow!("payload segment is not valid base64: {e}"))?;

    let claims: Value = serde_json::from_slice(&payload_bytes)
        .map_err(|e| anyhow!("payload segment is not valid JSON: {e}"))?;

    Ok(claims)
}

/// Read the `email` claim from a JWT-shaped token, if there is one
///
/// Decode failures are non-fatal: the email is a display hint and a link
/// without it still resolves.
#[must_use]
pub fn email_claim(token: &str) -> Option<String> {
    match decode_payload_claims(token) {
        Ok(claims) => claims
            .get("email")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        Err(err) => {
            debug!("Could not read email claim from token: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_token(payload: &Value) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{header}.{body}.fakesignature")
    }

    #[test]
    fn test_looks_like_jwt() {
        assert!(looks_like_jwt("aaa.bbb.ccc"));
        assert!(!looks_like_jwt("aaa.bbb"));
        assert!(!looks_like_jwt("aaa.bbb.ccc.ddd"));
        assert!(!looks_like_jwt(".."));
        assert!(!looks_like_jwt("plain-token"));
    }

    #[test]
    fn test_email_claim_extraction() {
        let token = make_token(&json!({
            "sub": "user-1",
            "email": "user@example.com",
            "exp": 1_234_567_890,
        }));

        assert_eq!(email_claim(&token), Some("user@example.com".to_string()));
    }

    #[test]
    fn test_email_claim_absent() {
        let token = make_token(&json!({ "sub": "user-1" }));
        assert_eq!(email_claim(&token), None);
    }

    #[test]
    fn test_email_claim_tolerates_garbage() {
        assert_eq!(email_claim("not-a-jwt"), None);
        assert_eq!(email_claim("xx.!!notbase64!!.yy"), None);
        assert_eq!(email_claim(""), None);
    }

    #[test]
    fn test_padded_payload_segment() {
        // Some issuers emit padded base64; the decoder strips the padding
        let body = general_purpose::URL_SAFE.encode(br#"{"email":"padded@example.com"}"#);
        let token = format!("hdr.{body}.sig");
        assert_eq!(email_claim(&token), Some("padded@example.com".to_string()));
    }

    #[test]
    fn test_decode_payload_claims_errors() {
        assert!(decode_payload_claims("only-one-segment").is_err());

        let bad_json = general_purpose::URL_SAFE_NO_PAD.encode(b"not json");
        assert!(decode_payload_claims(&format!("hdr.{bad_json}.sig")).is_err());
    }
}
