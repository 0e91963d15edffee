//! Link parsing and token extraction
//!
//! Recovery and invite links carry their payload in the query string, the
//! hash fragment, or both. Providers have shipped several shapes over time
//! (`?code=`, `#access_token=`, `?token_hash=`, error payloads), so
//! extraction scans a fixed key list across both channels and returns a
//! tagged token. Extraction is total: malformed input yields `None`, never
//! a panic or an error.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded;

use crate::models::{AuthFlow, LinkToken};
use crate::utils::jwt;

/// Keys that carry redeemable token material, in scan order
///
/// `access_token` outranks `token_hash` outranks `token` outranks `code`;
/// the first non-empty hit decides the token shape.
const TOKEN_KEYS: [&str; 3] = ["access_token", "token_hash", "token"];

/// Error payloads matching this pattern mean the link is expired or
/// already used, which is recoverable by requesting a fresh link
static EXPIRY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)expired").unwrap());

/// Error code providers send for expired one-time codes
const OTP_EXPIRED_CODE: &str = "otp_expired";

/// Request-scoped view of a link URL: query and fragment parameters
///
/// Parameters from the fragment win over same-named query parameters,
/// because the fragment is what the auth provider appended last.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkLocation {
    query: Vec<(String, String)>,
    fragment: Vec<(String, String)>,
}

impl LinkLocation {
    /// Build a location from a raw query string (no fragment available)
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        Self {
            query: parse_params(query),
            fragment: Vec::new(),
        }
    }

    /// Build a location from separately captured query and fragment strings
    ///
    /// Leading `?` and `#` markers are tolerated; the bridge page forwards
    /// `location.search` and `location.hash` verbatim.
    #[must_use]
    pub fn from_parts(query: &str, fragment: &str) -> Self {
        Self {
            query: parse_params(query),
            fragment: parse_params(fragment),
        }
    }

    /// Build a location from a full URL string
    ///
    /// Splits on `#` and `?` by hand so that even strings `url::Url`
    /// rejects still surface whatever parameters they carry.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let (head, fragment) = match url.split_once('#') {
            Some((head, fragment)) => (head, fragment),
            None => (url, ""),
        };
        let query = match head.split_once('?') {
            Some((_, query)) => query,
            None => "",
        };
        Self::from_parts(query, fragment)
    }

    /// Look up a parameter, fragment first, then query
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        lookup(&self.fragment, key).or_else(|| lookup(&self.query, key))
    }

    /// Whether the location carries no parameters at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.fragment.is_empty()
    }

    /// Whether any fragment parameters were captured
    #[must_use]
    pub fn has_fragment(&self) -> bool {
        !self.fragment.is_empty()
    }
}

fn parse_params(raw: &str) -> Vec<(String, String)> {
    let trimmed = raw.trim_start_matches(['?', '#']);
    if trimmed.is_empty() {
        return Vec::new();
    }
    form_urlencoded::parse(trimmed.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn lookup<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Extract the token material from a link location
///
/// Scan order: token keys, then `code`, then the error payload. Returns
/// `None` when nothing recognizable is present, which keeps the resolver
/// waiting for a late-arriving fragment instead of failing.
#[must_use]
pub fn extract_link_token(location: &LinkLocation) -> Option<LinkToken> {
    let flow = AuthFlow::parse_or_default(location.param("type"));

    if let Some(token) = TOKEN_KEYS
        .iter()
        .find_map(|key| non_empty(location.param(key)))
    {
        let email = non_empty(location.param("email"))
            .map(ToString::to_string)
            .or_else(|| email_from_token(token));
        let refresh_token = non_empty(location.param("refresh_token")).map(ToString::to_string);
        return Some(LinkToken::Token {
            token: token.to_string(),
            flow,
            email,
            refresh_token,
        });
    }

    if let Some(code) = non_empty(location.param("code")) {
        return Some(LinkToken::Code {
            code: code.to_string(),
            flow,
        });
    }

    let code = non_empty(location.param("error_code"))
        .or_else(|| non_empty(location.param("error")))
        .map(ToString::to_string);
    let description = non_empty(location.param("error_description")).map(ToString::to_string);
    if code.is_some() || description.is_some() {
        return Some(LinkToken::ProviderError { code, description });
    }

    None
}

/// Fall back to the unverified `email` claim of JWT-shaped tokens
fn email_from_token(token: &str) -> Option<String> {
    if !jwt::looks_like_jwt(token) {
        return None;
    }
    let email = jwt::email_claim(token);
    if email.is_some() {
        debug!("Recovered email from token claims");
    }
    email
}

/// Classify an error payload as an expired or already-used link
///
/// Matches the `otp_expired` code exactly and the word `expired` anywhere
/// in the code or description, case-insensitively.
#[must_use]
pub fn is_expiry_error(code: Option<&str>, description: Option<&str>) -> bool {
    if code == Some(OTP_EXPIRED_CODE) {
        return true;
    }
    code.is_some_and(|c| EXPIRY_PATTERN.is_match(c))
        || description.is_some_and(|d| EXPIRY_PATTERN.is_match(d))
}
