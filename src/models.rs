use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Flow carried by the `type` parameter of a recovery or invite link
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthFlow {
    Recovery,
    Invite,
}

impl AuthFlow {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recovery => "recovery",
            Self::Invite => "invite",
        }
    }

    /// Parse the `type` parameter, defaulting to `Recovery` when the value
    /// is missing or unrecognized (links that omit it are recovery links)
    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value {
            Some("invite") => Self::Invite,
            _ => Self::Recovery,
        }
    }
}

/// Token material extracted from a link, tagged by how it must be redeemed
///
/// `Token` does not distinguish `access_token` from `token_hash`: providers
/// have shipped both shapes for the same flows, and the exchange cascade
/// tries each interpretation in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkToken {
    /// One-time authorization code (`?code=`), redeemed via code exchange
    Code { code: String, flow: AuthFlow },
    /// Opaque token from `access_token`, `token_hash` or `token`
    Token {
        token: String,
        flow: AuthFlow,
        email: Option<String>,
        refresh_token: Option<String>,
    },
    /// Provider-reported failure carried on the link itself
    ProviderError {
        code: Option<String>,
        description: Option<String>,
    },
}

impl LinkToken {
    #[must_use]
    pub const fn is_provider_error(&self) -> bool {
        matches!(self, Self::ProviderError { .. })
    }

    /// Short label for log lines
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Code { .. } => "code",
            Self::Token { .. } => "token",
            Self::ProviderError { .. } => "provider_error",
        }
    }
}

/// Session produced by the exchange cascade
///
/// Forwarded to the password form as query parameters; never persisted by
/// this service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResolvedSession {
    /// Check whether the session is past (or within one minute of) expiry
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now() + chrono::Duration::minutes(1),
            None => false,
        }
    }
}

/// Coarse device classification derived from the User-Agent
///
/// Drives presentation only (deep link vs. web redirect); never treated as
/// a security boundary.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Desktop,
}

impl DeviceClass {
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(self, Self::Mobile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_auth_flow_parsing() {
        assert_eq!(AuthFlow::parse_or_default(Some("invite")), AuthFlow::Invite);
        assert_eq!(
            AuthFlow::parse_or_default(Some("recovery")),
            AuthFlow::Recovery
        );

        // Missing and unknown values fall back to recovery
        assert_eq!(AuthFlow::parse_or_default(None), AuthFlow::Recovery);
        assert_eq!(
            AuthFlow::parse_or_default(Some("magiclink")),
            AuthFlow::Recovery
        );
        assert_eq!(AuthFlow::parse_or_default(Some("")), AuthFlow::Recovery);
    }

    #[test]
    fn test_auth_flow_round_trips_as_str() {
        assert_eq!(AuthFlow::Recovery.as_str(), "recovery");
        assert_eq!(AuthFlow::Invite.as_str(), "invite");
        assert_eq!(
            AuthFlow::parse_or_default(Some(AuthFlow::Invite.as_str())),
            AuthFlow::Invite
        );
    }

    #[test]
    fn test_link_token_provider_error_detection() {
        let error = LinkToken::ProviderError {
            code: Some("otp_expired".to_string()),
            description: None,
        };
        assert!(error.is_provider_error());

        let code = LinkToken::Code {
            code: "abc123".to_string(),
            flow: AuthFlow::Recovery,
        };
        assert!(!code.is_provider_error());
    }

    #[test]
    fn test_resolved_session_expiry() {
        let live = ResolvedSession {
            access_token: "t1".to_string(),
            refresh_token: "r1".to_string(),
            email: None,
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        };
        assert!(!live.is_expired());

        let stale = ResolvedSession {
            expires_at: Some(Utc::now() - chrono::Duration::minutes(5)),
            ..live.clone()
        };
        assert!(stale.is_expired());

        // Sessions within the one-minute buffer count as expired
        let expiring = ResolvedSession {
            expires_at: Some(Utc::now() + chrono::Duration::seconds(30)),
            ..live.clone()
        };
        assert!(expiring.is_expired());

        // No expiry information means the session is taken at face value
        let unbounded = ResolvedSession {
            expires_at: None,
            ..live
        };
        assert!(!unbounded.is_expired());
    }

    #[test]
    fn test_device_class() {
        assert!(DeviceClass::Mobile.is_mobile());
        assert!(!DeviceClass::Desktop.is_mobile());
    }
}
