use thiserror::Error;

use crate::exchange::ExchangeError;

/// Failure taxonomy for a single link-resolution attempt
///
/// Nothing here is fatal to the process. Each variant degrades to a
/// terminal outcome: a login redirect with an explanatory message, the
/// recoverable expired-link screen, or (for `ProfileSyncFailed`) a log
/// line on an otherwise successful attempt.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Link could not be parsed or is missing required parameters
    #[error("malformed link: {0}")]
    MalformedLink(String),

    /// One-time token was rejected as expired or already used
    #[error("link expired or invalid ({code})")]
    ExpiredOrInvalidLink {
        code: String,
        description: Option<String>,
    },

    /// Every exchange strategy was exhausted without producing a session
    #[error("session exchange failed: {0}")]
    ExchangeFailed(String),

    /// Session obtained but a follow-up profile read failed
    #[error("profile sync failed: {0}")]
    ProfileSyncFailed(String),
}

impl ResolveError {
    /// Short human-readable message carried on the login redirect
    #[must_use]
    pub fn login_message(&self) -> String {
        match self {
            Self::MalformedLink(_) => {
                "This link is incomplete or malformed. Please request a new one.".to_string()
            }
            Self::ExpiredOrInvalidLink { description, .. } => description
                .clone()
                .unwrap_or_else(|| "This link has expired. Please request a new one.".to_string()),
            Self::ExchangeFailed(_) => {
                "We could not verify this link. Please request a new one.".to_string()
            }
            Self::ProfileSyncFailed(_) => String::new(),
        }
    }
}

impl From<ExchangeError> for ResolveError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Expired { code, description } => {
                Self::ExpiredOrInvalidLink { code, description }
            }
            ExchangeError::Unsupported(reason) => Self::MalformedLink(reason),
            ExchangeError::AlreadyApplied | ExchangeError::Exhausted(_) => {
                Self::ExchangeFailed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_messages_are_human_readable() {
        let malformed = ResolveError::MalformedLink("no parameters".to_string());
        assert!(malformed.login_message().contains("request a new one"));

        let expired = ResolveError::ExpiredOrInvalidLink {
            code: "otp_expired".to_string(),
            description: Some("Email link has expired".to_string()),
        };
        assert_eq!(expired.login_message(), "Email link has expired");

        let expired_no_detail = ResolveError::ExpiredOrInvalidLink {
            code: "otp_expired".to_string(),
            description: None,
        };
        assert!(expired_no_detail.login_message().contains("expired"));
    }

    #[test]
    fn test_exchange_error_mapping() {
        let expired: ResolveError = ExchangeError::Expired {
            code: "otp_expired".to_string(),
            description: None,
        }
        .into();
        assert!(matches!(expired, ResolveError::ExpiredOrInvalidLink { .. }));

        let exhausted: ResolveError =
            ExchangeError::Exhausted("all strategies failed".to_string()).into();
        assert!(matches!(exhausted, ResolveError::ExchangeFailed(_)));

        let unsupported: ResolveError =
            ExchangeError::Unsupported("provider error is not redeemable".to_string()).into();
        assert!(matches!(unsupported, ResolveError::MalformedLink(_)));
    }
}
