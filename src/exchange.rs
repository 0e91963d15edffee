//! Session exchange cascade
//!
//! Turning link token material into a live session is a chain of
//! responsibility: redeem an authorization code, fall back to a session
//! the backend already established, and finally verify the raw token as a
//! one-time password. Individual strategy failures are logged and the
//! cascade moves on; only exhaustion fails the exchange.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, warn};
use thiserror::Error;

use crate::backend::{AuthBackend, BackendError};
use crate::models::{LinkToken, ResolvedSession};
use crate::utils::logging::LoggingHelper;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange already ran for this attempt; duplicate triggers
    /// (hash changes, re-renders) are benign no-ops
    #[error("session exchange already applied for this attempt")]
    AlreadyApplied,

    /// The token material cannot be redeemed by any strategy
    #[error("nothing redeemable on the link: {0}")]
    Unsupported(String),

    /// The backend marked the token expired or already used
    #[error("link expired or invalid ({code})")]
    Expired {
        code: String,
        description: Option<String>,
    },

    /// Every applicable strategy failed
    #[error("all exchange strategies failed: {0}")]
    Exhausted(String),
}

/// Ordered strategies of the cascade
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    CodeExchange,
    ExistingSession,
    OtpVerification,
}

impl Strategy {
    const CASCADE: [Self; 3] = [
        Self::CodeExchange,
        Self::ExistingSession,
        Self::OtpVerification,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::CodeExchange => "code_exchange",
            Self::ExistingSession => "existing_session",
            Self::OtpVerification => "otp_verification",
        }
    }
}

/// One session exchange, scoped to a single resolution attempt
///
/// The applied gate makes the exchange idempotent within the attempt: the
/// first caller runs the cascade, every later caller gets
/// `AlreadyApplied` without a single backend call.
pub struct SessionExchanger<'a> {
    backend: &'a dyn AuthBackend,
    applied: AtomicBool,
}

impl<'a> SessionExchanger<'a> {
    #[must_use]
    pub fn new(backend: &'a dyn AuthBackend) -> Self {
        Self {
            backend,
            applied: AtomicBool::new(false),
        }
    }

    /// Run the cascade once for this attempt
    ///
    /// # Errors
    ///
    /// Returns `AlreadyApplied` on re-entry, `Expired` when the backend
    /// rejected the token as dead, `Unsupported` for token material no
    /// strategy can redeem, and `Exhausted` when every strategy failed
    pub async fn exchange(&self, token: &LinkToken) -> Result<ResolvedSession, ExchangeError> {
        if self.applied.swap(true, Ordering::SeqCst) {
            debug!("Exchange re-entry suppressed by the applied gate");
            return Err(ExchangeError::AlreadyApplied);
        }

        if let LinkToken::ProviderError { .. } = token {
            return Err(ExchangeError::Unsupported(
                "provider error payloads are not redeemable".to_string(),
            ));
        }

        let mut expiry: Option<(String, String)> = None;
        let mut failures: Vec<String> = Vec::new();

        for strategy in Strategy::CASCADE {
            match self.attempt(strategy, token).await {
                Ok(Some(session)) => {
                    LoggingHelper::log_session_obtained(strategy.name(), session.email.as_deref());
                    return Ok(session);
                }
                Ok(None) => {}
                Err(err) => {
                    LoggingHelper::log_strategy_failed(strategy.name(), &err.to_string());
                    if let BackendError::OtpExpired { code, message } = &err {
                        expiry = Some((code.clone(), message.clone()));
                    }
                    failures.push(format!("{}: {err}", strategy.name()));
                }
            }
        }

        if let Some((code, message)) = expiry {
            return Err(ExchangeError::Expired {
                code,
                description: Some(message),
            });
        }

        Err(ExchangeError::Exhausted(failures.join("; ")))
    }

    /// Run one strategy; `Ok(None)` means it does not apply to this token
    async fn attempt(
        &self,
        strategy: Strategy,
        token: &LinkToken,
    ) -> Result<Option<ResolvedSession>, BackendError> {
        match (strategy, token) {
            (Strategy::CodeExchange, LinkToken::Code { code, .. }) => {
                let fresh = self.backend.exchange_code(code).await?;
                Ok(Some(self.apply(fresh).await))
            }
            (Strategy::ExistingSession, _) => self.existing_session(token).await,
            (Strategy::OtpVerification, LinkToken::Code { code, flow }) => {
                let fresh = self.backend.verify_otp(code, *flow).await?;
                Ok(Some(self.apply(fresh).await))
            }
            (Strategy::OtpVerification, LinkToken::Token { token, flow, .. }) => {
                let fresh = self.backend.verify_otp(token, *flow).await?;
                Ok(Some(self.apply(fresh).await))
            }
            _ => Ok(None),
        }
    }

    /// The existing-session strategy: a session the backend established on
    /// its own, or one materialized from a token pair carried on the link
    async fn existing_session(
        &self,
        token: &LinkToken,
    ) -> Result<Option<ResolvedSession>, BackendError> {
        if let Some(current) = self.backend.current_session().await? {
            debug!("Reusing session the backend already established");
            return Ok(Some(current));
        }

        if let LinkToken::Token {
            token,
            refresh_token: Some(refresh_token),
            ..
        } = token
        {
            let session = self.backend.set_session(token, refresh_token).await?;
            return Ok(Some(session));
        }

        Ok(None)
    }

    /// Make a freshly minted session the current one
    ///
    /// Clears any stale session first so credentials from an old tab never
    /// mix with the new ones. Apply failures are non-fatal: the fresh
    /// tokens are already valid and the caller only forwards them.
    async fn apply(&self, fresh: ResolvedSession) -> ResolvedSession {
        if let Err(err) = self.backend.sign_out().await {
            warn!("Could not clear pre-existing session: {err}");
        }

        match self
            .backend
            .set_session(&fresh.access_token, &fresh.refresh_token)
            .await
        {
            Ok(applied) => applied,
            Err(err) => {
                warn!("Could not apply freshly exchanged session: {err}");
                fresh
            }
        }
    }
}
