//! Link resolution state machine
//!
//! Drives one attempt from a captured location to a terminal outcome:
//! redirect to the password form, hand off to the native app, show the
//! expired screen, fall back to the web form, or give up to login.
//! Timers are owned by the in-flight future, so reaching a terminal
//! outcome drops every pending poll, ceiling and grace timer.

use std::time::Duration;

use log::debug;
use tokio::time::{self, Instant};

use crate::backend::AuthBackend;
use crate::error::ResolveError;
use crate::exchange::{ExchangeError, SessionExchanger};
use crate::link::{extract_link_token, is_expiry_error, LinkLocation};
use crate::models::{AuthFlow, DeviceClass, LinkToken};
use crate::navigation::DestinationPlanner;
use crate::resolver::feed::{LinkEvent, LinkEvents, Navigator};
use crate::settings::ResolverSettings;
use crate::utils::logging::LoggingHelper;

/// Timing knobs of one resolution attempt
#[derive(Clone, Copy, Debug)]
pub struct ResolverOptions {
    /// How often the current location is re-read while waiting for a token
    pub poll_interval: Duration,
    /// How long to wait for a token before giving up to login
    pub discovery_ceiling: Duration,
    /// How long a mobile handoff may take before the web form is shown
    pub handoff_grace: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            discovery_ceiling: Duration::from_millis(5000),
            handoff_grace: Duration::from_millis(2000),
        }
    }
}

impl From<&ResolverSettings> for ResolverOptions {
    fn from(settings: &ResolverSettings) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            discovery_ceiling: Duration::from_millis(settings.discovery_ceiling_ms),
            handoff_grace: Duration::from_millis(settings.handoff_grace_ms),
        }
    }
}

/// States a resolution attempt moves through
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    Processing,
    Redirecting,
    AwaitingAppHandoff,
    ShowingExpiredError,
    ShowingWebForm,
}

impl ResolverState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Redirecting => "redirecting",
            Self::AwaitingAppHandoff => "awaiting_app_handoff",
            Self::ShowingExpiredError => "showing_expired_error",
            Self::ShowingWebForm => "showing_web_form",
        }
    }
}

/// Terminal result of a resolution attempt
///
/// Every variant carries the material the hosting surface needs to act;
/// the resolver itself never renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A session was obtained; send the browser to the password form
    RedirectToPasswordForm { url: String },
    /// Control was handed to the native app via a deep link; when the
    /// surface could not observe the handoff, `fallback_url` names the
    /// web form to fall back to after the grace window
    RedirectToApp {
        deep_link: String,
        fallback_url: Option<String>,
    },
    /// The link expired; render the expired screen
    ShowExpiredError {
        code: Option<String>,
        description: Option<String>,
    },
    /// The app never took over; render the web password form
    ShowWebForm { url: String },
    /// Nothing redeemable; send the browser to login
    RedirectToLogin { url: String },
}

impl Outcome {
    /// Short label for log lines
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::RedirectToPasswordForm { .. } => "redirect_to_password_form",
            Self::RedirectToApp { .. } => "redirect_to_app",
            Self::ShowExpiredError { .. } => "show_expired_error",
            Self::ShowWebForm { .. } => "show_web_form",
            Self::RedirectToLogin { .. } => "redirect_to_login",
        }
    }

    /// The state the attempt terminates in
    #[must_use]
    pub const fn terminal_state(&self) -> ResolverState {
        match self {
            Self::RedirectToPasswordForm { .. } | Self::RedirectToLogin { .. } => {
                ResolverState::Redirecting
            }
            Self::RedirectToApp { .. } => ResolverState::AwaitingAppHandoff,
            Self::ShowExpiredError { .. } => ResolverState::ShowingExpiredError,
            Self::ShowWebForm { .. } => ResolverState::ShowingWebForm,
        }
    }
}

/// One-attempt driver from link material to a terminal outcome
pub struct LinkResolver<'a> {
    backend: &'a dyn AuthBackend,
    planner: &'a DestinationPlanner,
    navigator: &'a dyn Navigator,
    options: ResolverOptions,
}

impl<'a> LinkResolver<'a> {
    #[must_use]
    pub fn new(
        backend: &'a dyn AuthBackend,
        planner: &'a DestinationPlanner,
        navigator: &'a dyn Navigator,
    ) -> Self {
        Self {
            backend,
            planner,
            navigator,
            options: ResolverOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve a captured location to a terminal outcome
    ///
    /// Never fails: every error path maps to an outcome the surface can
    /// present. `surface` names the caller for log correlation.
    pub async fn resolve(
        &self,
        surface: &str,
        location: LinkLocation,
        device: DeviceClass,
        events: &mut dyn LinkEvents,
    ) -> Outcome {
        let attempt_id = LoggingHelper::new_attempt_id();
        debug!(
            "Attempt {attempt_id}: {} -> {}",
            ResolverState::Idle.as_str(),
            ResolverState::Processing.as_str()
        );

        let outcome = match extract_link_token(&location) {
            Some(token) => {
                LoggingHelper::log_attempt_started(attempt_id, surface, token.kind(), device);
                self.dispatch(token, device, events).await
            }
            None => {
                LoggingHelper::log_attempt_started(attempt_id, surface, "none", device);
                self.discover(device, events).await
            }
        };

        debug!(
            "Attempt {attempt_id}: {} -> {}",
            ResolverState::Processing.as_str(),
            outcome.terminal_state().as_str()
        );
        LoggingHelper::log_outcome(attempt_id, outcome.label());
        outcome
    }

    /// Route extracted token material to its handler
    async fn dispatch(
        &self,
        token: LinkToken,
        device: DeviceClass,
        events: &mut dyn LinkEvents,
    ) -> Outcome {
        match token {
            LinkToken::ProviderError { code, description } => {
                self.provider_error(code, description, device).await
            }
            LinkToken::Token {
                ref token,
                flow,
                ref email,
                ref refresh_token,
            } if device.is_mobile() => {
                self.handoff(
                    token,
                    flow,
                    refresh_token.as_deref(),
                    email.as_deref(),
                    events,
                )
                .await
            }
            redeemable => self.exchange(redeemable, device).await,
        }
    }

    /// Present a provider-reported error without touching the backend
    async fn provider_error(
        &self,
        code: Option<String>,
        description: Option<String>,
        device: DeviceClass,
    ) -> Outcome {
        if device.is_mobile() {
            // The native app renders provider errors itself
            let deep_link = self
                .planner
                .error_handoff_link(code.as_deref(), description.as_deref());
            self.navigator.navigate(&deep_link).await;
            return Outcome::RedirectToApp {
                deep_link,
                fallback_url: None,
            };
        }

        if is_expiry_error(code.as_deref(), description.as_deref()) {
            return Outcome::ShowExpiredError { code, description };
        }

        let message = description
            .or(code)
            .unwrap_or_else(|| "The sign-in link was rejected".to_string());
        self.login_dead_end(device, &message).await
    }

    /// Redeem a code or token through the exchange cascade
    async fn exchange(&self, token: LinkToken, device: DeviceClass) -> Outcome {
        let flow = token_flow(&token);
        let exchanger = SessionExchanger::new(self.backend);

        match exchanger.exchange(&token).await {
            Ok(session) => {
                let url = self.planner.password_form_url(&session, flow);
                self.navigator.navigate(&url).await;
                Outcome::RedirectToPasswordForm { url }
            }
            Err(ExchangeError::Expired { code, description }) => {
                self.provider_error(Some(code), description, device).await
            }
            Err(err) => {
                let message = ResolveError::from(err).login_message();
                self.login_dead_end(device, &message).await
            }
        }
    }

    /// Hand a raw token to the native app, falling back to the web form
    /// when the app does not take over within the grace window
    async fn handoff(
        &self,
        token: &str,
        flow: AuthFlow,
        refresh_token: Option<&str>,
        email: Option<&str>,
        events: &mut dyn LinkEvents,
    ) -> Outcome {
        let deep_link = self
            .planner
            .app_handoff_link(token, flow, refresh_token, email);
        let fallback_url = self.planner.web_form_url(token, flow, refresh_token, email);
        self.navigator.navigate(&deep_link).await;

        let deadline = Instant::now() + self.options.handoff_grace;
        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(LinkEvent::Unloaded) => {
                        // The OS switched to the app
                        return Outcome::RedirectToApp { deep_link, fallback_url: None };
                    }
                    Some(LinkEvent::LocationChanged(_)) => {}
                    None => {
                        // Closed feed: the handoff page enacts the grace
                        // window on its own
                        return Outcome::RedirectToApp {
                            deep_link,
                            fallback_url: Some(fallback_url),
                        };
                    }
                },
                () = time::sleep_until(deadline) => {
                    return Outcome::ShowWebForm { url: fallback_url };
                }
            }
        }
    }

    /// Wait for token material to appear, re-reading the location on a
    /// fixed poll until the discovery ceiling passes
    async fn discover(&self, device: DeviceClass, events: &mut dyn LinkEvents) -> Outcome {
        let started = Instant::now();
        let deadline = started + self.options.discovery_ceiling;
        let mut poll = time::interval_at(
            started + self.options.poll_interval,
            self.options.poll_interval,
        );

        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(LinkEvent::LocationChanged(location)) => {
                        if let Some(token) = extract_link_token(&location) {
                            return self.dispatch(token, device, events).await;
                        }
                    }
                    Some(LinkEvent::Unloaded) => {
                        debug!("Unload observed outside a handoff window; ignoring");
                    }
                    None => break,
                },
                _ = poll.tick() => {
                    if let Some(location) = events.current() {
                        if let Some(token) = extract_link_token(&location) {
                            return self.dispatch(token, device, events).await;
                        }
                    }
                    if Instant::now() >= deadline {
                        break;
                    }
                }
            }
        }

        self.login_dead_end(device, "No sign-in token was found in the link")
            .await
    }

    /// Nothing left to try; send the user to login with a readable reason
    async fn login_dead_end(&self, device: DeviceClass, message: &str) -> Outcome {
        let url = if device.is_mobile() {
            self.planner.login_deep_link(Some(message))
        } else {
            self.planner.login_url(Some(message), None)
        };
        self.navigator.navigate(&url).await;
        Outcome::RedirectToLogin { url }
    }
}

const fn token_flow(token: &LinkToken) -> AuthFlow {
    match token {
        LinkToken::Code { flow, .. } | LinkToken::Token { flow, .. } => *flow,
        LinkToken::ProviderError { .. } => AuthFlow::Recovery,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::feed::SnapshotFeed;
    use crate::testing::fixtures;
    use crate::testing::mock::{MockAuthBackend, RecordingNavigator, ScriptedFeed};

    fn planner() -> DestinationPlanner {
        DestinationPlanner::new(fixtures::destination_settings())
    }

    #[test]
    fn test_default_options_match_link_timing() {
        let options = ResolverOptions::default();
        assert_eq!(options.poll_interval, Duration::from_millis(500));
        assert_eq!(options.discovery_ceiling, Duration::from_millis(5000));
        assert_eq!(options.handoff_grace, Duration::from_millis(2000));
    }

    #[test]
    fn test_outcome_terminal_states() {
        let redirect = Outcome::RedirectToPasswordForm {
            url: "/set-password".to_string(),
        };
        assert_eq!(redirect.terminal_state(), ResolverState::Redirecting);
        assert_eq!(redirect.label(), "redirect_to_password_form");

        let handoff = Outcome::RedirectToApp {
            deep_link: "app://set-password".to_string(),
            fallback_url: None,
        };
        assert_eq!(handoff.terminal_state(), ResolverState::AwaitingAppHandoff);

        let expired = Outcome::ShowExpiredError {
            code: None,
            description: None,
        };
        assert_eq!(expired.terminal_state(), ResolverState::ShowingExpiredError);
    }

    #[tokio::test]
    async fn test_code_link_redirects_to_password_form() {
        let backend = MockAuthBackend::new().with_exchange_session(fixtures::resolved_session());
        let planner = planner();
        let navigator = RecordingNavigator::new();
        let resolver = LinkResolver::new(&backend, &planner, &navigator);

        let location = LinkLocation::from_query("code=abc123&type=recovery");
        let outcome = resolver
            .resolve("test", location, DeviceClass::Desktop, &mut SnapshotFeed)
            .await;

        let expected = "/set-password?access_token=t1&refresh_token=r1&type=recovery&email=a%40b.com";
        assert_eq!(
            outcome,
            Outcome::RedirectToPasswordForm {
                url: expected.to_string()
            }
        );
        assert_eq!(navigator.urls(), vec![expected.to_string()]);
        assert_eq!(backend.exchange_code_calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_link_on_desktop_never_calls_backend() {
        let backend = MockAuthBackend::new();
        let planner = planner();
        let navigator = RecordingNavigator::new();
        let resolver = LinkResolver::new(&backend, &planner, &navigator);

        let location =
            LinkLocation::from_parts("", "error=access_denied&error_code=otp_expired");
        let outcome = resolver
            .resolve("test", location, DeviceClass::Desktop, &mut SnapshotFeed)
            .await;

        assert_eq!(
            outcome,
            Outcome::ShowExpiredError {
                code: Some("otp_expired".to_string()),
                description: None,
            }
        );
        assert_eq!(backend.total_calls(), 0);
        assert!(navigator.urls().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_on_mobile_deep_links_the_payload() {
        let backend = MockAuthBackend::new();
        let planner = planner();
        let navigator = RecordingNavigator::new();
        let resolver = LinkResolver::new(&backend, &planner, &navigator);

        let location = LinkLocation::from_parts(
            "",
            "error=access_denied&error_code=otp_expired&error_description=Link+expired",
        );
        let outcome = resolver
            .resolve("test", location, DeviceClass::Mobile, &mut SnapshotFeed)
            .await;

        let expected = "app://set-password?error=otp_expired&error_code=otp_expired\
                        &error_description=Link+expired";
        assert_eq!(
            outcome,
            Outcome::RedirectToApp {
                deep_link: expected.to_string(),
                fallback_url: None,
            }
        );
        assert_eq!(navigator.urls(), vec![expected.to_string()]);
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_expiry_provider_error_goes_to_login() {
        let backend = MockAuthBackend::new();
        let planner = planner();
        let navigator = RecordingNavigator::new();
        let resolver = LinkResolver::new(&backend, &planner, &navigator);

        let location = LinkLocation::from_parts("", "error=server_error");
        let outcome = resolver
            .resolve("test", location, DeviceClass::Desktop, &mut SnapshotFeed)
            .await;

        match outcome {
            Outcome::RedirectToLogin { url } => {
                assert!(url.starts_with("/login?error="), "got {url}");
            }
            other => panic!("expected login redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_expiry_reaches_expired_screen() {
        let backend = MockAuthBackend::new()
            .with_exchange_expiry("otp_expired", "Email link is invalid or has expired")
            .with_verify_rejection("otp_expired", "Email link is invalid or has expired");
        let planner = planner();
        let navigator = RecordingNavigator::new();
        let resolver = LinkResolver::new(&backend, &planner, &navigator);

        let location = LinkLocation::from_query("code=abc123");
        let outcome = resolver
            .resolve("test", location, DeviceClass::Desktop, &mut SnapshotFeed)
            .await;

        assert!(matches!(outcome, Outcome::ShowExpiredError { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_feed_without_token_goes_straight_to_login() {
        let backend = MockAuthBackend::new();
        let planner = planner();
        let navigator = RecordingNavigator::new();
        let resolver = LinkResolver::new(&backend, &planner, &navigator);

        let started = Instant::now();
        let outcome = resolver
            .resolve(
                "test",
                LinkLocation::from_query(""),
                DeviceClass::Desktop,
                &mut SnapshotFeed,
            )
            .await;

        // No waiting on a one-shot surface
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(outcome, Outcome::RedirectToLogin { .. }));
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_picks_up_token_from_current_location() {
        let backend = MockAuthBackend::new().with_exchange_session(fixtures::resolved_session());
        let planner = planner();
        let navigator = RecordingNavigator::new();
        let resolver = LinkResolver::new(&backend, &planner, &navigator);

        let mut feed = ScriptedFeed::open()
            .with_current(LinkLocation::from_query("code=abc123&type=recovery"));

        let started = Instant::now();
        let outcome = resolver
            .resolve("test", LinkLocation::from_query(""), DeviceClass::Desktop, &mut feed)
            .await;

        // Found on the first poll tick, not at the ceiling
        assert_eq!(started.elapsed(), Duration::from_millis(500));
        assert!(matches!(outcome, Outcome::RedirectToPasswordForm { .. }));
    }
}
