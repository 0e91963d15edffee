//! Fake implementations for isolated testing
//!
//! [`MockAuthBackend`] scripts backend replies and counts calls,
//! [`RecordingNavigator`] captures ordered navigations, and
//! [`ScriptedFeed`] replays location events on a virtual clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::backend::{AuthBackend, BackendError};
use crate::link::LinkLocation;
use crate::models::{AuthFlow, ResolvedSession};
use crate::resolver::feed::{LinkEvent, LinkEvents, Navigator};

use super::constants::TEST_EMAIL;

/// Scripted reply for one backend operation
#[derive(Clone)]
enum Scripted {
    Session(ResolvedSession),
    Rejected { code: String, message: String },
    Expired { code: String, message: String },
}

impl Scripted {
    fn produce(&self) -> Result<ResolvedSession, BackendError> {
        match self {
            Self::Session(session) => Ok(session.clone()),
            Self::Rejected { code, message } => Err(BackendError::Rejected {
                status: 400,
                code: code.clone(),
                message: message.clone(),
            }),
            Self::Expired { code, message } => Err(BackendError::OtpExpired {
                code: code.clone(),
                message: message.clone(),
            }),
        }
    }
}

/// Scriptable auth backend that counts every call
///
/// Unscripted redemption operations reject, so a test that never
/// configures a reply observes the cascade exhaust itself. Sessions
/// applied via `set_session` carry the fixture user's email, like a
/// backend that resolves the user from the token.
#[derive(Default)]
pub struct MockAuthBackend {
    exchange_reply: Option<Scripted>,
    verify_reply: Option<Scripted>,
    update_rejection: Option<(String, String)>,
    current: Mutex<Option<ResolvedSession>>,
    exchange_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    current_calls: AtomicUsize,
    set_session_calls: AtomicUsize,
    update_password_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    verified_flows: Mutex<Vec<AuthFlow>>,
    updated_passwords: Mutex<Vec<String>>,
}

impl MockAuthBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful code exchange
    #[must_use]
    pub fn with_exchange_session(mut self, session: ResolvedSession) -> Self {
        self.exchange_reply = Some(Scripted::Session(session));
        self
    }

    /// Script a rejected code exchange
    #[must_use]
    pub fn with_exchange_rejection(mut self, code: &str, message: &str) -> Self {
        self.exchange_reply = Some(Scripted::Rejected {
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// Script a code exchange that reports the link expired
    #[must_use]
    pub fn with_exchange_expiry(mut self, code: &str, message: &str) -> Self {
        self.exchange_reply = Some(Scripted::Expired {
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// Script a successful OTP verification
    #[must_use]
    pub fn with_verify_session(mut self, session: ResolvedSession) -> Self {
        self.verify_reply = Some(Scripted::Session(session));
        self
    }

    /// Script a rejected OTP verification
    #[must_use]
    pub fn with_verify_rejection(mut self, code: &str, message: &str) -> Self {
        self.verify_reply = Some(Scripted::Rejected {
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// Script `verify_otp` to fail with an expired token
    #[must_use]
    pub fn with_verify_expiry(mut self, code: &str, message: &str) -> Self {
        self.verify_reply = Some(Scripted::Expired {
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// Pre-load the locally held session
    ///
    /// # Panics
    ///
    /// Panics if the session slot mutex is poisoned.
    #[must_use]
    pub fn with_current_session(self, session: ResolvedSession) -> Self {
        *self.current.lock().unwrap() = Some(session);
        self
    }

    /// Script a rejected password update
    #[must_use]
    pub fn with_update_rejection(mut self, code: &str, message: &str) -> Self {
        self.update_rejection = Some((code.to_string(), message.to_string()));
        self
    }

    #[must_use]
    pub fn exchange_code_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn verify_otp_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn current_session_calls(&self) -> usize {
        self.current_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn set_session_calls(&self) -> usize {
        self.set_session_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn update_password_calls(&self) -> usize {
        self.update_password_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    /// Total backend calls across every operation
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.exchange_code_calls()
            + self.verify_otp_calls()
            + self.current_session_calls()
            + self.set_session_calls()
            + self.update_password_calls()
            + self.sign_out_calls()
    }

    /// Flow passed to the most recent `verify_otp` call
    ///
    /// # Panics
    ///
    /// Panics if the recording mutex is poisoned.
    #[must_use]
    pub fn last_verified_flow(&self) -> Option<AuthFlow> {
        self.verified_flows.lock().unwrap().last().copied()
    }

    /// Password passed to the most recent `update_password` call
    ///
    /// # Panics
    ///
    /// Panics if the recording mutex is poisoned.
    #[must_use]
    pub fn last_updated_password(&self) -> Option<String> {
        self.updated_passwords.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn exchange_code(&self, _code: &str) -> Result<ResolvedSession, BackendError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.exchange_reply
            .as_ref()
            .map_or_else(|| Err(unscripted("code exchange")), Scripted::produce)
    }

    async fn current_session(&self) -> Result<Option<ResolvedSession>, BackendError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().unwrap().clone())
    }

    async fn verify_otp(
        &self,
        _token_hash: &str,
        flow: AuthFlow,
    ) -> Result<ResolvedSession, BackendError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verified_flows.lock().unwrap().push(flow);
        self.verify_reply
            .as_ref()
            .map_or_else(|| Err(unscripted("otp verification")), Scripted::produce)
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<ResolvedSession, BackendError> {
        self.set_session_calls.fetch_add(1, Ordering::SeqCst);
        let session = ResolvedSession {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            email: Some(TEST_EMAIL.to_string()),
            expires_at: None,
        };
        *self.current.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn update_password(
        &self,
        _access_token: &str,
        new_password: &str,
    ) -> Result<(), BackendError> {
        self.update_password_calls.fetch_add(1, Ordering::SeqCst);
        self.updated_passwords
            .lock()
            .unwrap()
            .push(new_password.to_string());
        match &self.update_rejection {
            Some((code, message)) => Err(BackendError::Rejected {
                status: 422,
                code: code.clone(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.current.lock().unwrap().take();
        Ok(())
    }
}

fn unscripted(operation: &str) -> BackendError {
    BackendError::Rejected {
        status: 400,
        code: "not_configured".to_string(),
        message: format!("no {operation} reply scripted"),
    }
}

/// Navigator that records every navigation in order
#[derive(Default)]
pub struct RecordingNavigator {
    urls: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigations seen so far, oldest first
    ///
    /// # Panics
    ///
    /// Panics if the recording mutex is poisoned.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn navigate(&self, url: &str) {
        self.urls.lock().unwrap().push(url.to_string());
    }
}

/// Event feed replaying a scripted sequence on the tokio clock
///
/// Each event's delay runs from the first `next` poll after the previous
/// delivery, and a pending event survives a cancelled `next` call intact.
pub struct ScriptedFeed {
    events: VecDeque<(Duration, LinkEvent)>,
    next_due: Option<Instant>,
    keep_open: bool,
    current: Option<LinkLocation>,
}

impl ScriptedFeed {
    /// Feed that closes once the scripted events run out
    #[must_use]
    pub fn closed() -> Self {
        Self {
            events: VecDeque::new(),
            next_due: None,
            keep_open: false,
            current: None,
        }
    }

    /// Feed that stays open (pending forever) after the scripted events
    #[must_use]
    pub fn open() -> Self {
        Self {
            keep_open: true,
            ..Self::closed()
        }
    }

    /// Append an event delivered `delay` after the previous one
    #[must_use]
    pub fn event_after(mut self, delay: Duration, event: LinkEvent) -> Self {
        self.events.push_back((delay, event));
        self
    }

    /// Set the location reported to poll-driven re-reads
    #[must_use]
    pub fn with_current(mut self, location: LinkLocation) -> Self {
        self.current = Some(location);
        self
    }
}

#[async_trait]
impl LinkEvents for ScriptedFeed {
    async fn next(&mut self) -> Option<LinkEvent> {
        let Some((delay, _)) = self.events.front() else {
            if self.keep_open {
                return std::future::pending().await;
            }
            return None;
        };

        let due = match self.next_due {
            Some(due) => due,
            None => {
                let due = Instant::now() + *delay;
                self.next_due = Some(due);
                due
            }
        };
        tokio::time::sleep_until(due).await;
        self.next_due = None;

        let (_, event) = self.events.pop_front()?;
        if let LinkEvent::LocationChanged(location) = &event {
            self.current = Some(location.clone());
        }
        Some(event)
    }

    fn current(&self) -> Option<LinkLocation> {
        self.current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_scripted_feed_delivers_on_schedule() {
        let mut feed = ScriptedFeed::closed()
            .event_after(Duration::from_millis(100), LinkEvent::Unloaded)
            .event_after(Duration::from_millis(200), LinkEvent::Unloaded);

        let started = Instant::now();
        assert_eq!(feed.next().await, Some(LinkEvent::Unloaded));
        assert_eq!(started.elapsed(), Duration::from_millis(100));

        assert_eq!(feed.next().await, Some(LinkEvent::Unloaded));
        assert_eq!(started.elapsed(), Duration::from_millis(300));

        assert_eq!(feed.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_feed_survives_cancelled_poll() {
        let mut feed =
            ScriptedFeed::closed().event_after(Duration::from_millis(300), LinkEvent::Unloaded);

        // Cancel a first poll early; the event must still arrive on time
        tokio::select! {
            _ = feed.next() => panic!("event should not be due yet"),
            () = tokio::time::sleep(Duration::from_millis(50)) => {}
        }

        let started = Instant::now();
        assert_eq!(feed.next().await, Some(LinkEvent::Unloaded));
        assert_eq!(started.elapsed(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_location_events_update_current() {
        let location = LinkLocation::from_query("code=abc123");
        let mut feed = ScriptedFeed::closed().event_after(
            Duration::ZERO,
            LinkEvent::LocationChanged(location.clone()),
        );

        assert!(feed.current().is_none());
        feed.next().await;
        assert_eq!(feed.current(), Some(location));
    }

    #[tokio::test]
    async fn test_mock_backend_counts_calls() {
        let backend = MockAuthBackend::new();
        assert_eq!(backend.total_calls(), 0);

        let _ = backend.sign_out().await;
        let _ = backend.current_session().await;
        assert_eq!(backend.sign_out_calls(), 1);
        assert_eq!(backend.current_session_calls(), 1);
        assert_eq!(backend.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_backend_set_session_updates_slot() {
        let backend = MockAuthBackend::new();
        let applied = backend.set_session("t9", "r9").await.unwrap();
        assert_eq!(applied.access_token, "t9");
        assert_eq!(applied.email.as_deref(), Some(TEST_EMAIL));

        let held = backend.current_session().await.unwrap();
        assert_eq!(held.unwrap().access_token, "t9");

        backend.sign_out().await.unwrap();
        assert!(backend.current_session().await.unwrap().is_none());
    }
}
