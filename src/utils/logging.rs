// Centralized logging for link-resolution attempts
use log::{info, warn};
use uuid::Uuid;

use crate::models::DeviceClass;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Allocate a correlation id for a single resolution attempt
    ///
    /// Every log line of one attempt carries this id so parallel link
    /// visits can be told apart.
    #[must_use]
    pub fn new_attempt_id() -> Uuid {
        Uuid::new_v4()
    }

    /// Log the start of a resolution attempt in a standardized format
    pub fn log_attempt_started(
        attempt_id: Uuid,
        surface: &str,
        token_kind: &str,
        device: DeviceClass,
    ) {
        info!(
            "Resolving link attempt {attempt_id} via {surface}: token={token_kind}, device={device:?}"
        );
    }

    /// Log the terminal outcome of a resolution attempt
    pub fn log_outcome(attempt_id: Uuid, outcome: &str) {
        info!("Link attempt {attempt_id} resolved: {outcome}");
    }

    /// Log a failed exchange strategy; failures here are expected and the
    /// cascade moves on
    pub fn log_strategy_failed(strategy: &str, reason: &str) {
        info!("Exchange strategy '{strategy}' did not produce a session: {reason}");
    }

    /// Log a session successfully obtained by a strategy
    pub fn log_session_obtained(strategy: &str, email: Option<&str>) {
        info!(
            "Exchange strategy '{strategy}' produced a session for {}",
            email.unwrap_or("<unknown email>")
        );
    }

    /// Log a non-fatal post-update profile sync failure
    pub fn log_profile_sync_failed(reason: &str) {
        warn!("Profile sync after password update failed (non-fatal): {reason}");
    }
}
