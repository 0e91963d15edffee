//! Link resolution module
//!
//! This module drives a recovery or invite link from its captured
//! location to a terminal outcome. The state machine in [`machine`]
//! consumes location events through the seams in [`feed`], so the same
//! logic runs under one-shot HTTP requests and under interactive
//! surfaces that observe hash changes and unloads.

pub mod feed;
pub mod machine;

// Re-export the surface seams
pub use feed::{LinkEvent, LinkEvents, Navigator, NoopNavigator, SnapshotFeed};

// Re-export the state machine types
pub use machine::{LinkResolver, Outcome, ResolverOptions, ResolverState};
