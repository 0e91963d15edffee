#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passbridge application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod error;
pub mod exchange;
pub mod handlers;
pub mod link;
pub mod models;
pub mod navigation;
pub mod resolver;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use backend::{AuthBackend, HttpAuthBackend};
pub use error::ResolveError;
pub use exchange::SessionExchanger;
pub use handlers::{health, resolve_bridge, resolve_entry, set_password_form, set_password_submit};
pub use link::{extract_link_token, LinkLocation};
pub use models::{AuthFlow, DeviceClass, LinkToken, ResolvedSession};
pub use navigation::DestinationPlanner;
pub use resolver::{LinkResolver, Outcome, ResolverState};
pub use settings::PassbridgeSettings;
