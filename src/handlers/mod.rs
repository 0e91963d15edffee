// HTTP request handlers for the link resolution surfaces
pub mod pages;
pub mod resolve;
pub mod set_password;
pub mod static_files;

// Re-export the main handler functions
pub use resolve::{resolve_bridge, resolve_entry};
pub use set_password::{set_password_form, set_password_submit};
pub use static_files::{health, serve_static};
