pub mod jwt;
pub mod logging;
pub mod responses;
pub mod user_agent;
