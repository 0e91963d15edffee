//! HTTP request builders for testing handlers
//!
//! Fluent builders for the request shapes the handlers care about,
//! mostly differing in User-Agent and query string.

use actix_web::http::Method;
use actix_web::{test, HttpRequest};

use super::constants::{TEST_MOBILE_USER_AGENT, TEST_USER_AGENT};

/// Builder for creating HTTP requests for testing
pub struct RequestBuilder {
    method: Method,
    uri: String,
    headers: Vec<(String, String)>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// Create a new request builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            uri: "/".to_string(),
            headers: Vec::new(),
        }
    }

    /// Set the HTTP method
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the request URI
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(self, user_agent: &str) -> Self {
        self.header("User-Agent", user_agent)
    }

    /// Build the final `HttpRequest`
    #[must_use]
    pub fn build(self) -> HttpRequest {
        let mut req = test::TestRequest::default()
            .method(self.method)
            .uri(&self.uri);

        for (name, value) in self.headers {
            req = req.insert_header((name, value));
        }

        req.to_http_request()
    }
}

/// Quick builder functions for common request types
impl RequestBuilder {
    /// GET request from a mobile browser
    #[must_use]
    pub fn mobile_request() -> HttpRequest {
        Self::new().user_agent(TEST_MOBILE_USER_AGENT).build()
    }

    /// GET request from a desktop browser
    #[must_use]
    pub fn desktop_request() -> HttpRequest {
        Self::new().user_agent(TEST_USER_AGENT).build()
    }

    /// GET request without any headers at all
    #[must_use]
    pub fn empty_request() -> HttpRequest {
        Self::new().build()
    }

    /// GET request with a specific User-Agent
    #[must_use]
    pub fn user_agent_request(user_agent: &str) -> HttpRequest {
        Self::new().user_agent(user_agent).build()
    }
}
