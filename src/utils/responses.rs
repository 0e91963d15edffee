//! HTTP response construction
//!
//! Unified interface for the responses the entry surfaces produce:
//! redirects (with optional error parameters), generated HTML pages, and
//! JSON bodies for the health endpoint.

use actix_web::{http::header, HttpResponse};
use serde_json::json;

/// Unified response builder for the handler layer
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Create a redirect response (302 Found)
    #[must_use]
    pub fn redirect(location: &str) -> RedirectBuilder {
        RedirectBuilder::new(location)
    }

    /// Create an HTML page response (200) with the standard content type
    #[must_use]
    pub fn html(body: String) -> HttpResponse {
        HttpResponse::Ok()
            .insert_header((header::CONTENT_TYPE, "text/html; charset=utf-8"))
            .body(body)
    }

    /// Create an OK response (200) with JSON content
    #[must_use]
    pub fn ok() -> JsonResponseBuilder {
        JsonResponseBuilder::new(200)
    }

    /// Create a `NotFound` (404) JSON error response
    #[must_use]
    pub fn not_found(resource: &str) -> HttpResponse {
        HttpResponse::NotFound()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .json(json!({
                "error": "not_found",
                "message": format!("{resource} not found"),
            }))
    }
}

/// Builder for redirect responses
pub struct RedirectBuilder {
    location: String,
}

impl RedirectBuilder {
    fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
        }
    }

    /// Append an `error` parameter to the redirect URL
    #[must_use]
    pub fn with_error(mut self, error_param: &str) -> Self {
        self.location = if self.location.contains('?') {
            format!("{}&error={error_param}", self.location)
        } else {
            format!("{}?error={error_param}", self.location)
        };
        self
    }

    /// Build the final redirect response
    #[must_use]
    pub fn build(self) -> HttpResponse {
        HttpResponse::Found()
            .append_header(("Location", self.location))
            .finish()
    }
}

/// Builder for JSON responses
pub struct JsonResponseBuilder {
    status_code: u16,
}

impl JsonResponseBuilder {
    fn new(status_code: u16) -> Self {
        Self { status_code }
    }

    /// Build the response with JSON content
    #[must_use]
    pub fn json<T: serde::Serialize>(self, data: &T) -> HttpResponse {
        let mut builder = match self.status_code {
            201 => HttpResponse::Created(),
            _ => HttpResponse::Ok(),
        };

        builder.insert_header((header::CONTENT_TYPE, "application/json"));
        builder.json(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    fn location_of(response: &HttpResponse) -> &str {
        response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    #[test]
    fn test_redirect_builds_302() {
        let response = ResponseBuilder::redirect("/login").build();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location_of(&response), "/login");
    }

    #[test]
    fn test_redirect_with_error_appends_query() {
        let response = ResponseBuilder::redirect("/login").with_error("auth_failed").build();
        assert_eq!(location_of(&response), "/login?error=auth_failed");

        // Existing query strings get an ampersand, not a second question mark
        let response = ResponseBuilder::redirect("/login?redirect=%2F")
            .with_error("auth_failed")
            .build();
        assert_eq!(location_of(&response), "/login?redirect=%2F&error=auth_failed");
    }

    #[test]
    fn test_html_response_content_type() {
        let response = ResponseBuilder::html("<html></html>".to_string());
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert!(content_type.starts_with("text/html"));
    }

    #[test]
    fn test_not_found_is_json() {
        let response = ResponseBuilder::not_found("static file");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
