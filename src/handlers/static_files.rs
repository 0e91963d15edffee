use crate::models::HealthResponse;
use crate::settings::PassbridgeSettings;
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpResponse, Result};
use log::debug;
use std::fs;

/// Health check endpoint
///
/// # Errors
/// Returns an error if health status cannot be determined
pub async fn health() -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        message: "Passbridge link resolver is running".to_string(),
    };
    Ok(ResponseBuilder::ok().json(&response))
}

/// Serve static files from the configured assets directory
///
/// # Errors
///
/// Returns an error if:
/// - The requested file cannot be read
/// - The file path is invalid
pub async fn serve_static(
    path: web::Path<String>,
    settings: web::Data<PassbridgeSettings>,
) -> Result<HttpResponse> {
    let filename = path.into_inner();
    let file_path = format!("{}/{}", settings.static_files.assets_folder, filename);

    debug!("Attempting to serve static file: {file_path}");

    fs::read(&file_path).map_or_else(
        |_| {
            debug!("Static file not found: {file_path}");
            Ok(ResponseBuilder::not_found("File"))
        },
        |contents| {
            let content_type = match file_path.split('.').next_back() {
                Some("html") => "text/html",
                Some("css") => "text/css",
                Some("js") => "application/javascript",
                Some("png") => "image/png",
                Some("jpg" | "jpeg") => "image/jpeg",
                Some("gif") => "image/gif",
                Some("svg") => "image/svg+xml",
                Some("ico") => "image/x-icon",
                _ => "text/plain",
            };

            Ok(HttpResponse::Ok().content_type(content_type).body(contents))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_health_reports_ok() {
        let response = health().await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_missing_static_file_is_not_found() {
        let settings = web::Data::new(fixtures::settings());
        let path = web::Path::from("definitely-not-there.css".to_string());

        let response = serve_static(path, settings).await.unwrap();
        assert_eq!(response.status(), 404);
    }
}
