#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use passbridge::{
    handlers::{
        health, resolve_bridge, resolve_entry, serve_static, set_password_form,
        set_password_submit,
    },
    settings::PassbridgeSettings,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = PassbridgeSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    start_server(settings).await
}

/// Start the resolver server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(settings: PassbridgeSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    // Configure CORS for the web app origins
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(settings.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg
        // Link entry endpoints: recovery and invite links land here
        .route("/", web::get().to(resolve_entry))
        .route("/auth/reset-password", web::get().to(resolve_entry))
        // Bridge callback carrying the browser-captured location
        .route("/auth/resolve", web::get().to(resolve_bridge))
        // Password form
        .route("/set-password", web::get().to(set_password_form))
        .route("/set-password", web::post().to(set_password_submit))
        // Static files endpoint
        .route("/auth/static/{filename:.*}", web::get().to(serve_static))
        // Health endpoint
        .route("/ping", web::get().to(health));
}

fn print_startup_info(bind_address: &str, settings: &PassbridgeSettings) {
    println!("Starting Passbridge link resolver on http://{bind_address}");
    println!();
    println!("Link endpoints:");
    println!("  GET  /                     - Recovery/invite link entry");
    println!("  GET  /auth/reset-password  - Recovery/invite link entry");
    println!("  GET  /auth/resolve         - Resolve a browser-captured location");
    println!();
    println!("Password endpoints:");
    println!("  GET  /set-password  - Password form");
    println!("  POST /set-password  - Apply a new password");
    println!();
    println!("Auth backend: {}", settings.auth_backend.base_url);
    println!(
        "App deep link scheme: {}://",
        settings.destinations.app_scheme
    );
    println!();
    println!("System endpoints:");
    println!("  GET  /ping           - Health check");
    println!("  GET  /auth/static/*  - Static files (HTML, CSS, JS, images)");
    println!(
        "  Static files folder: {}",
        settings.static_files.assets_folder
    );
}
