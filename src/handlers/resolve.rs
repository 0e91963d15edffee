// Link resolution entry points
//
// Fragments never reach the server, so an entry request without visible
// token material gets the bridge page, which captures the full browser
// location and forwards it to `/auth/resolve` for the real attempt.

use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::Deserialize;

use crate::backend::{AuthBackend, HttpAuthBackend};
use crate::handlers::pages;
use crate::link::{extract_link_token, LinkLocation};
use crate::models::DeviceClass;
use crate::navigation::DestinationPlanner;
use crate::resolver::{LinkResolver, NoopNavigator, Outcome, ResolverOptions, SnapshotFeed};
use crate::settings::PassbridgeSettings;
use crate::utils::responses::ResponseBuilder;
use crate::utils::user_agent::device_class_from_request;

/// Location material captured client-side by the bridge page
#[derive(Deserialize)]
pub struct CapturedLocation {
    pub search: Option<String>,
    pub hash: Option<String>,
}

/// Landing surface for recovery and invite links
///
/// Links whose token material is visible in the query string resolve
/// right away. Everything else gets the bridge page, since the token may
/// be hiding in a fragment only the browser can see.
///
/// # Errors
///
/// Never fails; every resolution path maps to a response
pub async fn resolve_entry(
    req: HttpRequest,
    settings: web::Data<PassbridgeSettings>,
) -> Result<HttpResponse> {
    let location = LinkLocation::from_query(req.query_string());
    if extract_link_token(&location).is_some() {
        let backend = HttpAuthBackend::new(&settings.auth_backend);
        let device = device_class_from_request(&req);
        return Ok(run_attempt("entry", &backend, location, device, &settings).await);
    }

    Ok(ResponseBuilder::html(pages::bridge_page(&settings)))
}

/// Resolve a location captured by the bridge page
///
/// # Errors
///
/// Never fails; every resolution path maps to a response
pub async fn resolve_bridge(
    query: web::Query<CapturedLocation>,
    req: HttpRequest,
    settings: web::Data<PassbridgeSettings>,
) -> Result<HttpResponse> {
    let captured = query.into_inner();
    let location = LinkLocation::from_parts(
        captured.search.as_deref().unwrap_or(""),
        captured.hash.as_deref().unwrap_or(""),
    );
    let backend = HttpAuthBackend::new(&settings.auth_backend);
    let device = device_class_from_request(&req);

    Ok(run_attempt("bridge", &backend, location, device, &settings).await)
}

/// Drive one resolution attempt and render its outcome
///
/// HTTP requests are one-shot: the feed is closed and the navigator is a
/// no-op, so timed behavior degrades to its immediate form and the
/// outcome's URLs are answered as redirects or rendered pages.
pub(crate) async fn run_attempt(
    surface: &str,
    backend: &dyn AuthBackend,
    location: LinkLocation,
    device: DeviceClass,
    settings: &PassbridgeSettings,
) -> HttpResponse {
    let planner = DestinationPlanner::new(settings.destinations.clone());
    let navigator = NoopNavigator;
    let resolver = LinkResolver::new(backend, &planner, &navigator)
        .with_options(ResolverOptions::from(&settings.resolver));

    let mut feed = SnapshotFeed;
    let outcome = resolver.resolve(surface, location, device, &mut feed).await;
    outcome_response(outcome, &planner, settings)
}

fn outcome_response(
    outcome: Outcome,
    planner: &DestinationPlanner,
    settings: &PassbridgeSettings,
) -> HttpResponse {
    match outcome {
        Outcome::RedirectToPasswordForm { url }
        | Outcome::ShowWebForm { url }
        | Outcome::RedirectToLogin { url } => ResponseBuilder::redirect(&url).build(),
        Outcome::RedirectToApp {
            deep_link,
            fallback_url: Some(fallback),
        } => ResponseBuilder::html(pages::handoff_page(settings, &deep_link, &fallback)),
        Outcome::RedirectToApp {
            deep_link,
            fallback_url: None,
        } => ResponseBuilder::redirect(&deep_link).build(),
        Outcome::ShowExpiredError { description, .. } => ResponseBuilder::html(pages::expired_page(
            settings,
            description.as_deref(),
            &planner.login_url(None, None),
        )),
    }
}
