// Password form rendering and submission
//
// The form arrives with whatever token material resolution produced: a
// live session pair from a finished exchange, or raw token material when
// the app handoff fell back to the web form. Submission rebuilds the
// link token and runs the same exchange cascade before updating the
// password, so both shapes share one path.

use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::Deserialize;

use crate::backend::{AuthBackend, BackendError, HttpAuthBackend};
use crate::error::ResolveError;
use crate::exchange::{ExchangeError, SessionExchanger};
use crate::handlers::pages::{self, PasswordFormContext};
use crate::handlers::resolve::run_attempt;
use crate::link::{extract_link_token, LinkLocation};
use crate::models::{AuthFlow, LinkToken};
use crate::navigation::DestinationPlanner;
use crate::settings::PassbridgeSettings;
use crate::utils::logging::LoggingHelper;
use crate::utils::responses::ResponseBuilder;
use crate::utils::user_agent::device_class_from_request;

const MIN_PASSWORD_LENGTH: usize = 8;

const MISSING_MATERIAL_MESSAGE: &str = "Open your reset link again to set a password";

/// Token material and credentials posted by the password form
#[derive(Deserialize)]
pub struct SetPasswordForm {
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_hash: Option<String>,
    #[serde(default, rename = "type")]
    pub flow_type: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Query parameters the form page is rendered from
#[derive(Deserialize)]
pub struct SetPasswordQuery {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_hash: Option<String>,
    #[serde(rename = "type")]
    pub flow_type: Option<String>,
    pub email: Option<String>,
    pub error: Option<String>,
}

/// Render the password form from the request's token material
///
/// Emailed links sometimes land directly on this surface, so requests
/// without renderable material fall back to the resolver: visible codes
/// and provider errors take their normal branches, and everything else
/// gets the bridge page in case the token is hiding in a fragment.
///
/// # Errors
///
/// Never fails; every path maps to a response
pub async fn set_password_form(
    query: web::Query<SetPasswordQuery>,
    req: HttpRequest,
    settings: web::Data<PassbridgeSettings>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let access_token = non_empty(query.access_token);
    let token_hash = non_empty(query.token_hash);

    if access_token.is_some() || token_hash.is_some() {
        let context = PasswordFormContext {
            access_token,
            refresh_token: non_empty(query.refresh_token),
            token_hash,
            flow: AuthFlow::parse_or_default(query.flow_type.as_deref()),
            email: non_empty(query.email),
            error: non_empty(query.error),
        };
        return Ok(ResponseBuilder::html(pages::password_form_page(&context)));
    }

    let location = LinkLocation::from_query(req.query_string());
    if extract_link_token(&location).is_some() {
        let backend = HttpAuthBackend::new(&settings.auth_backend);
        let device = device_class_from_request(&req);
        return Ok(run_attempt("set_password", &backend, location, device, &settings).await);
    }

    Ok(ResponseBuilder::html(pages::bridge_page(&settings)))
}

/// Handle a password form submission
///
/// # Errors
///
/// Never fails; every path maps to a response
pub async fn set_password_submit(
    form: web::Form<SetPasswordForm>,
    settings: web::Data<PassbridgeSettings>,
) -> Result<HttpResponse> {
    let backend = HttpAuthBackend::new(&settings.auth_backend);
    Ok(apply_password_change(&backend, form.into_inner(), &settings).await)
}

async fn apply_password_change(
    backend: &dyn AuthBackend,
    form: SetPasswordForm,
    settings: &PassbridgeSettings,
) -> HttpResponse {
    let planner = DestinationPlanner::new(settings.destinations.clone());

    if let Some(message) = validate_credentials(&form) {
        let context = form_context(form, Some(message));
        return ResponseBuilder::html(pages::password_form_page(&context));
    }

    let Some(token) = link_token_from_form(&form) else {
        let url = planner.login_url(Some(MISSING_MATERIAL_MESSAGE), None);
        return ResponseBuilder::redirect(&url).build();
    };

    let session = match SessionExchanger::new(backend).exchange(&token).await {
        Ok(session) => session,
        Err(ExchangeError::Expired { description, .. }) => {
            return ResponseBuilder::html(pages::expired_page(
                settings,
                description.as_deref(),
                &planner.login_url(None, None),
            ));
        }
        Err(err) => {
            let message = ResolveError::from(err).login_message();
            return ResponseBuilder::redirect(&planner.login_url(Some(&message), None)).build();
        }
    };

    if let Err(err) = backend
        .update_password(&session.access_token, &form.password)
        .await
    {
        let context = form_context(form, Some(update_failure_message(&err)));
        return ResponseBuilder::html(pages::password_form_page(&context));
    }

    // Refresh the stored profile after the update; failure is logged,
    // never surfaced.
    if let Err(err) = backend.current_session().await {
        LoggingHelper::log_profile_sync_failed(&err.to_string());
    }

    ResponseBuilder::html(pages::success_page(
        settings,
        &planner.login_url(None, None),
    ))
}

fn validate_credentials(form: &SetPasswordForm) -> Option<String> {
    if form.password != form.confirm_password {
        return Some("Passwords do not match".to_string());
    }
    if form.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        ));
    }
    None
}

/// Rebuild the link token from the posted material
///
/// A live access token and a bare verification hash take the same shape;
/// the exchange cascade sorts out which strategies apply.
fn link_token_from_form(form: &SetPasswordForm) -> Option<LinkToken> {
    let material = form
        .access_token
        .as_deref()
        .filter(|value| !value.is_empty())
        .or_else(|| {
            form.token_hash
                .as_deref()
                .filter(|value| !value.is_empty())
        })?;

    Some(LinkToken::Token {
        token: material.to_string(),
        flow: AuthFlow::parse_or_default(form.flow_type.as_deref()),
        email: form.email.clone().filter(|value| !value.is_empty()),
        refresh_token: form
            .refresh_token
            .clone()
            .filter(|value| !value.is_empty()),
    })
}

fn form_context(form: SetPasswordForm, error: Option<String>) -> PasswordFormContext {
    let flow = AuthFlow::parse_or_default(form.flow_type.as_deref());
    PasswordFormContext {
        access_token: non_empty(form.access_token),
        refresh_token: non_empty(form.refresh_token),
        token_hash: non_empty(form.token_hash),
        flow,
        email: non_empty(form.email),
        error,
    }
}

fn update_failure_message(err: &BackendError) -> String {
    match err {
        BackendError::Rejected { message, .. } if !message.is_empty() => message.clone(),
        _ => "Could not update the password. Please try again.".to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
