//! Outbound navigation targets
//!
//! Every URL the resolver can send a browser to is built here from the
//! destination settings: the password form, the login page, and the
//! native-app deep links. Values are form-encoded, so an email like
//! `a@b.com` surfaces as `a%40b.com` in the target.

use url::form_urlencoded;

use crate::models::{AuthFlow, ResolvedSession};
use crate::settings::DestinationSettings;

/// Builds outbound navigation targets from the configured destinations
#[derive(Clone, Debug)]
pub struct DestinationPlanner {
    destinations: DestinationSettings,
}

impl DestinationPlanner {
    #[must_use]
    pub fn new(destinations: DestinationSettings) -> Self {
        Self { destinations }
    }

    /// Password form carrying a resolved session
    ///
    /// Shape: `{set_password}?access_token=…&refresh_token=…&type=…[&email=…]`
    #[must_use]
    pub fn password_form_url(&self, session: &ResolvedSession, flow: AuthFlow) -> String {
        let mut pairs = vec![
            ("access_token", session.access_token.as_str()),
            ("refresh_token", session.refresh_token.as_str()),
            ("type", flow.as_str()),
        ];
        if let Some(email) = session.email.as_deref() {
            pairs.push(("email", email));
        }
        with_query(&self.web_target(&self.destinations.set_password_path), &pairs)
    }

    /// Password form carrying raw token material, for flows where the
    /// verification happens at submit time
    #[must_use]
    pub fn web_form_url(
        &self,
        token_hash: &str,
        flow: AuthFlow,
        refresh_token: Option<&str>,
        email: Option<&str>,
    ) -> String {
        let target = self.web_target(&self.destinations.set_password_path);
        with_query(&target, &token_pairs(token_hash, flow, refresh_token, email))
    }

    /// Login page with an optional error message and return path
    #[must_use]
    pub fn login_url(&self, error: Option<&str>, redirect: Option<&str>) -> String {
        let mut pairs = Vec::new();
        if let Some(error) = error {
            pairs.push(("error", error));
        }
        if let Some(redirect) = redirect {
            pairs.push(("redirect", redirect));
        }
        with_query(&self.web_target(&self.destinations.login_path), &pairs)
    }

    /// Native-app login deep link, for mobile dead ends
    #[must_use]
    pub fn login_deep_link(&self, error: Option<&str>) -> String {
        let pairs: Vec<(&str, &str)> = error.map(|e| ("error", e)).into_iter().collect();
        with_query(&self.deep_target("login"), &pairs)
    }

    /// Native-app handoff deep link carrying the token material
    ///
    /// Shape: `{scheme}://set-password?token_hash=…&type=…[&refresh_token=…][&email=…]`
    #[must_use]
    pub fn app_handoff_link(
        &self,
        token_hash: &str,
        flow: AuthFlow,
        refresh_token: Option<&str>,
        email: Option<&str>,
    ) -> String {
        let target = self.deep_target("set-password");
        with_query(&target, &token_pairs(token_hash, flow, refresh_token, email))
    }

    /// Native-app handoff deep link carrying a provider error payload
    ///
    /// Both `error` and `error_code` carry the code so app-side parsers
    /// reading either key see it.
    #[must_use]
    pub fn error_handoff_link(&self, code: Option<&str>, description: Option<&str>) -> String {
        let mut pairs = Vec::new();
        if let Some(code) = code {
            pairs.push(("error", code));
            pairs.push(("error_code", code));
        }
        if let Some(description) = description {
            pairs.push(("error_description", description));
        }
        with_query(&self.deep_target("set-password"), &pairs)
    }

    fn web_target(&self, path: &str) -> String {
        let base = self.destinations.web_base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    fn deep_target(&self, screen: &str) -> String {
        format!("{}://{screen}", self.destinations.app_scheme)
    }
}

fn token_pairs<'a>(
    token_hash: &'a str,
    flow: AuthFlow,
    refresh_token: Option<&'a str>,
    email: Option<&'a str>,
) -> Vec<(&'static str, &'a str)> {
    let mut pairs = vec![("token_hash", token_hash), ("type", flow.as_str())];
    if let Some(refresh_token) = refresh_token {
        pairs.push(("refresh_token", refresh_token));
    }
    if let Some(email) = email {
        pairs.push(("email", email));
    }
    pairs
}

fn with_query(target: &str, pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return target.to_string();
    }
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    format!("{target}?{}", serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn planner() -> DestinationPlanner {
        DestinationPlanner::new(fixtures::destination_settings())
    }

    #[test]
    fn test_password_form_url_encodes_email() {
        let session = ResolvedSession {
            access_token: "t1".to_string(),
            refresh_token: "r1".to_string(),
            email: Some("a@b.com".to_string()),
            expires_at: None,
        };
        assert_eq!(
            planner().password_form_url(&session, AuthFlow::Recovery),
            "/set-password?access_token=t1&refresh_token=r1&type=recovery&email=a%40b.com"
        );
    }

    #[test]
    fn test_password_form_url_without_email() {
        let session = ResolvedSession {
            access_token: "t1".to_string(),
            refresh_token: "r1".to_string(),
            email: None,
            expires_at: None,
        };
        assert_eq!(
            planner().password_form_url(&session, AuthFlow::Invite),
            "/set-password?access_token=t1&refresh_token=r1&type=invite"
        );
    }

    #[test]
    fn test_app_handoff_link_shape() {
        assert_eq!(
            planner().app_handoff_link("eyJ...", AuthFlow::Invite, Some("r2"), None),
            "app://set-password?token_hash=eyJ...&type=invite&refresh_token=r2"
        );
    }

    #[test]
    fn test_error_handoff_link_carries_payload() {
        let link = planner().error_handoff_link(Some("otp_expired"), Some("Link expired"));
        assert_eq!(
            link,
            "app://set-password?error=otp_expired&error_code=otp_expired&error_description=Link+expired"
        );

        assert_eq!(
            planner().error_handoff_link(None, None),
            "app://set-password"
        );
    }

    #[test]
    fn test_login_urls() {
        assert_eq!(planner().login_url(None, None), "/login");
        assert_eq!(
            planner().login_url(Some("This link has expired"), Some("/auth/reset-password")),
            "/login?error=This+link+has+expired&redirect=%2Fauth%2Freset-password"
        );

        assert_eq!(planner().login_deep_link(None), "app://login");
        assert_eq!(
            planner().login_deep_link(Some("expired")),
            "app://login?error=expired"
        );
    }

    #[test]
    fn test_absolute_web_base() {
        let mut destinations = fixtures::destination_settings();
        destinations.web_base_url = "https://portal.example.com/".to_string();
        let planner = DestinationPlanner::new(destinations);

        assert_eq!(
            planner.login_url(None, None),
            "https://portal.example.com/login"
        );
    }

    #[test]
    fn test_web_form_url_carries_token_material() {
        assert_eq!(
            planner().web_form_url("hash9", AuthFlow::Recovery, None, Some("a@b.com")),
            "/set-password?token_hash=hash9&type=recovery&email=a%40b.com"
        );
    }
}
