// HTML pages served by the resolver surfaces
//
// Every page is generated from settings so deployments work out of the box.
// Pages without per-request data (bridge, expired, success) can be replaced
// wholesale by dropping a file of the same name into the assets folder.

use crate::models::AuthFlow;
use crate::settings::PassbridgeSettings;

/// Hidden-field material rendered into the password form.
///
/// The form ferries whatever token material the request arrived with back
/// to the submit handler, which rebuilds the link token from it.
pub struct PasswordFormContext {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_hash: Option<String>,
    pub flow: AuthFlow,
    pub email: Option<String>,
    pub error: Option<String>,
}

/// Bridge page served when a request arrives without visible token material.
///
/// URL fragments never reach the server, so this page re-reads the full
/// browser location client-side and forwards it to `/auth/resolve`. It keeps
/// watching for late-arriving fragments (hashchange plus a poll) and forwards
/// empty-handed once the discovery ceiling passes, letting the resolver issue
/// its login redirect.
#[must_use]
pub fn bridge_page(settings: &PassbridgeSettings) -> String {
    let html_path = format!("{}/bridge.html", settings.static_files.assets_folder);
    std::fs::read_to_string(&html_path).unwrap_or_else(|_| generate_bridge_page(settings))
}

#[must_use]
pub fn generate_bridge_page(settings: &PassbridgeSettings) -> String {
    let script = BRIDGE_SCRIPT
        .replace(
            "__POLL_MS__",
            &settings.resolver.poll_interval_ms.to_string(),
        )
        .replace(
            "__CEILING_MS__",
            &settings.resolver.discovery_ceiling_ms.to_string(),
        );

    render_page(
        "Completing sign-in",
        r#"<div class="spinner"></div>
            <h1>Completing sign-in</h1>
            <p>Checking your link. You will be redirected in a moment.</p>
            <noscript><p class="error-banner">JavaScript is required to finish signing in from this link.</p></noscript>"#,
        &script,
    )
}

/// Handoff page shown on mobile after the app deep link has been issued.
///
/// Navigates to the deep link immediately and falls back to the web form
/// once the grace period passes without the page being unloaded.
#[must_use]
pub fn handoff_page(settings: &PassbridgeSettings, deep_link: &str, fallback_url: &str) -> String {
    let script = HANDOFF_SCRIPT
        .replace("__DEEP_LINK__", &js_string(deep_link))
        .replace("__FALLBACK_URL__", &js_string(fallback_url))
        .replace(
            "__GRACE_MS__",
            &settings.resolver.handoff_grace_ms.to_string(),
        );

    render_page(
        "Open the app",
        &format!(
            r#"<h1>Opening the app</h1>
            <p>If nothing happens, choose an option below.</p>
            <a class="button" href="{deep}">Open in app</a>
            <a class="button secondary" href="{fallback}">Continue in browser</a>"#,
            deep = html_escape(deep_link),
            fallback = html_escape(fallback_url),
        ),
        &script,
    )
}

/// Terminal page for expired or already-used links.
#[must_use]
pub fn expired_page(
    settings: &PassbridgeSettings,
    description: Option<&str>,
    login_url: &str,
) -> String {
    let html_path = format!("{}/expired.html", settings.static_files.assets_folder);
    std::fs::read_to_string(&html_path).unwrap_or_else(|_| {
        let detail = description.unwrap_or("The link is no longer valid.");
        render_page(
            "Link expired",
            &format!(
                r#"<h1>This link has expired</h1>
            <p>{detail}</p>
            <p>Reset links can only be used once and expire after a short time.</p>
            <a class="button" href="{login}">Request a new link</a>"#,
                detail = html_escape(detail),
                login = html_escape(login_url),
            ),
            "",
        )
    })
}

/// Password form carrying the request's token material in hidden fields.
#[must_use]
pub fn password_form_page(context: &PasswordFormContext) -> String {
    let mut extras = String::new();
    if let Some(email) = &context.email {
        extras.push_str(&format!(
            r#"<p class="hint">for {}</p>
            "#,
            html_escape(email)
        ));
    }
    if let Some(error) = &context.error {
        extras.push_str(&format!(
            r#"<p class="error-banner">{}</p>
            "#,
            html_escape(error)
        ));
    }

    render_page(
        "Set a new password",
        &format!(
            r#"<h1>Choose a new password</h1>
            {extras}<form method="post" action="/set-password">
                {hidden}
                <label for="password">New password</label>
                <input type="password" id="password" name="password" minlength="8" required autofocus>
                <label for="confirm_password">Confirm password</label>
                <input type="password" id="confirm_password" name="confirm_password" minlength="8" required>
                <button type="submit" class="button">Set password</button>
            </form>"#,
            hidden = hidden_fields(context),
        ),
        "",
    )
}

/// Terminal page after a successful password update.
#[must_use]
pub fn success_page(settings: &PassbridgeSettings, login_url: &str) -> String {
    let html_path = format!("{}/success.html", settings.static_files.assets_folder);
    std::fs::read_to_string(&html_path).unwrap_or_else(|_| {
        render_page(
            "Password updated",
            &format!(
                r#"<h1>Password updated</h1>
            <p>Your password has been changed. Sign in with it to continue.</p>
            <a class="button" href="{}">Go to sign in</a>"#,
                html_escape(login_url)
            ),
            "",
        )
    })
}

fn hidden_fields(context: &PasswordFormContext) -> String {
    let mut fields = vec![format!(
        r#"<input type="hidden" name="type" value="{}">"#,
        context.flow.as_str()
    )];
    let optional = [
        ("access_token", context.access_token.as_deref()),
        ("refresh_token", context.refresh_token.as_deref()),
        ("token_hash", context.token_hash.as_deref()),
        ("email", context.email.as_deref()),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            fields.push(format!(
                r#"<input type="hidden" name="{name}" value="{}">"#,
                html_escape(value)
            ));
        }
    }
    fields.join("\n                ")
}

fn render_page(title: &str, body: &str, script: &str) -> String {
    let script_block = if script.is_empty() {
        String::new()
    } else {
        format!("\n    <script>{script}</script>")
    };
    let styles = get_page_styles();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{styles}</style>
</head>
<body>
    <div class="container">
        <div class="card">
            {body}
        </div>
    </div>{script_block}
</body>
</html>"#
    )
}

/// Quote a value as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn html_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

const BRIDGE_SCRIPT: &str = r"
(function () {
    var pollMs = __POLL_MS__;
    var ceilingMs = __CEILING_MS__;
    var started = Date.now();
    var done = false;

    function hasMaterial() {
        return window.location.search.length > 1 || window.location.hash.length > 1;
    }

    function forward() {
        if (done) { return; }
        done = true;
        window.location.replace('/auth/resolve?search='
            + encodeURIComponent(window.location.search)
            + '&hash=' + encodeURIComponent(window.location.hash));
    }

    if (hasMaterial()) { forward(); return; }
    window.addEventListener('hashchange', forward);
    var poll = window.setInterval(function () {
        if (hasMaterial() || Date.now() - started >= ceilingMs) {
            window.clearInterval(poll);
            forward();
        }
    }, pollMs);
})();
";

const HANDOFF_SCRIPT: &str = r"
(function () {
    var deepLink = __DEEP_LINK__;
    var fallbackUrl = __FALLBACK_URL__;
    var graceMs = __GRACE_MS__;

    window.location.href = deepLink;
    var timer = window.setTimeout(function () {
        window.location.replace(fallbackUrl);
    }, graceMs);
    window.addEventListener('pagehide', function () {
        window.clearTimeout(timer);
    });
})();
";

#[allow(clippy::too_many_lines)]
const fn get_page_styles() -> &'static str {
    r"
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
            background: linear-gradient(135deg, #f5f7fa 0%, #c3cfe2 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
            padding: 20px;
        }

        .container {
            width: 100%;
            max-width: 420px;
        }

        .card {
            background: white;
            border-radius: 10px;
            box-shadow: 0 14px 28px rgba(0,0,0,0.12), 0 10px 10px rgba(0,0,0,0.08);
            padding: 40px;
            text-align: center;
        }

        h1 {
            color: #333;
            font-size: 26px;
            font-weight: 600;
            margin-bottom: 10px;
        }

        p {
            color: #666;
            margin-bottom: 20px;
        }

        .hint {
            color: #999;
            font-size: 14px;
        }

        .error-banner {
            background: #fdecea;
            border: 1px solid #f5c6cb;
            border-radius: 6px;
            color: #b02a37;
            font-size: 14px;
            padding: 10px 14px;
        }

        .spinner {
            border: 3px solid #e9ecef;
            border-top-color: #6366f1;
            border-radius: 50%;
            width: 36px;
            height: 36px;
            margin: 0 auto 20px;
            animation: spin 0.8s linear infinite;
        }

        @keyframes spin {
            to { transform: rotate(360deg); }
        }

        form {
            text-align: left;
        }

        label {
            color: #333;
            display: block;
            font-size: 14px;
            font-weight: 500;
            margin-bottom: 6px;
        }

        input[type='password'] {
            border: 1px solid #ced4da;
            border-radius: 6px;
            font-size: 16px;
            margin-bottom: 18px;
            padding: 10px 12px;
            width: 100%;
        }

        input[type='password']:focus {
            border-color: #6366f1;
            outline: none;
        }

        .button {
            background: #6366f1;
            border: none;
            border-radius: 6px;
            color: white;
            cursor: pointer;
            display: inline-block;
            font-size: 16px;
            font-weight: 500;
            padding: 12px 20px;
            text-decoration: none;
            transition: all 0.3s ease;
            width: 100%;
        }

        .button:hover {
            background: #5558e3;
            transform: translateY(-1px);
        }

        .button.secondary {
            background: white;
            border: 2px solid #6366f1;
            color: #6366f1;
            margin-top: 12px;
        }

        .button.secondary:hover {
            background: #f5f7fa;
        }

        @media (max-width: 480px) {
            .card {
                padding: 30px 20px;
            }

            h1 {
                font-size: 22px;
            }
        }
    "
}
