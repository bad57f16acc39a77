//! Page shell and response helpers shared by every HTML route

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use crate::common::{html_escape, ClientEnv};

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// `302 Found` to `location`, setting or clearing a cookie on the way.
pub fn found_with_cookie(location: &str, set_cookie: String) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, set_cookie),
        ],
    )
        .into_response()
}

/// Serialize the client environment for an inline `<script>`.
///
/// `<` is escaped so a value can never close the script element.
fn client_env_script(env: &ClientEnv) -> String {
    let json = serde_json::to_string(env).unwrap_or_else(|e| {
        error!(error = %e, "Failed to serialize client environment");
        "{}".to_string()
    });
    format!("window.ENV = {};", json.replace('<', "\\u003c"))
}

/// Wrap `body` (already-escaped HTML) in the document shell.
pub fn render_page(title: &str, env: &ClientEnv, body: &str) -> Html<String> {
    let robots = if env.indexing_allowed() {
        ""
    } else {
        r#"<meta name="robots" content="noindex">"#
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    {robots}
    <title>{title}</title>
</head>
<body>
    <nav><a href="/">Home</a> <a href="/about">About</a> <a href="/profile">Profile</a></nav>
    <main>
{body}
    </main>
    <script>{env}</script>
</body>
</html>"#,
        robots = robots,
        title = html_escape(title),
        body = body,
        env = client_env_script(env),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::NodeEnv;

    fn env(allow_indexing: Option<&str>) -> ClientEnv {
        ClientEnv {
            mode: NodeEnv::Test,
            allow_indexing: allow_indexing.map(str::to_string),
        }
    }

    #[test]
    fn test_page_embeds_client_env() {
        let Html(page) = render_page("Home", &env(Some("false")), "<p>hi</p>");
        assert!(page.contains(r#"window.ENV = {"MODE":"test","ALLOW_INDEXING":"false"};"#));
        assert!(page.contains("<p>hi</p>"));
    }

    #[test]
    fn test_robots_meta_follows_indexing_flag() {
        let Html(blocked) = render_page("Home", &env(None), "");
        assert!(blocked.contains(r#"<meta name="robots" content="noindex">"#));

        let Html(allowed) = render_page("Home", &env(Some("true")), "");
        assert!(!allowed.contains("noindex"));
    }

    #[test]
    fn test_client_env_cannot_break_out_of_script() {
        let Html(page) = render_page("Home", &env(Some("</script><b>x")), "");
        assert!(!page.contains("</script><b>"));
        assert!(page.contains("\\u003c/script>"));
    }

    #[test]
    fn test_found_sets_location() {
        let response = found("/login");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");

        let response = found_with_cookie("/", "__session=; Max-Age=0".to_string());
        assert_eq!(response.headers()[header::SET_COOKIE], "__session=; Max-Age=0");
    }
}
