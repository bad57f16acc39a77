//! Page handlers

use axum::{
    extract::{Extension, Json},
    response::Html,
};
use serde_json::json;

use super::layout::render_page;
use crate::auth::{OptionalUser, RequiredUser};
use crate::common::{html_escape, SharedState};
use crate::users::UserWithProfile;

const LOGOUT_FORM: &str = r#"<form method="post" action="/logout"><button type="submit">Sign out</button></form>"#;

fn greeting(user: Option<&UserWithProfile>) -> String {
    match user {
        Some(user) => {
            let name = user
                .profile
                .display_name
                .as_deref()
                .or(user.user.email.as_deref())
                .unwrap_or("there");
            format!("<p>Signed in as {}.</p>\n{}", html_escape(name), LOGOUT_FORM)
        }
        None => r#"<p><a href="/login">Sign in</a></p>"#.to_string(),
    }
}

/// GET /
pub async fn home(
    Extension(state): Extension<SharedState>,
    OptionalUser(user): OptionalUser,
) -> Html<String> {
    let body = format!("<h1>Welcome</h1>\n{}", greeting(user.as_ref()));
    render_page("Home", &state.client_env, &body)
}

/// GET /about
pub async fn about(
    Extension(state): Extension<SharedState>,
    OptionalUser(user): OptionalUser,
) -> Html<String> {
    let body = format!(
        "<h1>About</h1>\n<p>A starter site with Google sign-in and per-user profiles.</p>\n{}",
        greeting(user.as_ref())
    );
    render_page("About", &state.client_env, &body)
}

/// GET /profile
/// Requires a session; display fields arrive already sanitized
pub async fn profile(
    Extension(state): Extension<SharedState>,
    RequiredUser(user): RequiredUser,
) -> Html<String> {
    let photo = user
        .profile
        .photo_url
        .as_deref()
        .map(|url| format!(r#"<img src="{}" alt="" width="96" height="96">"#, html_escape(url)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Profile</h1>
{photo}
<dl>
    <dt>Name</dt><dd>{name}</dd>
    <dt>Email</dt><dd>{email}</dd>
    <dt>Member since</dt><dd>{since}</dd>
</dl>
{logout}"#,
        photo = photo,
        name = html_escape(user.profile.display_name.as_deref().unwrap_or("")),
        email = html_escape(user.user.email.as_deref().unwrap_or("")),
        since = user.user.created_at.format("%Y-%m-%d"),
        logout = LOGOUT_FORM,
    );

    render_page("Profile", &state.client_env, &body)
}

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
