//! Authentication handlers

use axum::{
    extract::{rejection::FormRejection, Extension, Form},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use super::extractors::get_user_id;
use super::models::{LoginForm, AUTHENTICATION_FAILED, INVALID_FORM_SUBMISSION};
use super::service::authenticate;
use crate::common::{html_escape, ApiError, AppState, SharedState};
use crate::pages::layout::{found, found_with_cookie, render_page};

/// Sign-in page. The browser obtains the ID token from the provider SDK
/// and posts it back in the `idToken` field.
fn login_page(state: &AppState, error: Option<&str>) -> Response {
    let error_html = error
        .map(|msg| format!(r#"<p class="error" role="alert">{}</p>"#, html_escape(msg)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Sign in</h1>
{error_html}
<form method="post" action="/login" id="login-form">
    <input type="hidden" name="idToken" id="id-token">
    <button type="submit">Sign in with Google</button>
</form>"#,
        error_html = error_html
    );

    render_page("Sign in", &state.client_env, &body).into_response()
}

/// GET /login
/// Redirects home when a session already exists
pub async fn login_form(
    Extension(state): Extension<SharedState>,
    headers: HeaderMap,
) -> Response {
    if get_user_id(&state, &headers).is_some() {
        return found("/");
    }

    login_page(&state, None)
}

/// POST /login
/// Verifies the posted ID token and starts a session
///
/// # Request Body
/// `application/x-www-form-urlencoded` with an `idToken` field.
///
/// # Response
/// `302 Found` to `/` with the session cookie, or the sign-in page with an
/// inline error.
pub async fn login(
    Extension(state): Extension<SharedState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    let id_token = match form {
        Ok(Form(LoginForm {
            id_token: Some(token),
        })) => token,
        Ok(_) => {
            warn!("Sign-in form posted without idToken");
            return login_page(&state, Some(INVALID_FORM_SUBMISSION));
        }
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable sign-in form");
            return login_page(&state, Some(INVALID_FORM_SUBMISSION));
        }
    };

    let user = match authenticate(state.identity.as_ref(), &state.users, &id_token).await {
        Ok(user) => user,
        Err(_) => return login_page(&state, Some(AUTHENTICATION_FAILED)),
    };

    let mut session = state.sessions.new_session();
    session.set_user_id(user.id.as_str());

    match state.sessions.commit_session(&session) {
        Ok(cookie) => {
            info!(user_id = %user.id, "User signed in");
            found_with_cookie("/", cookie)
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// POST /logout
/// Clears the session cookie whether or not a session existed
pub async fn logout(Extension(state): Extension<SharedState>, headers: HeaderMap) -> Response {
    let session = state.sessions.get_session_from_headers(&headers);
    if let Some(user_id) = session.user_id() {
        info!(user_id = %user_id, "User signed out");
    }

    found_with_cookie("/", state.sessions.destroy_session(&session))
}

/// GET /logout
/// Logging out needs a POST; a plain visit just goes home
pub async fn logout_redirect() -> Response {
    found("/")
}
