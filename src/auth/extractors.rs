//! Session-based access gating for page routes
//!
//! `get_user_id`, `get_optional_user`, and `get_required_user` read the
//! session cookie and load the signed-in user. `OptionalUser` and
//! `RequiredUser` wrap them as axum extractors.

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::common::{ApiError, AppState, SharedState};
use crate::pages::layout::found;
use crate::services::{sanitize_photo_url, sanitize_user_input};
use crate::users::{StoreError, UserWithProfile};

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Session names a user that does not exist.
    NotFound,
}

/// Outcome of gating a route that requires a signed-in user
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    Allowed(UserWithProfile),
    Redirect(&'static str),
    Denied(Denial),
}

/// User id from the session cookie, without touching the store.
pub fn get_user_id(state: &AppState, headers: &HeaderMap) -> Option<String> {
    state
        .sessions
        .get_session_from_headers(headers)
        .user_id()
        .map(str::to_string)
}

/// The signed-in user, if there is one.
///
/// Fields come back exactly as stored; only `get_required_user` sanitizes.
pub async fn get_optional_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<UserWithProfile>, StoreError> {
    let Some(user_id) = get_user_id(state, headers) else {
        return Ok(None);
    };

    let user = state.users.get_user_by_id(&user_id).await?;
    if user.is_none() {
        debug!(user_id = %user_id, "Session refers to unknown user");
    }
    Ok(user)
}

/// Gate for routes that need a signed-in user.
pub async fn get_required_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthDecision, StoreError> {
    let Some(user_id) = get_user_id(state, headers) else {
        return Ok(AuthDecision::Redirect(LOGIN_PATH));
    };

    match state.users.get_user_by_id(&user_id).await? {
        Some(user) => Ok(AuthDecision::Allowed(sanitize_for_display(user))),
        None => {
            warn!(user_id = %user_id, "Session user not found");
            Ok(AuthDecision::Denied(Denial::NotFound))
        }
    }
}

/// Strip markup from the profile name and drop photos from unknown hosts.
/// Email is left untouched.
fn sanitize_for_display(mut user: UserWithProfile) -> UserWithProfile {
    user.profile.display_name = sanitize_user_input(user.profile.display_name.as_deref());
    user.profile.photo_url = sanitize_photo_url(user.profile.photo_url.as_deref());
    user
}

async fn app_state<S: Send + Sync>(parts: &mut Parts, state: &S) -> Result<SharedState, ApiError> {
    let Extension(app_state): Extension<SharedState> = Extension::from_request_parts(parts, state)
        .await
        .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;
    Ok(app_state)
}

/// Signed-in user if any; anonymous requests pass through.
#[derive(Debug)]
pub struct OptionalUser(pub Option<UserWithProfile>);

#[async_trait]
impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state).await?;
        let user = get_optional_user(&app_state, &parts.headers).await?;
        Ok(OptionalUser(user))
    }
}

/// Signed-in user; otherwise a redirect to the login page or a 404.
#[derive(Debug)]
pub struct RequiredUser(pub UserWithProfile);

#[async_trait]
impl<S> FromRequestParts<S> for RequiredUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = app_state(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let decision = get_required_user(&app_state, &parts.headers)
            .await
            .map_err(|e| ApiError::from(e).into_response())?;

        match decision {
            AuthDecision::Allowed(user) => Ok(RequiredUser(user)),
            AuthDecision::Redirect(location) => Err(found(location)),
            AuthDecision::Denied(Denial::NotFound) => {
                Err(ApiError::NotFound("User not found".to_string()).into_response())
            }
        }
    }
}
