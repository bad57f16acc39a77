// src/auth/service.rs
use thiserror::Error;
use tracing::{info, warn};

use super::models::{AuthError, AuthUser, Claims};
use super::verifier::IdentityVerifier;
use crate::common::safe_token_log;
use crate::users::{CreateUserData, NewProfile, StoreError, UserStore, UserWithProfile};

#[derive(Debug, Error)]
enum SignInFailure {
    #[error(transparent)]
    Identity(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Verify an ID token and return the signed-in user, provisioning the
/// user and profile records on first sign-in.
///
/// Every failure is logged and collapsed into `AuthError::AuthenticationFailed`.
pub async fn authenticate(
    identity: &dyn IdentityVerifier,
    users: &UserStore,
    id_token: &str,
) -> Result<AuthUser, AuthError> {
    match sign_in(identity, users, id_token).await {
        Ok(user) => Ok(user),
        Err(e) => {
            warn!(
                error = %e,
                token = %safe_token_log(id_token),
                "Authentication failed"
            );
            Err(AuthError::AuthenticationFailed)
        }
    }
}

async fn sign_in(
    identity: &dyn IdentityVerifier,
    users: &UserStore,
    id_token: &str,
) -> Result<AuthUser, SignInFailure> {
    let claims = identity.verify(id_token).await?;
    let provider = identity.get_user(&claims.uid).await?;

    let record = match users.get_user_by_id(&provider.uid).await? {
        Some(record) => record,
        None => provision(users, &provider).await?,
    };

    Ok(merge(record, provider))
}

async fn provision(users: &UserStore, provider: &Claims) -> Result<UserWithProfile, StoreError> {
    let data = CreateUserData {
        id: provider.uid.clone(),
        email: provider.email.clone(),
        profile: NewProfile {
            display_name: provider.display_name.clone(),
            photo_url: provider.photo_url.clone(),
        },
    };

    match users.create_user(data).await {
        Ok(created) => {
            info!(user_id = %created.user.id, "Provisioned user on first sign-in");
            Ok(created)
        }
        // A concurrent first sign-in for the same uid won the create.
        Err(StoreError::Conflict(reason)) => users
            .get_user_by_id(&provider.uid)
            .await?
            .ok_or(StoreError::Conflict(reason)),
        Err(e) => Err(e),
    }
}

/// Stored values win; the provider fills whatever the store lacks.
fn merge(record: UserWithProfile, provider: Claims) -> AuthUser {
    AuthUser {
        id: record.user.id,
        email: record.user.email.or(provider.email),
        display_name: record.profile.display_name.or(provider.display_name),
        photo_url: record.profile.photo_url.or(provider.photo_url),
    }
}
