// src/users/store.rs
//! User + profile persistence.
//!
//! Layout: `users/{id}` holds the user, `users/{id}/profile/main` its
//! profile. Both are created by one atomic batch, so a user is never
//! visible without its profile.

use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::documents::{Document, DocumentStore, FieldValue, Fields, StoreError};
use super::models::{CreateUserData, Profile, User, UserWithProfile};
use crate::common::safe_optional_email_log;

pub fn user_path(id: &str) -> String {
    format!("users/{}", id)
}

pub fn profile_path(id: &str) -> String {
    format!("users/{}/profile/main", id)
}

/// Ids become path segments, so they must be a single non-empty segment.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('/')
}

#[derive(Clone)]
pub struct UserStore {
    documents: Arc<dyn DocumentStore>,
}

impl UserStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// Write the user and its profile in one batch.
    ///
    /// Fails with `StoreError::Conflict` when the user already exists.
    pub async fn create_user(&self, data: CreateUserData) -> Result<UserWithProfile, StoreError> {
        if !is_valid_id(&data.id) {
            return Err(StoreError::Malformed(format!(
                "invalid user id '{}'",
                data.id
            )));
        }

        // Microsecond precision survives every backend unchanged.
        let now = Utc::now().trunc_subsecs(6);

        let user = User {
            id: data.id.clone(),
            email: data.email,
            created_at: now,
            updated_at: now,
        };
        let profile = Profile {
            user_id: data.id.clone(),
            display_name: data.profile.display_name,
            photo_url: data.profile.photo_url,
            created_at: now,
            updated_at: now,
        };

        let writes = vec![
            Document::new(user_path(&user.id), user_fields(&user)),
            Document::new(profile_path(&user.id), profile_fields(&profile)),
        ];

        if let Err(e) = self.documents.write_atomically(writes).await {
            error!(error = %e, user_id = %user.id, "Error creating user");
            return Err(e);
        }

        info!(
            user_id = %user.id,
            email = %safe_optional_email_log(user.email.as_deref()),
            "Created user and profile"
        );

        Ok(UserWithProfile { user, profile })
    }

    /// Load a user and profile. `Ok(None)` for an unknown id.
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<UserWithProfile>, StoreError> {
        if !is_valid_id(id) {
            debug!(user_id = %id, "Rejecting lookup for invalid user id");
            return Ok(None);
        }

        let user_doc = match self.documents.get(&user_path(id)).await? {
            Some(doc) => doc,
            None => return Ok(None),
        };

        let profile_doc = match self.documents.get(&profile_path(id)).await? {
            Some(doc) => doc,
            None => {
                error!(user_id = %id, "User document exists without its profile");
                return Err(StoreError::InvariantViolation(
                    "Profile not found".to_string(),
                ));
            }
        };

        Ok(Some(UserWithProfile {
            user: user_from_document(&user_doc)?,
            profile: profile_from_document(&profile_doc)?,
        }))
    }
}

fn timestamps(fields: &mut Fields, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
    fields.insert("createdAt".to_string(), FieldValue::Timestamp(created_at));
    fields.insert("updatedAt".to_string(), FieldValue::Timestamp(updated_at));
}

pub(crate) fn user_fields(user: &User) -> Fields {
    let mut fields = Fields::new();
    fields.insert("id".to_string(), FieldValue::String(user.id.clone()));
    fields.insert("email".to_string(), user.email.clone().into());
    timestamps(&mut fields, user.created_at, user.updated_at);
    fields
}

pub(crate) fn profile_fields(profile: &Profile) -> Fields {
    let mut fields = Fields::new();
    fields.insert(
        "userId".to_string(),
        FieldValue::String(profile.user_id.clone()),
    );
    fields.insert(
        "displayName".to_string(),
        profile.display_name.clone().into(),
    );
    fields.insert("photoURL".to_string(), profile.photo_url.clone().into());
    timestamps(&mut fields, profile.created_at, profile.updated_at);
    fields
}

fn user_from_document(doc: &Document) -> Result<User, StoreError> {
    Ok(User {
        id: doc.string("id")?,
        email: doc.optional_string("email")?,
        created_at: doc.timestamp("createdAt")?,
        updated_at: doc.timestamp("updatedAt")?,
    })
}

fn profile_from_document(doc: &Document) -> Result<Profile, StoreError> {
    Ok(Profile {
        user_id: doc.string("userId")?,
        display_name: doc.optional_string("displayName")?,
        photo_url: doc.optional_string("photoURL")?,
        created_at: doc.timestamp("createdAt")?,
        updated_at: doc.timestamp("updatedAt")?,
    })
}
