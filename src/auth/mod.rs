//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - ID token verification against the identity provider
//! - First sign-in provisioning of user records
//! - Encrypted cookie sessions
//! - Gating of page routes on the signed-in user

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;
pub mod session;
pub mod verifier;


pub use extractors::{OptionalUser, RequiredUser};
pub use routes::auth_routes;
pub use session::SessionManager;
pub use verifier::FirebaseVerifier;
