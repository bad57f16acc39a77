// src/services/mod.rs
//
// Shared services used by the auth and users modules

pub mod encryption;
pub mod google;
pub mod sanitize;

// Re-export commonly used types for convenience
pub use encryption::EncryptionService;
pub use google::GoogleService;
pub use sanitize::{sanitize_photo_url, sanitize_user_input};
