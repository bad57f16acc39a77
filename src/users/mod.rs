//! # Users Module
//!
//! User and profile records, and the document store they live in.

pub mod documents;
pub mod firestore;
pub mod models;
pub mod sqlite;
pub mod store;


pub use documents::{DocumentStore, StoreError};
pub use models::{CreateUserData, NewProfile, UserWithProfile};
pub use store::UserStore;
