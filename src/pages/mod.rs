//! # Pages Module
//!
//! Server-rendered HTML pages and the shared page shell.

pub mod handlers;
pub mod layout;
pub mod routes;

#[cfg(test)]
mod tests;

pub use routes::pages_routes;
