// src/services/sanitize.rs
//! Read-path sanitization for user-controlled profile fields.
//!
//! Stored values are not cleaned at write time; these run right before a
//! profile is handed to a page.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Photo hosts we are willing to render. A host matches a domain itself or
/// any of its subdomains.
pub const ALLOWED_PHOTO_DOMAINS: &[&str] = &["googleusercontent.com", "google.com"];

static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?(-->|$)").unwrap());

// Elements whose content is code or otherwise never meant as text.
static DROPPED_ELEMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)<(script|style|iframe|object|embed|noscript|template|textarea|title)\b[^>]*>.*?(</(script|style|iframe|object|embed|noscript|template|textarea|title)\s*>|$)",
    )
    .unwrap()
});

static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)</?[A-Za-z!?/][^>]*(>|$)").unwrap());

/// Strip all markup from `input`, keeping text content, and trim.
///
/// `None` and input that is empty after cleaning both yield `None`.
pub fn sanitize_user_input(input: Option<&str>) -> Option<String> {
    let input = input?;
    if input.is_empty() {
        return None;
    }

    let without_comments = COMMENTS.replace_all(input, "");
    let without_dropped = DROPPED_ELEMENTS.replace_all(&without_comments, "");
    let text = TAGS.replace_all(&without_dropped, "");

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Clean a photo URL and accept it only from an allowed host.
pub fn sanitize_photo_url(url: Option<&str>) -> Option<String> {
    let sanitized = sanitize_user_input(url)?;
    let parsed = Url::parse(&sanitized).ok()?;
    let host = parsed.host_str()?;

    if ALLOWED_PHOTO_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
    {
        Some(sanitized)
    } else {
        None
    }
}
