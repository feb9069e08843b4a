//! Album slug sanitization
//!
//! Album keys double as folder names and URL fragments, so they are reduced
//! to lowercase ASCII alphanumerics joined by single hyphens.

/// Keys that can never name a visible album
pub const RESERVED_SLUGS: &[&str] = &["unsorted", "grid", "all"];

/// Sanitize a display name into an album slug.
///
/// Returns an empty string when nothing usable remains; callers treat that
/// as a rejection.
pub fn sanitize_slug(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !result.is_empty() {
                result.push('-');
            }
            pending_hyphen = false;
            result.push(c.to_ascii_lowercase());
        } else {
            // Whitespace, punctuation and non-ASCII all act as separators
            pending_hyphen = true;
        }
    }

    result
}

/// Is this key one of the reserved pseudo-album names?
pub fn is_reserved_slug(slug: &str) -> bool {
    RESERVED_SLUGS.contains(&slug)
}

/// Check if a string is already a usable, non-reserved slug
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && sanitize_slug(slug) == slug && !is_reserved_slug(slug)
}
