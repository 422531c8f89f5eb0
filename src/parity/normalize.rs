//! URL canonicalization.
//!
//! Every URL is reduced to a comparison key before any diffing: scheme and host are
//! stripped, query and fragment dropped, the path lower-cased and trailing slashes
//! removed (the root path stays `/`). Two URLs name the same resource iff their keys
//! are byte-equal.

/// Canonicalize a raw URL into a comparison key. Total: malformed input comes back
/// lower-cased and otherwise untouched.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let path = strip_origin(&lowered);
    let path = path.split(['?', '#']).next().unwrap_or("");
    let path = path.trim_end_matches(|c: char| c == '/' || c.is_whitespace());

    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Drop a leading `scheme://host` prefix, host running up to the first `/`, `?` or `#`.
fn strip_origin(url: &str) -> &str {
    let Some(idx) = url.find("://") else {
        return url;
    };

    let scheme = &url[..idx];
    let valid_scheme = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return url;
    }

    let rest = &url[idx + 3..];
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    &rest[host_end..]
}
