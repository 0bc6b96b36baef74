use axum::http::HeaderMap;

// Bucket shared by every request that carries no forwarding header
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Picks the key a request is rate limited under: the left-most
/// `X-Forwarded-For` entry, or [`UNKNOWN_CLIENT`] when there is none.
///
/// The value is not parsed as an address; the limiter treats it as opaque.
pub fn client_id(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
