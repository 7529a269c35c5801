// Session cookie helpers.
//
// The cookie is set by the login flow; this service only reads it and,
// when the token turns out to be bad, tells the browser to drop it.

use axum::http::{header, HeaderMap, HeaderValue};
use cookie::Cookie;

/// Cookie name for the session token
pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Extract the session token from the request's `Cookie` headers.
///
/// Malformed cookie pairs are skipped; an empty value counts as absent.
pub fn extract_auth_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| {
            Cookie::split_parse(raw)
                .flatten()
                .filter(|c| c.name() == AUTH_COOKIE_NAME && !c.value().is_empty())
                .map(|c| c.value().to_string())
                .collect::<Vec<_>>()
        })
        .next()
}

/// Create a cookie that expires the session cookie.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((AUTH_COOKIE_NAME, "")).path("/").build();
    cookie.make_removal();
    cookie
}

/// `Set-Cookie` value that clears the session cookie
pub fn removal_header() -> Option<HeaderValue> {
    HeaderValue::from_str(&removal_cookie().to_string()).ok()
}
