use axum::body::Body;
use axum::http::{header, Request};

use super::config::AuthConfig;

/// Pulls the raw session token from `Authorization: Bearer ...`, falling back
/// to the session cookie set by the web client.
pub fn extract_token(request: &Request<Body>, config: &AuthConfig) -> Option<String> {
    if let Some(token) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix(&config.bearer_prefix))
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    extract_session_from_cookies(request, &config.session_cookie_name)
}

pub fn extract_session_from_cookies(request: &Request<Body>, cookie_name: &str) -> Option<String> {
    request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|cookie| {
                let (name, value) = cookie.trim().split_once('=')?;

                if name == cookie_name && !value.is_empty() {
                    Some(value.to_string())
                } else {
                    None
                }
            })
        })
}
