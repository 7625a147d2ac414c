use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tessera::{Decision, Tessera};
use tessera_core::RepositoryProvider;

use crate::extractors::resolve_client_address;

pub const LIMIT_MINUTE: HeaderName = HeaderName::from_static("x-ratelimit-limit-minute");
pub const REMAINING_MINUTE: HeaderName = HeaderName::from_static("x-ratelimit-remaining-minute");
pub const LIMIT_HOUR: HeaderName = HeaderName::from_static("x-ratelimit-limit-hour");
pub const REMAINING_HOUR: HeaderName = HeaderName::from_static("x-ratelimit-remaining-hour");

pub struct AuthState<R: RepositoryProvider> {
    pub tessera: Arc<Tessera<R>>,
}

impl<R: RepositoryProvider> Clone for AuthState<R> {
    fn clone(&self) -> Self {
        Self {
            tessera: self.tessera.clone(),
        }
    }
}

/// Charge every request to its client address and turn away clients over their
/// per-minute or per-hour ceiling.
pub async fn rate_limit_middleware<R>(
    State(state): State<AuthState<R>>,
    mut request: Request,
    next: Next,
) -> Response
where
    R: RepositoryProvider,
{
    let config = state.tessera.rate_limit_config();
    let client = resolve_client_address(
        request.headers(),
        request.extensions(),
        config.trust_forwarded_headers,
    );
    let limits = (config.max_per_minute, config.max_per_hour);

    match state.tessera.admit(client.as_str()) {
        Decision::Allow {
            remaining_minute,
            remaining_hour,
        } => {
            request.extensions_mut().insert(client);
            let mut response = next.run(request).await;
            set_limit_headers(
                response.headers_mut(),
                limits,
                (remaining_minute, remaining_hour),
            );
            response
        }
        Decision::Reject {
            retry_after_seconds,
        } => {
            tracing::debug!(
                client = client.as_str(),
                retry_after_seconds,
                "Rate limit exceeded"
            );

            let status = StatusCode::TOO_MANY_REQUESTS;
            let body = Json(json!({
                "error": "Too many requests",
                "code": status.as_u16()
            }));
            let mut response = (status, body).into_response();
            let headers = response.headers_mut();
            set_limit_headers(headers, limits, (0, 0));
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
            response
        }
    }
}

fn set_limit_headers(headers: &mut HeaderMap, limits: (u32, u32), remaining: (u32, u32)) {
    headers.insert(LIMIT_MINUTE, HeaderValue::from(limits.0));
    headers.insert(REMAINING_MINUTE, HeaderValue::from(remaining.0));
    headers.insert(LIMIT_HOUR, HeaderValue::from(limits.1));
    headers.insert(REMAINING_HOUR, HeaderValue::from(remaining.1));
}
