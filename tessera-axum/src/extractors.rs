use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{Extensions, HeaderMap, request::Parts},
};

use crate::types::ClientAddress;

/// Extract a client IP from common proxy headers.
///
/// The first entry of `X-Forwarded-For` wins, then `X-Real-IP`.
pub fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Attribute a request to a client address.
///
/// Proxy headers are only consulted when `trust_forwarded_headers` is set; the
/// transport peer address is the fallback.
pub(crate) fn resolve_client_address(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_headers: bool,
) -> ClientAddress {
    let forwarded = if trust_forwarded_headers {
        extract_client_ip(headers)
    } else {
        None
    };

    let address = forwarded
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| ClientAddress::UNKNOWN.to_string());

    ClientAddress(address)
}

/// The address the rate limiter charged this request to.
///
/// Outside the rate-limit middleware only the peer address is used.
impl<S> FromRequestParts<S> for ClientAddress
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(address) = parts.extensions.get::<ClientAddress>() {
            return Ok(address.clone());
        }
        Ok(resolve_client_address(&parts.headers, &parts.extensions, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 1.2.3.4 , 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn test_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("9.9.9.9".to_string()));
    }

    #[test]
    fn test_peer_address_when_headers_untrusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4242))));

        assert_eq!(
            resolve_client_address(&headers, &extensions, false),
            ClientAddress("10.0.0.7".to_string())
        );
        assert_eq!(
            resolve_client_address(&headers, &extensions, true),
            ClientAddress("1.2.3.4".to_string())
        );
    }

    #[test]
    fn test_unknown_without_any_source() {
        let address = resolve_client_address(&HeaderMap::new(), &Extensions::new(), true);
        assert_eq!(address.as_str(), ClientAddress::UNKNOWN);
    }
}
