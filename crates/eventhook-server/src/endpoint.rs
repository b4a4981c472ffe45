//! Derivation of the subscription endpoint from the inbound request.
//!
//! The endpoint is the absolute URL the event was delivered to, so future
//! events reach whatever address received the install notification.

use axum::http::{HeaderMap, Uri, header};
use url::Url;

const FORWARDED_PROTO: &str = "x-forwarded-proto";
const FORWARDED_HOST: &str = "x-forwarded-host";

/// Rebuild the request's destination URL.
///
/// Scheme: `X-Forwarded-Proto`, else `default_scheme`. Authority:
/// `X-Forwarded-Host`, else the request target's authority, else `Host`.
/// The query string is dropped. Returns `None` without a usable authority.
pub fn source_endpoint(headers: &HeaderMap, uri: &Uri, default_scheme: &str) -> Option<String> {
    let scheme = first_value(headers, FORWARDED_PROTO)
        .or_else(|| uri.scheme_str())
        .unwrap_or(default_scheme);

    let authority = first_value(headers, FORWARDED_HOST)
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|a| !a.is_empty())?;

    let url = Url::parse(&format!("{scheme}://{authority}{}", uri.path())).ok()?;
    Some(url.to_string())
}

// Proxies may append comma-separated hops; the first is the client-facing one.
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn uses_host_header_and_path() {
        let uri: Uri = "/events?trace=1".parse().unwrap();
        let endpoint = source_endpoint(&headers(&[("host", "handler.test:8080")]), &uri, "http");
        assert_eq!(endpoint.as_deref(), Some("http://handler.test:8080/events"));
    }

    #[test]
    fn forwarded_headers_win() {
        let uri: Uri = "/events".parse().unwrap();
        let endpoint = source_endpoint(
            &headers(&[
                ("host", "10.0.0.5:8080"),
                ("x-forwarded-proto", "https"),
                ("x-forwarded-host", "hooks.example.com, proxy.internal"),
            ]),
            &uri,
            "http",
        );
        assert_eq!(endpoint.as_deref(), Some("https://hooks.example.com/events"));
    }

    #[test]
    fn absolute_request_target_supplies_authority() {
        let uri: Uri = "https://direct.test/events".parse().unwrap();
        let endpoint = source_endpoint(&HeaderMap::new(), &uri, "http");
        assert_eq!(endpoint.as_deref(), Some("https://direct.test/events"));
    }

    #[test]
    fn missing_host_yields_none() {
        let uri: Uri = "/events".parse().unwrap();
        assert_eq!(source_endpoint(&HeaderMap::new(), &uri, "http"), None);
    }
}
