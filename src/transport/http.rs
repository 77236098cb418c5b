//! HTTP client construction
//!
//! Upstream sits behind an edge proxy that scores requests by how much they
//! look like the web app. Every client we build carries the same browser
//! header set; credentials are attached per request.

use crate::{Error, Result, config::ApiSettings};
use reqwest::{
    Client,
    header::{ACCEPT, DNT, HeaderMap, HeaderName, HeaderValue, REFERER},
};

const SEC_CH_UA: &str = r#""Chromium";v="124", "Google Chrome";v="124", "Not-A.Brand";v="99""#;

/// Headers a desktop Chrome sends on same-site fetches
pub fn browser_headers(settings: &ApiSettings) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("priority"),
        HeaderValue::from_static("u=1, i"),
    );
    headers.insert(REFERER, header_value("referer", &settings.referer)?);
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static(SEC_CH_UA),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-mobile"),
        HeaderValue::from_static("?0"),
    );
    headers.insert(
        HeaderName::from_static("sec-ch-ua-platform"),
        HeaderValue::from_static(r#""macOS""#),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("empty"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("cors"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-site"),
    );
    Ok(headers)
}

/// Build the shared API client. `accept_invalid_certs` is only used for the
/// one-shot fallback after a connection failure.
pub fn build_client(settings: &ApiSettings, accept_invalid_certs: bool) -> Result<Client> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .default_headers(browser_headers(settings)?)
        .timeout(settings.request_timeout)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::config(format!("Invalid {} header value '{}'", name, value)))
}
