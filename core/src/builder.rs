//! Turns a method, URL and `RequestOptions` into an `HttpRequest`.
//!
//! Pure: nothing here touches the network, so every rule about how options
//! are applied can be checked by inspecting the returned request.

use crate::http::{Credentials, HttpMethod, HttpRequest};
use crate::options::RequestOptions;
use crate::params;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Build the request for `method` against `url`.
///
/// The query is appended with `?`, or `&` when `url` already carries a query.
/// Credentials are attached only when both username and password are set.
pub fn build_request(method: HttpMethod, url: &str, options: &RequestOptions) -> HttpRequest {
    let mut url = url.to_string();
    if let Some(query) = &options.query {
        let serialized = params::serialize(query);
        if !serialized.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&serialized);
        }
    }

    let credentials = match (&options.username, &options.password) {
        (Some(username), Some(password)) => Some(Credentials::new(username, password)),
        _ => None,
    };

    let mut headers: Vec<(String, String)> = options
        .headers
        .iter()
        .flatten()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let body = match &options.data {
        Some(data) => {
            let has_content_type = headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
            if !has_content_type {
                headers.push(("content-type".to_string(), FORM_CONTENT_TYPE.to_string()));
            }
            params::serialize(data)
        }
        None => String::new(),
    };

    HttpRequest {
        method,
        url,
        headers,
        body,
        credentials,
    }
}
