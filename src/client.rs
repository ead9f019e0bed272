//! HTTP client construction for the HTTP worker kind.
//!
//! Connection pool tuning, mTLS, and DNS override are out of scope (spec.md
//! Non-goals) — this is a thin, direct `reqwest::ClientBuilder` call.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::str::FromStr;

use crate::config::HttpOpts;

/// Builds the `reqwest::Client` an HTTP worker sends every request through.
/// One client is shared by all HTTP workers in a run (spec.md §4.2.1: workers
/// don't each own a connection pool).
pub fn build_client(opts: &HttpOpts) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    for (name, value) in &opts.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            headers.insert(name, value);
        }
    }

    let redirect_policy = if opts.follow_redirects {
        reqwest::redirect::Policy::default()
    } else {
        reqwest::redirect::Policy::none()
    };

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(opts.timeout)
        .redirect(redirect_policy)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn builds_client_with_custom_headers() {
        let mut headers = HashMap::new();
        headers.insert("X-Test".to_string(), "1".to_string());
        let opts = HttpOpts {
            method: "GET".to_string(),
            headers,
            follow_redirects: false,
            timeout: Duration::from_secs(5),
        };
        assert!(build_client(&opts).is_ok());
    }
}
