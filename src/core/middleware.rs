use std::time::Instant;

use http::Extensions;
use reqwest::{Client, Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use url::Url;

// Query parameters that carry credentials.
const SENSITIVE_PARAMS: &[&str] = &["token", "auth", "password", "newPassword"];

/// Logs every outgoing request with credentials stripped from the URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogging;

/// Builds the HTTP client used by [`crate::Account`] when none is supplied.
///
/// No retry middleware is installed: failed calls surface to the caller.
pub fn default_client() -> ClientWithMiddleware {
    ClientBuilder::new(Client::new()).with(RequestLogging).build()
}

#[async_trait::async_trait]
impl Middleware for RequestLogging {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let url = redact(req.url());
        let started = Instant::now();

        let result = next.run(req, extensions).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => tracing::debug!(
                %method,
                %url,
                status = response.status().as_u16(),
                elapsed_ms,
                "request completed"
            ),
            Err(e) => tracing::warn!(%method, %url, elapsed_ms, error = %e, "request failed"),
        }

        result
    }
}

/// Replaces credential values in the query string and secret names in the path.
pub(crate) fn redact(url: &Url) -> Url {
    let mut redacted = url.clone();

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if SENSITIVE_PARAMS.contains(&k.as_ref()) {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    if !pairs.is_empty() {
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
    }

    // .settings/secrets/{secret}.json
    let segments: Option<Vec<String>> = url
        .path_segments()
        .map(|s| s.map(str::to_string).collect());
    if let Some(mut segments) = segments {
        let len = segments.len();
        if len >= 2 && segments[len - 2] == "secrets" && segments[len - 1].ends_with(".json") {
            segments[len - 1] = "REDACTED.json".to_string();
            redacted.set_path(&segments.join("/"));
        }
    }

    redacted
}
